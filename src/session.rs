//! Pipeline orchestration.
//!
//! A [`Session`] owns the item collection, the seen-id set and the paging
//! offset for one run. Its stage methods are the only mutators. Each stage
//! builds a complete new snapshot and swaps it in with a single assignment,
//! so an `Arc` obtained from [`Session::items`] never changes underneath its
//! holder.
//!
//! Stage methods never return errors. Every failure becomes a
//! [`StageReport`] that is returned and also kept in [`Session::messages`].

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tracing::{error, info, warn};

use crate::app::{AppContext, BulkfeedError, Result};
use crate::checker::{check_all, ImageCheckPolicy};
use crate::config::{Config, MAX_BATCH_SIZE, MIN_BATCH_SIZE};
use crate::domain::{normalize_domain, validate_domain, Item};
use crate::export::{build_rows, export_filename, save_export, serialize, ColumnList};
use crate::fetcher::fetch_page;
use crate::rewriter::{optimize_eligible, RewriteEligibility};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    ImageCheck,
    Rewrite,
    Export,
    Clear,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::ImageCheck => "images",
            Stage::Rewrite => "rewrite",
            Stage::Export => "export",
            Stage::Clear => "clear",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    /// Nothing failed but the result deserves attention (e.g. an empty page).
    Notice,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub stage: Stage,
    pub severity: Severity,
    pub message: String,
}

impl StageReport {
    fn new(stage: Stage, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            stage,
            severity,
            message: message.into(),
        }
    }

    fn from_error(stage: Stage, err: &BulkfeedError) -> Self {
        let severity = if err.is_notice() {
            Severity::Notice
        } else {
            Severity::Error
        };
        Self::new(stage, severity, err.to_string())
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for StageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            Severity::Info => "ok",
            Severity::Notice => "note",
            Severity::Error => "error",
        };
        write!(f, "[{}] {}: {}", self.stage, tag, self.message)
    }
}

pub struct Session {
    items: Arc<Vec<Item>>,
    seen_ids: HashSet<u64>,
    offset: usize,
    batch_size: usize,
    columns: ColumnList,
    image_policy: ImageCheckPolicy,
    eligibility: RewriteEligibility,
    messages: Vec<StageReport>,
}

impl Session {
    pub fn new(config: &Config) -> Result<Self> {
        let mut session = Self {
            items: Arc::new(Vec::new()),
            seen_ids: HashSet::new(),
            offset: 0,
            batch_size: MIN_BATCH_SIZE,
            columns: ColumnList::new(config.export.columns.clone())?,
            image_policy: config.images.policy,
            eligibility: config.rewrite.eligibility,
            messages: Vec::new(),
        };
        session.set_batch_size(config.source.batch_size)?;
        Ok(session)
    }

    /// Current snapshot of the collection.
    pub fn items(&self) -> Arc<Vec<Item>> {
        Arc::clone(&self.items)
    }

    pub fn seen_count(&self) -> usize {
        self.seen_ids.len()
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn set_offset(&mut self, offset: usize) {
        self.offset = offset;
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn set_batch_size(&mut self, batch_size: usize) -> Result<()> {
        if !(MIN_BATCH_SIZE..=MAX_BATCH_SIZE).contains(&batch_size) {
            return Err(BulkfeedError::Validation(format!(
                "batch size must be between {} and {}, got {}",
                MIN_BATCH_SIZE, MAX_BATCH_SIZE, batch_size
            )));
        }
        self.batch_size = batch_size;
        Ok(())
    }

    pub fn columns(&self) -> &ColumnList {
        &self.columns
    }

    /// Column edits never touch items.
    pub fn columns_mut(&mut self) -> &mut ColumnList {
        &mut self.columns
    }

    pub fn image_policy(&self) -> ImageCheckPolicy {
        self.image_policy
    }

    pub fn set_image_policy(&mut self, policy: ImageCheckPolicy) {
        self.image_policy = policy;
    }

    pub fn eligibility(&self) -> RewriteEligibility {
        self.eligibility
    }

    pub fn set_eligibility(&mut self, eligibility: RewriteEligibility) {
        self.eligibility = eligibility;
    }

    pub fn messages(&self) -> &[StageReport] {
        &self.messages
    }

    fn record(&mut self, report: StageReport) -> StageReport {
        match report.severity {
            Severity::Error => error!("{}", report),
            Severity::Notice => warn!("{}", report),
            Severity::Info => info!("{}", report),
        }
        self.messages.push(report.clone());
        report
    }

    /// Fetch the page at the current offset and append unseen items.
    pub async fn fetch(&mut self, ctx: &AppContext, domain: &str) -> StageReport {
        if !validate_domain(domain) {
            let err =
                BulkfeedError::Validation(format!("'{}' is not a valid domain", domain.trim()));
            return self.record(StageReport::from_error(Stage::Fetch, &err));
        }

        let host = normalize_domain(domain);
        let result = fetch_page(
            ctx.fetcher.as_ref(),
            &ctx.normalizer,
            &host,
            self.batch_size,
            self.offset,
            &mut self.seen_ids,
        )
        .await;

        let report = match result {
            Ok(page) => {
                let added = page.items.len();
                let mut next = Vec::with_capacity(self.items.len() + added);
                next.extend(self.items.iter().cloned());
                next.extend(page.items);
                self.items = Arc::new(next);
                self.offset += page.received;

                StageReport::new(
                    Stage::Fetch,
                    Severity::Info,
                    format!(
                        "{} new posts from {} ({} total, next offset {})",
                        added,
                        host,
                        self.items.len(),
                        self.offset
                    ),
                )
            }
            Err(err) => {
                if let BulkfeedError::EmptyPage { received, .. } = &err {
                    self.offset += *received;
                }
                StageReport::from_error(Stage::Fetch, &err)
            }
        };

        self.record(report)
    }

    /// Re-check every item's image under the session's policy.
    pub async fn check_images(&mut self, ctx: &AppContext) -> StageReport {
        let snapshot = self.items();
        if snapshot.is_empty() {
            let report = StageReport::new(Stage::ImageCheck, Severity::Notice, "no items to check");
            return self.record(report);
        }

        let (checked, summary) = check_all(ctx.prober.as_ref(), self.image_policy, &snapshot).await;
        self.items = Arc::new(checked);

        let report = StageReport::new(
            Stage::ImageCheck,
            Severity::Info,
            format!("{} images checked ({}): {}", summary.total(), self.image_policy, summary),
        );
        self.record(report)
    }

    /// Rewrite titles of eligible items in groups; failed groups are reported
    /// individually and do not stop the rest.
    pub async fn rewrite_titles(&mut self, ctx: &AppContext) -> StageReport {
        let Some(rewriter) = ctx.rewriter.as_ref() else {
            let err = BulkfeedError::Config(format!(
                "title rewriting unavailable, set {}",
                ctx.config.rewrite.api_key_env
            ));
            return self.record(StageReport::from_error(Stage::Rewrite, &err));
        };

        let snapshot = self.items();
        let (rewritten, summary) =
            optimize_eligible(rewriter.as_ref(), self.eligibility, &snapshot).await;
        self.items = Arc::new(rewritten);

        for failure in &summary.failures {
            let report = StageReport::new(
                Stage::Rewrite,
                Severity::Error,
                format!(
                    "group {} (posts {:?}) failed: {}",
                    failure.group, failure.item_ids, failure.message
                ),
            );
            self.record(report);
        }

        let severity = if summary.eligible == 0 {
            Severity::Notice
        } else if summary.failures.len() == summary.groups {
            Severity::Error
        } else if !summary.failures.is_empty() {
            Severity::Notice
        } else {
            Severity::Info
        };

        let message = if summary.eligible == 0 {
            format!("no items are eligible ({})", self.eligibility)
        } else {
            summary.to_string()
        };

        self.record(StageReport::new(Stage::Rewrite, severity, message))
    }

    /// Render the current collection as CSV bytes.
    pub fn export_bytes(&self) -> Result<Vec<u8>> {
        let rows = build_rows(&self.items, &self.columns);
        serialize(&self.columns, &rows)
    }

    /// Write `canva_bulk_create_<today>.csv` into `dir`.
    pub fn export(&mut self, dir: &Path) -> StageReport {
        self.export_dated(dir, Local::now().date_naive())
    }

    pub fn export_dated(&mut self, dir: &Path, date: NaiveDate) -> StageReport {
        if self.items.is_empty() {
            let report = StageReport::new(Stage::Export, Severity::Notice, "no items to export");
            return self.record(report);
        }

        let result = self
            .export_bytes()
            .and_then(|bytes| save_export(dir, &export_filename(date), &bytes));

        let report = match result {
            Ok(path) => StageReport::new(
                Stage::Export,
                Severity::Info,
                format!("{} rows written to {}", self.items.len(), path.display()),
            ),
            Err(err) => StageReport::from_error(Stage::Export, &err),
        };
        self.record(report)
    }

    /// Drop all items and seen ids and rewind paging. Columns and policies
    /// are kept.
    pub fn clear(&mut self) -> StageReport {
        let dropped = self.items.len();
        self.items = Arc::new(Vec::new());
        self.seen_ids.clear();
        self.offset = 0;

        self.record(StageReport::new(
            Stage::Clear,
            Severity::Info,
            format!("cleared {} items", dropped),
        ))
    }
}

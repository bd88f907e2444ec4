use std::path::{Path, PathBuf};

use crate::app::{AppContext, Result};
use crate::checker::ImageCheckPolicy;
use crate::domain::{validate_domain, Item};
use crate::export::ColumnList;
use crate::rewriter::RewriteEligibility;
use crate::session::{Session, Severity, StageReport};

pub fn validate(domain: &str) -> bool {
    let valid = validate_domain(domain);
    if valid {
        println!("{} is a valid domain", domain.trim());
    } else {
        println!("{} is not a valid domain", domain.trim());
    }
    valid
}

/// Settings for a one-shot pipeline run.
pub struct RunOptions {
    pub domain: String,
    pub batch_size: Option<usize>,
    pub offset: usize,
    pub pages: usize,
    pub skip_images: bool,
    pub skip_rewrite: bool,
    pub image_policy: Option<ImageCheckPolicy>,
    pub eligibility: Option<RewriteEligibility>,
    pub columns: Option<Vec<String>>,
    pub output: PathBuf,
}

pub fn print_report(report: &StageReport) {
    if report.is_error() {
        eprintln!("{}", report);
    } else {
        println!("{}", report);
    }
}

pub fn print_items(items: &[Item]) {
    if items.is_empty() {
        println!("No items");
        return;
    }

    for item in items {
        println!(
            "{:>8}  {:<10}  {}",
            item.id,
            item.image_status.as_str(),
            item.title
        );
        if let Some(optimized) = &item.optimized_title {
            println!("{:>8}  {:<10}  -> {}", "", "", optimized);
        }
    }
}

pub fn print_columns(columns: &ColumnList) {
    for (i, name) in columns.names().iter().enumerate() {
        println!("  {}. {}", i + 1, name);
    }
}

/// Fetch up to `pages` pages, then run the remaining stages and export.
///
/// Only invalid overrides are returned as errors. Stage failures, a bad
/// domain included, are printed and kept in the session's messages.
pub async fn run_pipeline(
    ctx: &AppContext,
    session: &mut Session,
    opts: RunOptions,
) -> Result<()> {
    if let Some(batch_size) = opts.batch_size {
        session.set_batch_size(batch_size)?;
    }
    if let Some(policy) = opts.image_policy {
        session.set_image_policy(policy);
    }
    if let Some(eligibility) = opts.eligibility {
        session.set_eligibility(eligibility);
    }
    if let Some(columns) = opts.columns {
        *session.columns_mut() = ColumnList::new(columns)?;
    }
    session.set_offset(opts.offset);

    for _ in 0..opts.pages.max(1) {
        let report = session.fetch(ctx, &opts.domain).await;
        print_report(&report);
        if report.severity != Severity::Info {
            break;
        }
    }

    if session.items().is_empty() {
        println!("Nothing fetched, skipping remaining stages");
        return Ok(());
    }

    if !opts.skip_images {
        print_report(&session.check_images(ctx).await);
    }

    if !opts.skip_rewrite {
        print_report(&session.rewrite_titles(ctx).await);
    }

    print_report(&session.export(&opts.output));
    summarize(session);
    Ok(())
}

fn summarize(session: &Session) {
    let errors = session
        .messages()
        .iter()
        .filter(|m| m.severity == Severity::Error)
        .count();
    println!(
        "Run complete: {} items, {} errors",
        session.items().len(),
        errors
    );
}

/// Resolve the export directory: explicit flag first, then config.
pub fn output_dir(flag: Option<PathBuf>, configured: &Path) -> PathBuf {
    flag.unwrap_or_else(|| configured.to_path_buf())
}

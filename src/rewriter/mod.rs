//! Batched title rewriting.
//!
//! Eligible items are sent to a [`TitleRewriter`] in groups of
//! [`GROUP_SIZE`], one group at a time. Results are merged back by item id.
//! A group that fails is recorded in the [`RewriteSummary`] and skipped.

mod anthropic;
mod parse;

pub use anthropic::{build_prompt, AnthropicRewriter};
pub use parse::{extract_json_array, parse_title_list};

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::app::{BulkfeedError, Result};
use crate::domain::Item;

pub const GROUP_SIZE: usize = 5;

#[async_trait]
pub trait TitleRewriter: Send + Sync {
    /// Rewrite `titles`, returning one title per input in the same order.
    async fn rewrite(&self, titles: &[String]) -> Result<Vec<String>>;
}

/// Which items are sent for rewriting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RewriteEligibility {
    /// Any item with a non-empty image URL.
    #[default]
    HasImage,
    /// Only items whose last image check confirmed the image.
    ValidImage,
}

impl RewriteEligibility {
    pub fn admits(self, item: &Item) -> bool {
        match self {
            RewriteEligibility::HasImage => item.has_image(),
            RewriteEligibility::ValidImage => item.image_status.is_reachable(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RewriteEligibility::HasImage => "has-image",
            RewriteEligibility::ValidImage => "valid-image",
        }
    }
}

impl fmt::Display for RewriteEligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RewriteEligibility {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "has-image" | "has_image" => Ok(RewriteEligibility::HasImage),
            "valid-image" | "valid_image" | "valid" => Ok(RewriteEligibility::ValidImage),
            other => Err(format!(
                "Unknown eligibility: '{}'. Use has-image or valid-image",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupFailure {
    /// 1-based group number.
    pub group: usize,
    pub item_ids: Vec<u64>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteSummary {
    pub eligible: usize,
    pub groups: usize,
    pub titles_updated: usize,
    pub failures: Vec<GroupFailure>,
}

impl fmt::Display for RewriteSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} eligible titles rewritten, {}/{} groups failed",
            self.titles_updated,
            self.eligible,
            self.failures.len(),
            self.groups
        )
    }
}

async fn rewrite_group(rewriter: &dyn TitleRewriter, titles: &[String]) -> Result<Vec<String>> {
    let rewritten = rewriter.rewrite(titles).await?;
    if rewritten.len() != titles.len() {
        return Err(BulkfeedError::Rewrite(format!(
            "expected {} titles, got {}",
            titles.len(),
            rewritten.len()
        )));
    }
    Ok(rewritten)
}

/// Rewrite the titles of every eligible item and return the new snapshot.
///
/// Input titles are always the originals. Items whose group fails keep
/// whatever `optimized_title` they had before.
pub async fn optimize_eligible(
    rewriter: &dyn TitleRewriter,
    eligibility: RewriteEligibility,
    items: &[Item],
) -> (Vec<Item>, RewriteSummary) {
    let mut snapshot = items.to_vec();
    let position: HashMap<u64, usize> = snapshot
        .iter()
        .enumerate()
        .map(|(index, item)| (item.id, index))
        .collect();

    let eligible: Vec<(u64, String)> = items
        .iter()
        .filter(|item| eligibility.admits(item))
        .map(|item| (item.id, item.title.clone()))
        .collect();

    let mut summary = RewriteSummary {
        eligible: eligible.len(),
        ..Default::default()
    };

    for (index, group) in eligible.chunks(GROUP_SIZE).enumerate() {
        summary.groups += 1;
        let titles: Vec<String> = group.iter().map(|(_, title)| title.clone()).collect();

        match rewrite_group(rewriter, &titles).await {
            Ok(rewritten) => {
                for ((id, _), new_title) in group.iter().zip(rewritten) {
                    let new_title = new_title.trim();
                    if new_title.is_empty() {
                        continue;
                    }
                    if let Some(&at) = position.get(id) {
                        snapshot[at].optimized_title = Some(new_title.to_string());
                        summary.titles_updated += 1;
                    }
                }
            }
            Err(e) => {
                warn!("Rewrite group {} failed: {}", index + 1, e);
                summary.failures.push(GroupFailure {
                    group: index + 1,
                    item_ids: group.iter().map(|(id, _)| *id).collect(),
                    message: e.to_string(),
                });
            }
        }
    }

    info!("Title rewrite ({}): {}", eligibility, summary);
    (snapshot, summary)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use super::*;
    use crate::domain::ImageStatus;

    /// Prefixes each title with "Better: ", failing on chosen call numbers.
    #[derive(Default)]
    pub(crate) struct StubRewriter {
        pub fail_calls: HashSet<usize>,
        pub short_calls: HashSet<usize>,
        pub calls: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl TitleRewriter for StubRewriter {
        async fn rewrite(&self, titles: &[String]) -> Result<Vec<String>> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(titles.to_vec());
                calls.len()
            };
            if self.fail_calls.contains(&call) {
                return Err(BulkfeedError::Rewrite("service unavailable".into()));
            }
            let mut out: Vec<String> = titles.iter().map(|t| format!("Better: {}", t)).collect();
            if self.short_calls.contains(&call) {
                out.pop();
            }
            Ok(out)
        }
    }

    fn items_with_images(n: u64) -> Vec<Item> {
        (1..=n)
            .map(|id| {
                Item::new(id, format!("Post {}", id), format!("https://example.com/{}", id))
                    .with_image(format!("https://example.com/{}.jpg", id))
            })
            .collect()
    }

    #[tokio::test]
    async fn test_failed_group_does_not_block_others() {
        let rewriter = StubRewriter {
            fail_calls: [2].into_iter().collect(),
            ..Default::default()
        };
        let items = items_with_images(12);

        let (updated, summary) =
            optimize_eligible(&rewriter, RewriteEligibility::HasImage, &items).await;

        for item in &updated {
            if (6..=10).contains(&item.id) {
                assert_eq!(item.optimized_title, None, "item {}", item.id);
            } else {
                assert_eq!(
                    item.optimized_title.as_deref(),
                    Some(format!("Better: Post {}", item.id).as_str())
                );
            }
        }
        assert_eq!(summary.groups, 3);
        assert_eq!(summary.titles_updated, 7);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].group, 2);
        assert_eq!(summary.failures[0].item_ids, vec![6, 7, 8, 9, 10]);

        let calls = rewriter.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[2], vec!["Post 11", "Post 12"]);
    }

    #[tokio::test]
    async fn test_wrong_length_reply_fails_group() {
        let rewriter = StubRewriter {
            short_calls: [1].into_iter().collect(),
            ..Default::default()
        };
        let items = items_with_images(7);

        let (updated, summary) =
            optimize_eligible(&rewriter, RewriteEligibility::HasImage, &items).await;

        assert!(updated[..5].iter().all(|i| i.optimized_title.is_none()));
        assert!(updated[5..].iter().all(|i| i.optimized_title.is_some()));
        assert_eq!(summary.failures.len(), 1);
        assert!(summary.failures[0].message.contains("expected 5 titles, got 4"));
    }

    #[tokio::test]
    async fn test_merge_is_by_id_around_ineligible_items() {
        let mut items = items_with_images(4);
        items[1].image_url = None;
        items[2].image_url = None;

        let rewriter = StubRewriter::default();
        let (updated, summary) =
            optimize_eligible(&rewriter, RewriteEligibility::HasImage, &items).await;

        assert_eq!(summary.eligible, 2);
        assert_eq!(updated[0].optimized_title.as_deref(), Some("Better: Post 1"));
        assert_eq!(updated[1].optimized_title, None);
        assert_eq!(updated[2].optimized_title, None);
        assert_eq!(updated[3].optimized_title.as_deref(), Some("Better: Post 4"));
        assert_eq!(updated.len(), items.len());
    }

    #[tokio::test]
    async fn test_valid_image_policy_is_stricter() {
        let mut items = items_with_images(3);
        items[0].image_status = ImageStatus::Valid;
        items[1].image_status = ImageStatus::Invalid;
        items[2].image_status = ImageStatus::CanvaOk;

        let rewriter = StubRewriter::default();
        let (updated, _) =
            optimize_eligible(&rewriter, RewriteEligibility::ValidImage, &items).await;

        assert!(updated[0].optimized_title.is_some());
        assert!(updated[1].optimized_title.is_none());
        assert!(updated[2].optimized_title.is_some());
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_optimized_title() {
        let mut items = items_with_images(1);
        items[0].optimized_title = Some("Earlier rewrite".into());

        let rewriter = StubRewriter {
            fail_calls: [1].into_iter().collect(),
            ..Default::default()
        };
        let (updated, _) =
            optimize_eligible(&rewriter, RewriteEligibility::HasImage, &items).await;

        assert_eq!(updated[0].optimized_title.as_deref(), Some("Earlier rewrite"));
    }

    #[tokio::test]
    async fn test_no_eligible_items_makes_no_calls() {
        let items = vec![Item::new(1, "No image", "https://example.com/1")];
        let rewriter = StubRewriter::default();

        let (_, summary) =
            optimize_eligible(&rewriter, RewriteEligibility::HasImage, &items).await;

        assert_eq!(summary.groups, 0);
        assert!(rewriter.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_eligibility_parsing() {
        assert_eq!(
            "valid-image".parse::<RewriteEligibility>(),
            Ok(RewriteEligibility::ValidImage)
        );
        assert_eq!(
            "HAS_IMAGE".parse::<RewriteEligibility>(),
            Ok(RewriteEligibility::HasImage)
        );
        assert!("everything".parse::<RewriteEligibility>().is_err());
    }
}

use std::collections::HashSet;

use tracing::{debug, info};

use crate::app::{BulkfeedError, Result};
use crate::domain::Item;
use crate::fetcher::{posts_url, Fetcher};
use crate::normalizer::Normalizer;

/// New items accepted from one page.
#[derive(Debug)]
pub struct PageFetch {
    pub items: Vec<Item>,
    /// Records the server returned, before deduplication.
    pub received: usize,
}

/// Fetch one page of posts and keep only ids not already in `seen_ids`.
///
/// Accepted ids are added to `seen_ids`. A page that yields nothing new is
/// reported as [`BulkfeedError::EmptyPage`].
pub async fn fetch_page(
    fetcher: &(dyn Fetcher + Send + Sync),
    normalizer: &Normalizer,
    domain: &str,
    per_page: usize,
    offset: usize,
    seen_ids: &mut HashSet<u64>,
) -> Result<PageFetch> {
    let url = posts_url(domain, per_page, offset)?;
    debug!("Fetching {}", url);

    let body = fetcher.fetch(url.as_str()).await?;
    let (meta, items) = normalizer.normalize(domain, &body)?;

    let mut accepted = Vec::with_capacity(items.len());
    for item in items {
        if seen_ids.insert(item.id) {
            accepted.push(item);
        }
    }

    if accepted.is_empty() {
        return Err(BulkfeedError::EmptyPage {
            offset,
            received: meta.received,
        });
    }

    info!(
        "Accepted {} new items from {} (offset {}, {} received)",
        accepted.len(),
        domain,
        offset,
        meta.received
    );

    Ok(PageFetch {
        items: accepted,
        received: meta.received,
    })
}

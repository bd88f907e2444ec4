//! Image reachability checks.
//!
//! Each item's featured image is probed once per check, one request at a
//! time, and the item's [`ImageStatus`] is replaced with the outcome. How an
//! outcome is decided is an explicit [`ImageCheckPolicy`]:
//!
//! - [`ImageCheckPolicy::Existence`]: a `HEAD` that completes at all counts as
//!   reachable; if it fails, a full `GET` bounded by [`FALLBACK_LOAD_TIMEOUT`]
//!   decides.
//! - [`ImageCheckPolicy::ContentType`]: a full `GET` must succeed and declare
//!   an `image/*` content type.
//! - [`ImageCheckPolicy::CanvaFetch`]: the content-type rule, labelled
//!   `canva_ok` / `canva_fail`.

mod http_prober;

pub use http_prober::HttpProber;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::Result;
use crate::domain::{ImageStatus, Item};

/// Timeout for the Existence policy's fallback load.
pub const FALLBACK_LOAD_TIMEOUT: Duration = Duration::from_secs(5);

/// Status line and declared content type of a probed URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    pub content_type: Option<String>,
}

impl ProbeResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"))
    }
}

/// Network side of an image check.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Lightweight existence probe. Errors only when no response arrived.
    async fn head(&self, url: &str) -> Result<ProbeResponse>;

    /// Full retrieval, optionally bounded by `timeout`.
    async fn get(&self, url: &str, timeout: Option<Duration>) -> Result<ProbeResponse>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageCheckPolicy {
    Existence,
    #[default]
    ContentType,
    CanvaFetch,
}

impl ImageCheckPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageCheckPolicy::Existence => "existence",
            ImageCheckPolicy::ContentType => "content-type",
            ImageCheckPolicy::CanvaFetch => "canva-fetch",
        }
    }

    fn labels(self) -> (ImageStatus, ImageStatus) {
        match self {
            ImageCheckPolicy::CanvaFetch => (ImageStatus::CanvaOk, ImageStatus::CanvaFail),
            _ => (ImageStatus::Valid, ImageStatus::Invalid),
        }
    }
}

impl fmt::Display for ImageCheckPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageCheckPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "existence" => Ok(ImageCheckPolicy::Existence),
            "content-type" | "content_type" => Ok(ImageCheckPolicy::ContentType),
            "canva-fetch" | "canva_fetch" | "canva" => Ok(ImageCheckPolicy::CanvaFetch),
            other => Err(format!(
                "Unknown image policy: '{}'. Use existence, content-type or canva-fetch",
                other
            )),
        }
    }
}

/// Per-status counts from one full check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageSummary {
    counts: BTreeMap<&'static str, usize>,
}

impl ImageSummary {
    fn record(&mut self, status: ImageStatus) {
        *self.counts.entry(status.as_str()).or_default() += 1;
    }

    pub fn count(&self, status: ImageStatus) -> usize {
        self.counts.get(status.as_str()).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

impl fmt::Display for ImageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.counts.is_empty() {
            return f.write_str("no items");
        }
        let parts: Vec<String> = self
            .counts
            .iter()
            .map(|(label, count)| format!("{} {}", count, label))
            .collect();
        f.write_str(&parts.join(", "))
    }
}

/// Classify a single item. Items without an image URL never hit the network.
pub async fn check_one(prober: &dyn Prober, policy: ImageCheckPolicy, item: &Item) -> ImageStatus {
    let Some(url) = item.image_url.as_deref().filter(|_| item.has_image()) else {
        return ImageStatus::NoImage;
    };

    let (ok, fail) = policy.labels();

    let reachable = match policy {
        ImageCheckPolicy::Existence => match prober.head(url).await {
            Ok(_) => true,
            Err(e) => {
                debug!("HEAD {} failed ({}), trying full load", url, e);
                match prober.get(url, Some(FALLBACK_LOAD_TIMEOUT)).await {
                    Ok(response) => response.is_success(),
                    Err(e) => {
                        debug!("Image load {} failed: {}", url, e);
                        false
                    }
                }
            }
        },
        ImageCheckPolicy::ContentType | ImageCheckPolicy::CanvaFetch => {
            match prober.get(url, None).await {
                Ok(response) => response.is_success() && response.is_image(),
                Err(e) => {
                    debug!("GET {} failed: {}", url, e);
                    false
                }
            }
        }
    };

    if reachable {
        ok
    } else {
        fail
    }
}

/// Re-check every item in order and return the new snapshot with counts.
pub async fn check_all(
    prober: &dyn Prober,
    policy: ImageCheckPolicy,
    items: &[Item],
) -> (Vec<Item>, ImageSummary) {
    let mut checked = Vec::with_capacity(items.len());
    let mut summary = ImageSummary::default();

    for item in items {
        let status = check_one(prober, policy, item).await;
        summary.record(status);

        let mut item = item.clone();
        item.image_status = status;
        checked.push(item);
    }

    info!("Checked {} images ({}): {}", items.len(), policy, summary);
    (checked, summary)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::app::BulkfeedError;

    #[derive(Clone)]
    pub(crate) enum Canned {
        Respond(u16, Option<&'static str>),
        Fail,
    }

    /// Answers from per-URL tables and records every call.
    #[derive(Default)]
    pub(crate) struct StubProber {
        pub head: HashMap<String, Canned>,
        pub get: HashMap<String, Canned>,
        pub calls: Mutex<Vec<String>>,
    }

    impl StubProber {
        fn answer(table: &HashMap<String, Canned>, url: &str) -> Result<ProbeResponse> {
            match table.get(url) {
                Some(Canned::Respond(status, ct)) => Ok(ProbeResponse {
                    status: *status,
                    content_type: ct.map(String::from),
                }),
                _ => Err(BulkfeedError::Probe(format!("unreachable: {}", url))),
            }
        }
    }

    #[async_trait]
    impl Prober for StubProber {
        async fn head(&self, url: &str) -> Result<ProbeResponse> {
            self.calls.lock().unwrap().push(format!("HEAD {}", url));
            Self::answer(&self.head, url)
        }

        async fn get(&self, url: &str, timeout: Option<Duration>) -> Result<ProbeResponse> {
            let tag = if timeout.is_some() { "LOAD" } else { "GET" };
            self.calls.lock().unwrap().push(format!("{} {}", tag, url));
            Self::answer(&self.get, url)
        }
    }

    fn item(id: u64, url: Option<&str>) -> Item {
        let item = Item::new(id, format!("Post {}", id), format!("https://example.com/{}", id));
        match url {
            Some(u) => item.with_image(u),
            None => item,
        }
    }

    async fn status_of(
        prober: &StubProber,
        policy: ImageCheckPolicy,
        id: u64,
        url: &str,
    ) -> ImageStatus {
        check_one(prober, policy, &item(id, Some(url))).await
    }

    #[tokio::test]
    async fn test_missing_image_never_probes() {
        let prober = StubProber::default();
        for policy in [
            ImageCheckPolicy::Existence,
            ImageCheckPolicy::ContentType,
            ImageCheckPolicy::CanvaFetch,
        ] {
            let status = check_one(&prober, policy, &item(1, None)).await;
            assert_eq!(status, ImageStatus::NoImage);
        }
        assert!(prober.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_content_type_policy() {
        let mut prober = StubProber::default();
        prober.get.insert("https://x/a.png".into(), Canned::Respond(200, Some("image/png")));
        prober.get.insert("https://x/b.html".into(), Canned::Respond(200, Some("text/html")));
        prober.get.insert("https://x/c.png".into(), Canned::Respond(404, Some("image/png")));
        prober.get.insert("https://x/e.png".into(), Canned::Fail);

        let policy = ImageCheckPolicy::ContentType;
        assert_eq!(status_of(&prober, policy, 1, "https://x/a.png").await, ImageStatus::Valid);
        assert_eq!(status_of(&prober, policy, 2, "https://x/b.html").await, ImageStatus::Invalid);
        assert_eq!(status_of(&prober, policy, 3, "https://x/c.png").await, ImageStatus::Invalid);
        assert_eq!(status_of(&prober, policy, 4, "https://x/d.png").await, ImageStatus::Invalid);
        assert_eq!(status_of(&prober, policy, 5, "https://x/e.png").await, ImageStatus::Invalid);
    }

    #[tokio::test]
    async fn test_canva_policy_labels() {
        let mut prober = StubProber::default();
        prober.get.insert("https://x/a.jpg".into(), Canned::Respond(200, Some("image/jpeg")));

        let policy = ImageCheckPolicy::CanvaFetch;
        assert_eq!(status_of(&prober, policy, 1, "https://x/a.jpg").await, ImageStatus::CanvaOk);
        assert_eq!(status_of(&prober, policy, 2, "https://x/z.jpg").await, ImageStatus::CanvaFail);
    }

    #[tokio::test]
    async fn test_existence_policy_accepts_any_head_response() {
        let mut prober = StubProber::default();
        prober.head.insert("https://x/a.png".into(), Canned::Respond(403, None));

        let status = status_of(&prober, ImageCheckPolicy::Existence, 1, "https://x/a.png").await;
        assert_eq!(status, ImageStatus::Valid);
        assert_eq!(*prober.calls.lock().unwrap(), vec!["HEAD https://x/a.png"]);
    }

    #[tokio::test]
    async fn test_existence_policy_falls_back_to_bounded_load() {
        let mut prober = StubProber::default();
        prober.get.insert("https://x/a.png".into(), Canned::Respond(200, Some("image/png")));
        prober.get.insert("https://x/b.png".into(), Canned::Respond(500, None));

        let policy = ImageCheckPolicy::Existence;
        assert_eq!(status_of(&prober, policy, 1, "https://x/a.png").await, ImageStatus::Valid);
        assert_eq!(status_of(&prober, policy, 2, "https://x/b.png").await, ImageStatus::Invalid);
        assert_eq!(status_of(&prober, policy, 3, "https://x/c.png").await, ImageStatus::Invalid);

        let calls = prober.calls.lock().unwrap();
        assert_eq!(calls[0], "HEAD https://x/a.png");
        assert_eq!(calls[1], "LOAD https://x/a.png");
    }

    #[tokio::test]
    async fn test_check_all_processes_every_item_in_order() {
        let mut prober = StubProber::default();
        prober.get.insert("https://x/1.png".into(), Canned::Respond(200, Some("image/png")));
        prober.get.insert("https://x/2.png".into(), Canned::Fail);

        let items = vec![
            item(1, Some("https://x/1.png")),
            item(2, Some("https://x/2.png")),
            item(3, None),
            item(4, Some("https://x/1.png")),
        ];

        let (checked, summary) = check_all(&prober, ImageCheckPolicy::ContentType, &items).await;

        let statuses: Vec<ImageStatus> = checked.iter().map(|i| i.image_status).collect();
        assert_eq!(
            statuses,
            vec![ImageStatus::Valid, ImageStatus::Invalid, ImageStatus::NoImage, ImageStatus::Valid]
        );
        assert_eq!(summary.count(ImageStatus::Valid), 2);
        assert_eq!(summary.count(ImageStatus::Invalid), 1);
        assert_eq!(summary.count(ImageStatus::NoImage), 1);
        assert_eq!(summary.total(), 4);
        assert_eq!(prober.calls.lock().unwrap().len(), 3);
        // input snapshot untouched
        assert!(items.iter().all(|i| i.image_status == ImageStatus::Pending));
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("existence".parse::<ImageCheckPolicy>(), Ok(ImageCheckPolicy::Existence));
        assert_eq!("Content-Type".parse::<ImageCheckPolicy>(), Ok(ImageCheckPolicy::ContentType));
        assert_eq!("canva".parse::<ImageCheckPolicy>(), Ok(ImageCheckPolicy::CanvaFetch));
        assert!("fast".parse::<ImageCheckPolicy>().is_err());
    }

    #[test]
    fn test_probe_response_image_detection() {
        let response = ProbeResponse {
            status: 200,
            content_type: Some("Image/WEBP; charset=binary".into()),
        };
        assert!(response.is_success());
        assert!(response.is_image());

        let response = ProbeResponse { status: 204, content_type: None };
        assert!(!response.is_image());
    }
}

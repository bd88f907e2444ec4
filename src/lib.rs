//! # Bulkfeed
//!
//! Turns a WordPress site's posts into a Canva Bulk Create CSV.
//!
//! ## Architecture
//!
//! ```text
//! Fetcher → Normalizer → Checker → Rewriter → Export
//! ```
//!
//! Every stage reads an immutable snapshot of the collection held by a
//! [`Session`](session::Session) and hands back a new one.
//!
//! ## Quick Start
//!
//! ```bash
//! # Check a domain
//! bulkfeed validate example.com
//!
//! # Two pages of 20, image check, new titles, CSV in ./out
//! bulkfeed run --domain example.com --batch-size 20 --pages 2 --output out
//!
//! # Drive each stage by hand
//! bulkfeed shell --domain example.com
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the fetcher,
/// normalizer, image prober and title rewriter.
pub mod app;

/// Image reachability checks.
///
/// - [`Prober`](checker::Prober): Async trait for HEAD/GET probes
/// - [`ImageCheckPolicy`](checker::ImageCheckPolicy): existence, content-type or canva-fetch
pub mod checker;

/// Command-line interface using clap.
///
/// - `validate <domain>` - Check a domain
/// - `run` - Fetch, check, rewrite and export in one go
/// - `shell` - Interactive session
pub mod cli;

/// Configuration loaded from `~/.config/bulkfeed/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`Item`](domain::Item): One post as it moves through the pipeline
/// - [`ImageStatus`](domain::ImageStatus): Result of the last image check
pub mod domain;

/// CSV export with an editable column list.
pub mod export;

/// HTTP fetching and pagination.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for fetching raw bytes
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation
/// - [`fetch_page`](fetcher::fetch_page): One page of posts, deduplicated by id
pub mod fetcher;

/// WordPress REST payloads to [`Item`](domain::Item)s.
pub mod normalizer;

/// Title rewriting through the Anthropic Messages API.
pub mod rewriter;

/// Pipeline state and stage orchestration.
pub mod session;

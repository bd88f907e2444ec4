use std::sync::Arc;

use tracing::warn;

use crate::app::error::Result;
use crate::checker::{HttpProber, Prober};
use crate::config::Config;
use crate::fetcher::http_fetcher::HttpFetcher;
use crate::fetcher::Fetcher;
use crate::normalizer::Normalizer;
use crate::rewriter::{AnthropicRewriter, TitleRewriter};

/// Wires the network collaborators each pipeline stage needs.
pub struct AppContext {
    pub config: Config,
    pub fetcher: Arc<dyn Fetcher + Send + Sync>,
    pub normalizer: Normalizer,
    pub prober: Arc<dyn Prober>,
    /// Absent when no API key is available; the rewrite stage reports it.
    pub rewriter: Option<Arc<dyn TitleRewriter>>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let user_agent = config.source.user_agent.clone();
        let fetcher: Arc<dyn Fetcher + Send + Sync> = Arc::new(HttpFetcher::new(&user_agent)?);
        let prober: Arc<dyn Prober> = Arc::new(HttpProber::new(&user_agent)?);

        let rewriter: Option<Arc<dyn TitleRewriter>> =
            match AnthropicRewriter::from_config(&config.rewrite) {
                Ok(r) => Some(Arc::new(r)),
                Err(e) => {
                    warn!("Title rewriting disabled: {}", e);
                    None
                }
            };

        Ok(Self::with_components(config, fetcher, prober, rewriter))
    }

    pub fn with_components(
        config: Config,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        prober: Arc<dyn Prober>,
        rewriter: Option<Arc<dyn TitleRewriter>>,
    ) -> Self {
        Self {
            config,
            fetcher,
            normalizer: Normalizer::new(),
            prober,
            rewriter,
        }
    }
}

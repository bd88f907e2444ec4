pub mod http_fetcher;
pub mod page;

use async_trait::async_trait;
use url::Url;

use crate::app::Result;

pub use page::{fetch_page, PageFetch};

#[async_trait]
pub trait Fetcher {
    /// GET `url` and return the body of a successful response.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Build the posts collection URL for one page.
pub fn posts_url(domain: &str, per_page: usize, offset: usize) -> Result<Url> {
    let mut url = Url::parse(&format!("https://{}/wp-json/wp/v2/posts", domain))?;
    url.query_pairs_mut()
        .append_pair("per_page", &per_page.to_string())
        .append_key_only("_embed")
        .append_pair("offset", &offset.to_string());
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_posts_url() {
        let url = posts_url("example.com", 20, 40).unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.com/wp-json/wp/v2/posts?per_page=20&_embed&offset=40"
        );
    }
}

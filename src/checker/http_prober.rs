use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};

use crate::app::Result;
use crate::checker::{ProbeResponse, Prober};

/// reqwest-backed prober. Non-success statuses are returned, not raised;
/// only transport failures and timeouts are errors.
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder().user_agent(user_agent).build()?;
        Ok(Self { client })
    }
}

fn describe(response: &Response) -> ProbeResponse {
    ProbeResponse {
        status: response.status().as_u16(),
        content_type: response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from),
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn head(&self, url: &str) -> Result<ProbeResponse> {
        let response = self.client.head(url).send().await?;
        Ok(describe(&response))
    }

    async fn get(&self, url: &str, timeout: Option<Duration>) -> Result<ProbeResponse> {
        let mut request = self.client.get(url);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let probe = describe(&response);

        // Pull the whole body so truncated or stalled transfers count as failures.
        response.bytes().await?;

        Ok(probe)
    }
}

//! Platform write client — bearer-authenticated JSON POST.

use async_trait::async_trait;
use birdcall_core::config::PlatformConfig;
use birdcall_core::error::{BirdcallError, Result};
use birdcall_core::traits::{PostClient, PostReceipt};
use serde::Deserialize;

/// Client for the platform's v2 write API.
pub struct XApiClient {
    config: PlatformConfig,
    client: reqwest::Client,
}

impl XApiClient {
    pub fn new(config: PlatformConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_base.trim_end_matches('/'), path)
    }

    fn post_url(id: &str) -> String {
        format!("https://x.com/i/status/{id}")
    }
}

#[derive(Debug, Deserialize)]
struct CreatePostResponse {
    data: CreatedPost,
}

#[derive(Debug, Deserialize)]
struct CreatedPost {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

#[async_trait]
impl PostClient for XApiClient {
    async fn submit_post(&self, text: &str) -> Result<PostReceipt> {
        if self.config.bearer_token.is_empty() {
            return Err(BirdcallError::Execution(
                "no bearer_token configured; set [platform] bearer_token in config.toml".into(),
            ));
        }

        let response = self
            .client
            .post(self.api_url("tweets"))
            .bearer_auth(&self.config.bearer_token)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(|e| BirdcallError::Execution(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            // Pull the platform's own description out when the body has one.
            let detail = match response.json::<ApiErrorBody>().await {
                Ok(body) => body.detail.or(body.title).unwrap_or_default(),
                Err(_) => String::new(),
            };
            return Err(BirdcallError::Execution(format!(
                "platform returned {status}: {detail}"
            )));
        }

        let body: CreatePostResponse = response
            .json()
            .await
            .map_err(|e| BirdcallError::Execution(format!("invalid platform response: {e}")))?;

        tracing::debug!("Platform accepted post {}", body.data.id);
        Ok(PostReceipt {
            url: Self::post_url(&body.data.id),
            id: body.data.id,
        })
    }
}

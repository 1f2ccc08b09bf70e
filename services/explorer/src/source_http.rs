use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::source::{ProofSource, SourceInfo};
use crate::types::SubjectRef;

/// Proof server reached over its REST API.
pub struct HttpProofSource {
    base_url: String,
    client: reqwest::Client,
}

impl HttpProofSource {
    pub fn new(base_url: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { base_url, client })
    }

    async fn get_json(&self, path: &str) -> anyhow::Result<Option<JsonValue>> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "proof server request");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = resp.error_for_status()?;
        Ok(Some(resp.json().await.with_context(|| format!("GET {url}: body is not JSON"))?))
    }
}

#[async_trait]
impl ProofSource for HttpProofSource {
    async fn micro_proof(&self, at: SubjectRef) -> anyhow::Result<Option<JsonValue>> {
        self.get_json(&format!("/proof/{}/{}/{}", at.block, at.thread, at.leaf)).await
    }

    async fn proofchain(&self, at: SubjectRef) -> anyhow::Result<Option<JsonValue>> {
        self.get_json(&format!("/proofchain/{}/{}/{}", at.block, at.thread, at.leaf)).await
    }

    async fn ping(&self) -> anyhow::Result<()> {
        let url = format!("{}/health", self.base_url);
        self.client.get(url).send().await?.error_for_status()?;
        Ok(())
    }

    fn info(&self) -> SourceInfo {
        SourceInfo {
            name: "qproof-http".to_string(),
            base_url: self.base_url.clone(),
        }
    }
}

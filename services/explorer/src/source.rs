use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::types::SubjectRef;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SourceInfo {
    pub name: String,
    pub base_url: String,
}

/// Where proofs come from. `Ok(None)` means the server has no such proof.
///
/// Records are returned as raw JSON; shape checks belong to the verifier.
#[async_trait]
pub trait ProofSource: Send + Sync {
    async fn micro_proof(&self, at: SubjectRef) -> anyhow::Result<Option<JsonValue>>;
    async fn proofchain(&self, at: SubjectRef) -> anyhow::Result<Option<JsonValue>>;
    async fn ping(&self) -> anyhow::Result<()>;
    fn info(&self) -> SourceInfo;
}

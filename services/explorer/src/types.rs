use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use qproof::{ChainAudit, ChainVerificationResult, Subject, Verdict};

/// block/thread/leaf coordinates of a proof on the proof server
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubjectRef {
    pub block: u64,
    pub thread: u64,
    pub leaf: u64,
}

impl fmt::Display for SubjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.block, self.thread, self.leaf)
    }
}

impl FromStr for SubjectRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('/').collect();
        let [block, thread, leaf] = parts.as_slice() else {
            return Err(format!("expected block/thread/leaf, got {s:?}"));
        };
        let num = |v: &str| v.parse::<u64>().map_err(|e| format!("{s:?}: {e}"));
        Ok(Self {
            block: num(*block)?,
            thread: num(*thread)?,
            leaf: num(*leaf)?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct VerifyResponse {
    pub subject: Option<Subject>,
    pub verdict: Verdict,
    pub label: &'static str,
    pub result: Option<ChainVerificationResult>,
    pub server_claim: Option<bool>,
    pub claim_agrees: Option<bool>,
}

#[derive(Deserialize)]
pub struct AuditRequest {
    pub entries: Vec<serde_json::Value>,
    #[serde(default = "default_anchored")]
    pub anchored: bool,
}

fn default_anchored() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct AuditResponse {
    pub audit: ChainAudit,
}

#[derive(Debug, Serialize)]
pub struct ProofchainResponse {
    pub proofchain_id: String,
    pub verdict: Verdict,
    pub label: &'static str,
    pub result: Option<ChainVerificationResult>,
}

#[derive(Clone, Debug, Serialize)]
pub struct WatchEntry {
    pub subject: SubjectRef,
    pub verdict: Option<Verdict>,
    pub error: Option<String>,
}

/// Immutable result of one watch pass
#[derive(Clone, Debug, Default, Serialize)]
pub struct WatchSnapshot {
    pub checked_at: Option<chrono::DateTime<chrono::Utc>>,
    pub entries: Vec<WatchEntry>,
}

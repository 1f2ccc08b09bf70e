//! Verdict shapes for UI and CLI consumers

use serde::Serialize;

use crate::{ChainVerificationResult, SignatureStatus, VerifyError};

/// Display state of a verification. `Malformed` is kept apart from `Failed`
/// and never collapses into `Verified`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Verdict {
    Verified,
    Failed { layer: u32 },
    Malformed { reason: String, layer: Option<u32> },
}

impl Verdict {
    pub fn from_result(result: &ChainVerificationResult) -> Self {
        match result.first_mismatch_layer {
            None => Verdict::Verified,
            Some(layer) => Verdict::Failed { layer },
        }
    }

    pub fn from_error(err: &VerifyError) -> Self {
        Verdict::Malformed {
            reason: err.to_string(),
            layer: err.layer(),
        }
    }

    pub fn from_outcome(outcome: &Result<ChainVerificationResult, VerifyError>) -> Self {
        match outcome {
            Ok(result) => Verdict::from_result(result),
            Err(err) => Verdict::from_error(err),
        }
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, Verdict::Verified)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Verified => "Verified",
            Verdict::Failed { .. } => "Failed Verification",
            Verdict::Malformed { .. } => "Malformed Proof",
        }
    }
}

/// Explorer validation summary: verdict, layer count, recomputed top root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub proof_layers: usize,
    /// Hex of the recomputed top root; empty when nothing could be computed
    pub root: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ValidationReport {
    pub fn from_outcome(
        outcome: &Result<ChainVerificationResult, VerifyError>,
        proof_layers: usize,
    ) -> Self {
        match outcome {
            Ok(result) => ValidationReport {
                valid: result.valid,
                proof_layers,
                root: result.top_root().map(hex::encode).unwrap_or_default(),
                error_message: result.first_mismatch_layer.map(|l| rejection_reason(result, l)),
            },
            Err(err) => ValidationReport {
                valid: false,
                proof_layers,
                root: String::new(),
                error_message: Some(err.to_string()),
            },
        }
    }
}

fn rejection_reason(result: &ChainVerificationResult, layer: u32) -> String {
    let found = result.layer_results.iter().find(|r| r.layer_index == layer);
    match found {
        Some(r) if r.matches_claimed_root => match r.signature {
            SignatureStatus::Absent => format!("layer {layer} root is not signed"),
            status => format!("layer {layer} root signature is {}", signature_word(status)),
        },
        _ => format!("layer {layer} does not reproduce its claimed root"),
    }
}

fn signature_word(status: SignatureStatus) -> &'static str {
    match status {
        SignatureStatus::Absent => "absent",
        SignatureStatus::Valid => "valid",
        SignatureStatus::Invalid => "invalid",
        SignatureStatus::Unchecked => "unchecked",
    }
}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value as JsonValue;
use tracing::{info, warn};

use qproof::{MicroProof, ProofChainEntry, Verdict};

use crate::routes_verify::{api_error, fetch_micro_proof, ApiResult};
use crate::state::SharedState;
use crate::types::{AuditRequest, AuditResponse, ProofchainResponse, SubjectRef};
use crate::verify_exec::with_verifier_blocking;

pub async fn post_verify_proofchain(
    State(st): State<SharedState>,
    Json(req): Json<AuditRequest>,
) -> ApiResult<AuditResponse> {
    let entries = req
        .entries
        .into_iter()
        .enumerate()
        .map(|(i, raw)| {
            ProofChainEntry::from_value(raw)
                .map_err(|e| api_error(StatusCode::UNPROCESSABLE_ENTITY, format!("entry {i}: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let audit = st.verifier.audit_proof_chain(&entries, req.anchored);
    if let Some(pos) = audit.first_broken_link {
        info!(position = pos, entries = entries.len(), "proofchain audit found a broken link");
    }
    Ok((StatusCode::OK, Json(AuditResponse { audit })))
}

fn proofchain_id_of(raw: &JsonValue) -> String {
    match raw.get("proofchain_id") {
        Some(JsonValue::String(s)) => s.clone(),
        Some(JsonValue::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Verify a finalized entry's layer proofs against the subject leaf taken
/// from the micro proof at the same coordinates.
pub async fn get_proofchain(
    State(st): State<SharedState>,
    Path((block, thread, leaf)): Path<(u64, u64, u64)>,
) -> ApiResult<ProofchainResponse> {
    let at = SubjectRef { block, thread, leaf };
    let raw_entry = match st.source.proofchain(at).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return Err(api_error(StatusCode::NOT_FOUND, format!("no proofchain entry for {at}"))),
        Err(e) => {
            warn!(subject=%at, "proof server fetch failed: {e:#}");
            return Err(api_error(StatusCode::BAD_GATEWAY, format!("proof server: {e:#}")));
        }
    };
    let raw_proof = fetch_micro_proof(&st, at).await?;
    let proofchain_id = proofchain_id_of(&raw_entry);

    let outcome = with_verifier_blocking(st.verifier.clone(), move |v| {
        let entry = ProofChainEntry::from_value(raw_entry)?;
        let proof = MicroProof::from_value(raw_proof)?;
        v.verify_proof_chain_entry(&entry, &proof.subject.hash)
    })
    .await
    .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, format!("verification task failed: {e}")))?;

    let (status, verdict, result) = match outcome {
        Ok(result) => (StatusCode::OK, Verdict::from_result(&result), Some(result)),
        Err(err) => (StatusCode::UNPROCESSABLE_ENTITY, Verdict::from_error(&err), None),
    };
    Ok((
        status,
        Json(ProofchainResponse {
            proofchain_id,
            label: verdict.label(),
            verdict,
            result,
        }),
    ))
}

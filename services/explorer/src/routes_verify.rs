use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value as JsonValue;
use tracing::{info, warn};

use qproof::{MicroProof, ValidationReport, Verdict};

use crate::state::SharedState;
use crate::types::{ApiError, SubjectRef, VerifyResponse};
use crate::verify_exec::with_verifier_blocking;

pub type ApiFailure = (StatusCode, Json<ApiError>);
pub type ApiResult<T> = Result<(StatusCode, Json<T>), ApiFailure>;

pub fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiFailure {
    (status, Json(ApiError::new(msg)))
}

fn join_failed(e: tokio::task::JoinError) -> ApiFailure {
    api_error(StatusCode::INTERNAL_SERVER_ERROR, format!("verification task failed: {e}"))
}

/// Upstream lookup with the service's status mapping: missing → 404,
/// anything else that goes wrong → 502.
pub async fn fetch_micro_proof(st: &SharedState, at: SubjectRef) -> Result<JsonValue, ApiFailure> {
    match st.source.micro_proof(at).await {
        Ok(Some(raw)) => Ok(raw),
        Ok(None) => Err(api_error(StatusCode::NOT_FOUND, format!("no proof for {at}"))),
        Err(e) => {
            warn!(subject=%at, "proof server fetch failed: {e:#}");
            Err(api_error(StatusCode::BAD_GATEWAY, format!("proof server: {e:#}")))
        }
    }
}

async fn verify_raw(st: &SharedState, raw: JsonValue) -> ApiResult<VerifyResponse> {
    let outcome = with_verifier_blocking(st.verifier.clone(), move |v| {
        MicroProof::from_value(raw).and_then(|proof| v.verify_micro_proof(&proof))
    })
    .await
    .map_err(join_failed)?;

    match outcome {
        Ok(checked) => {
            let verdict = Verdict::from_result(&checked.result);
            if checked.claim_agrees == Some(false) {
                warn!(
                    block = checked.subject.block_number,
                    leaf = checked.subject.leaf_index,
                    server_claim = ?checked.server_claim,
                    "proof server verdict disagrees with recomputation"
                );
            }
            Ok((
                StatusCode::OK,
                Json(VerifyResponse {
                    subject: Some(checked.subject),
                    label: verdict.label(),
                    verdict,
                    result: Some(checked.result),
                    server_claim: checked.server_claim,
                    claim_agrees: checked.claim_agrees,
                }),
            ))
        }
        Err(err) => {
            let verdict = Verdict::from_error(&err);
            info!("malformed proof: {err}");
            Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(VerifyResponse {
                    subject: None,
                    label: verdict.label(),
                    verdict,
                    result: None,
                    server_claim: None,
                    claim_agrees: None,
                }),
            ))
        }
    }
}

pub async fn get_verify(
    State(st): State<SharedState>,
    Path((block, thread, leaf)): Path<(u64, u64, u64)>,
) -> ApiResult<VerifyResponse> {
    let at = SubjectRef { block, thread, leaf };
    let raw = fetch_micro_proof(&st, at).await?;
    verify_raw(&st, raw).await
}

pub async fn post_verify_proof(
    State(st): State<SharedState>,
    Json(body): Json<JsonValue>,
) -> ApiResult<VerifyResponse> {
    verify_raw(&st, body).await
}

/// Legacy explorer shape. Always 200 once the proof was fetched; problems are
/// carried in `error_message`.
pub async fn get_validate(
    State(st): State<SharedState>,
    Path((block, thread, leaf)): Path<(u64, u64, u64)>,
) -> ApiResult<ValidationReport> {
    let at = SubjectRef { block, thread, leaf };
    let raw = fetch_micro_proof(&st, at).await?;
    let raw_layers = raw
        .get("proof_chain")
        .and_then(JsonValue::as_array)
        .map_or(0, Vec::len);

    let report = with_verifier_blocking(st.verifier.clone(), move |v| match MicroProof::from_value(raw) {
        Ok(proof) => {
            let outcome = v.verify_chain(&proof.subject, &proof.proof_chain);
            ValidationReport::from_outcome(&outcome, proof.proof_chain.len())
        }
        Err(err) => ValidationReport::from_outcome(&Err(err), raw_layers),
    })
    .await
    .map_err(join_failed)?;

    Ok((StatusCode::OK, Json(report)))
}

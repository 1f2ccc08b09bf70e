use axum::{extract::State, Json};
use chrono::Utc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use qproof::{MicroProof, Verdict};

use crate::state::SharedState;
use crate::types::{SubjectRef, WatchEntry, WatchSnapshot};
use crate::verify_exec::with_verifier_blocking;

pub async fn run_watch_loop(state: SharedState) {
    if state.cfg.watch.is_empty() {
        info!("watch_loop: no subjects configured, not starting");
        return;
    }
    info!(subjects = state.cfg.watch.len(), every = ?state.cfg.watch_interval, "watch_loop: started");

    let mut ticker = interval(state.cfg.watch_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        let snapshot = refresh(&state).await;
        state.publish_watch(snapshot).await;
    }
}

/// One pass over the watch list. Per-subject failures end up in the entry.
pub async fn refresh(state: &SharedState) -> WatchSnapshot {
    let mut entries = Vec::with_capacity(state.cfg.watch.len());
    for &subject in &state.cfg.watch {
        entries.push(check_subject(state, subject).await);
    }
    WatchSnapshot {
        checked_at: Some(Utc::now()),
        entries,
    }
}

async fn check_subject(state: &SharedState, subject: SubjectRef) -> WatchEntry {
    let failed = |error: String| WatchEntry { subject, verdict: None, error: Some(error) };

    let raw = match state.source.micro_proof(subject).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return failed("not found".to_string()),
        Err(e) => {
            warn!(%subject, "watch_loop: fetch failed: {e:#}");
            return failed(format!("{e:#}"));
        }
    };

    let verdict = with_verifier_blocking(state.verifier.clone(), move |v| {
        let outcome = MicroProof::from_value(raw).and_then(|p| v.verify_chain(&p.subject, &p.proof_chain));
        Verdict::from_outcome(&outcome)
    })
    .await;

    match verdict {
        Ok(verdict) => {
            if !verdict.is_verified() {
                warn!(%subject, label = verdict.label(), "watch_loop: subject no longer verifies");
            }
            WatchEntry { subject, verdict: Some(verdict), error: None }
        }
        Err(e) => failed(format!("verification task failed: {e}")),
    }
}

pub async fn get_watch(State(st): State<SharedState>) -> Json<WatchSnapshot> {
    Json(st.watch_snapshot().await.as_ref().clone())
}

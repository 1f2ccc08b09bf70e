use std::sync::Arc;

use qproof::ProofVerifier;

/// Run hashing work off the async executor.
pub async fn with_verifier_blocking<R, F>(
    verifier: Arc<ProofVerifier>,
    f: F,
) -> Result<R, tokio::task::JoinError>
where
    R: Send + 'static,
    F: FnOnce(&ProofVerifier) -> R + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&verifier)).await
}

use std::sync::Arc;

use tokio::sync::RwLock;

use qproof::ProofVerifier;

use crate::config::AppConfig;
use crate::source::ProofSource;
use crate::types::WatchSnapshot;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub cfg: AppConfig,
    pub verifier: Arc<ProofVerifier>,
    pub source: Arc<dyn ProofSource>,
    /// Swapped wholesale by the watch loop; readers clone the Arc
    pub watch: RwLock<Arc<WatchSnapshot>>,
}

impl AppState {
    pub fn new(cfg: AppConfig, verifier: ProofVerifier, source: Arc<dyn ProofSource>) -> Self {
        Self {
            cfg,
            verifier: Arc::new(verifier),
            source,
            watch: RwLock::new(Arc::new(WatchSnapshot::default())),
        }
    }

    pub async fn watch_snapshot(&self) -> Arc<WatchSnapshot> {
        self.watch.read().await.clone()
    }

    pub async fn publish_watch(&self, snapshot: WatchSnapshot) {
        *self.watch.write().await = Arc::new(snapshot);
    }
}

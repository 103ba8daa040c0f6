use std::sync::Arc;

use tokio::sync::RwLock;
use triage_core::{Config, Manager, Office};
use triage_orchestrator::BatchOrchestrator;
use triage_progress::{ProgressBus, ProgressStore};

/// Shared server state handed to every handler via `axum::State`.
///
/// The manager/office roster is loaded once at startup from JSON fixtures
/// under `config.data_dir` — populating it from an upload is the ingest
/// collaborator's job, out of scope here — and held behind an `RwLock` so a
/// future reload endpoint could refresh it without a restart.
pub struct AppState {
    pub store: Arc<dyn triage_store::TicketStore>,
    pub orchestrator: Arc<BatchOrchestrator>,
    pub progress_bus: Arc<ProgressBus>,
    pub progress_store: Arc<ProgressStore>,
    pub managers: RwLock<Vec<Manager>>,
    pub offices: RwLock<Vec<Office>>,
    pub config: Config,
}

impl AppState {
    pub async fn roster_snapshot(&self) -> (Vec<Manager>, Vec<Office>) {
        (self.managers.read().await.clone(), self.offices.read().await.clone())
    }
}

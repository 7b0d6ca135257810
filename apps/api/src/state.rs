use std::sync::Arc;

use crate::assets::AssetUploader;
use crate::config::Config;
use crate::screening::session::ScreeningOrchestrator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Used directly by the upload relay; the orchestrator holds its own handle.
    pub uploader: Arc<dyn AssetUploader>,
    /// The single screening session and its history.
    pub orchestrator: Arc<ScreeningOrchestrator>,
}

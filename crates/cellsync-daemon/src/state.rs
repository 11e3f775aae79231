use std::sync::Arc;

use cellsync_runtime::Runtime;

/// Cloneable (`Arc`) handle shared across every Axum handler.
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<Runtime>,
}

impl AppState {
    pub fn new(runtime: Arc<Runtime>) -> Self {
        Self { runtime }
    }
}

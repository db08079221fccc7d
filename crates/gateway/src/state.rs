use std::sync::Arc;

use crate::runtime::ChatEngine;

/// Shared application state passed to all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ChatEngine>,
}

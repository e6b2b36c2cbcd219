use std::sync::Arc;

use crate::config::Config;
use crate::preview::session::PreviewRegistry;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Open preview sessions, each owning a pagination worker and a mount slot.
    pub previews: Arc<PreviewRegistry>,
}

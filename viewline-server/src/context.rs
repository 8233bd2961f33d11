use std::sync::Arc;

use axum::extract::FromRef;
use viewline_core::Coordinator;

#[derive(Clone, FromRef)]
pub struct ServerContext {
    pub coordinator: Arc<Coordinator>,
}

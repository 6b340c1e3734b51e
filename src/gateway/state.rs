use std::sync::Arc;

use crate::service::MomentService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<MomentService>,

    /// Request body cap for uploads.
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(service: Arc<MomentService>, max_upload_bytes: usize) -> Self {
        Self {
            service,
            max_upload_bytes,
        }
    }
}

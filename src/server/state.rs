use std::path::PathBuf;
use std::sync::Arc;

use crate::pipeline::Pipeline;

/// Shared by every request. The pipeline is used read-only.
#[derive(Clone)]
pub struct ServerState {
    pub pipeline: Arc<Pipeline>,
    pub uploads_dir: PathBuf,
    pub results_dir: PathBuf,
}

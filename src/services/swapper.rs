use crate::models::{ProcessOutcome, SwapJob, SwapOutput};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SwapError {
    #[error("No face detected in source image")]
    NoSourceFace,

    #[error("No faces detected in target image")]
    NoTargetFace,

    #[error(
        "FaceFusion process timed out after {} seconds. This might happen during the first run when models need to be downloaded.",
        .timeout.as_secs()
    )]
    TimedOut {
        timeout: Duration,
        outcome: ProcessOutcome,
    },

    #[error("FaceFusion process failed: {}", .0.stderr)]
    ProcessFailed(ProcessOutcome),

    #[error("FaceFusion did not generate an output file")]
    MissingOutput,

    #[error("Error running FaceFusion: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("{0}")]
    Engine(#[from] anyhow::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One way of performing a face swap. The route layer only talks to this.
#[async_trait::async_trait]
pub trait FaceSwapper: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    /// Swaps the face in `job.source` onto `job.target`, writing `job.output`.
    async fn swap(&self, job: &SwapJob) -> Result<SwapOutput, SwapError>;
}

use crate::config::SwapConfig;
use crate::models::{SwapJob, SwapSettings};
use crate::services::cli_swapper::CliSwapper;
use crate::services::process::ProcessRunner;
use crate::services::swapper::{FaceSwapper, SwapError};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Inputs for one manual FaceFusion run.
#[derive(Debug, Clone)]
pub struct DriverArgs {
    pub source: PathBuf,
    pub target: PathBuf,
    pub output: PathBuf,
    pub model: String,
    pub timeout: Duration,
    pub command: Vec<String>,
    pub workdir: Option<PathBuf>,
}

/// Runs FaceFusion once and returns the process exit code to use:
/// 0 when the output file was written, the child's code when it exited
/// non-zero, and 1 for everything else.
pub async fn run_driver(args: &DriverArgs, runner: Arc<dyn ProcessRunner>) -> i32 {
    if !args.source.exists() {
        error!("Error: Source file {} does not exist", args.source.display());
        return 1;
    }
    if !args.target.exists() {
        error!("Error: Target file {} does not exist", args.target.display());
        return 1;
    }

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = tokio::fs::create_dir_all(parent).await {
            error!(
                "Error: Could not create output directory {}: {}",
                parent.display(),
                e
            );
            return 1;
        }
    }

    let swapper = CliSwapper::new(
        runner,
        args.command.clone(),
        args.workdir.clone(),
        args.timeout,
    );

    let mut settings = SwapSettings::defaults(&SwapConfig::default());
    settings.face_swapper_model = args.model.clone();
    let job = SwapJob {
        source: args.source.clone(),
        target: args.target.clone(),
        output: args.output.clone(),
        settings,
    };

    match swapper.swap(&job).await {
        Ok(_) => {
            info!("Success! Output saved to {}", args.output.display());
            0
        }
        Err(SwapError::ProcessFailed(outcome)) => {
            error!("STDOUT: {}", outcome.stdout);
            error!("STDERR: {}", outcome.stderr);
            error!(
                "Error: FaceFusion process failed with return code {}",
                outcome.return_code
            );
            outcome.return_code
        }
        Err(SwapError::TimedOut { timeout, .. }) => {
            error!(
                "Error: FaceFusion process timed out after {} seconds",
                timeout.as_secs()
            );
            1
        }
        Err(SwapError::MissingOutput) => {
            error!(
                "Error: Output file {} was not created",
                args.output.display()
            );
            1
        }
        Err(e) => {
            error!("Error: {}", e);
            1
        }
    }
}

use clap::Parser;
use dotenvy::dotenv;
use face_swap_api::config::{SwapConfig, split_command};
use face_swap_api::services::driver::{DriverArgs, run_driver};
use face_swap_api::services::process::TokioProcessRunner;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Runs one FaceFusion swap from the command line, outside the HTTP server.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Image holding the face to use
    #[arg(long)]
    source: PathBuf,

    /// Image whose faces get replaced
    #[arg(long)]
    target: PathBuf,

    /// Where to write the result
    #[arg(long)]
    output: PathBuf,

    #[arg(long, default_value = "inswapper_128")]
    model: String,

    /// Seconds before the FaceFusion process is killed
    #[arg(long, default_value_t = 300)]
    timeout: u64,

    /// FaceFusion launch command, overrides FACEFUSION_COMMAND
    #[arg(long)]
    command: Option<String>,

    /// FaceFusion working directory, overrides FACEFUSION_DIR
    #[arg(long)]
    workdir: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "swap_test=info,face_swap_api=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🧪 Starting FaceFusion test run...");

    let config = SwapConfig::from_env();
    let driver_args = DriverArgs {
        source: args.source,
        target: args.target,
        output: args.output,
        model: args.model,
        timeout: Duration::from_secs(args.timeout),
        command: args
            .command
            .as_deref()
            .map(split_command)
            .unwrap_or(config.facefusion_command),
        workdir: Some(args.workdir.unwrap_or(config.facefusion_dir)),
    };

    let code = run_driver(&driver_args, Arc::new(TokioProcessRunner)).await;
    std::process::exit(code);
}

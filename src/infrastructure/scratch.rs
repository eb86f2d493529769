use crate::config::SwapConfig;
use crate::services::staging::ScratchDir;
use tracing::info;

pub async fn setup_scratch(config: &SwapConfig) -> anyhow::Result<ScratchDir> {
    let scratch = ScratchDir::new(&config.upload_dir);
    scratch.ensure().await?;
    info!("📂 Scratch directory: {}", scratch.root().display());
    Ok(scratch)
}

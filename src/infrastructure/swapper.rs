use crate::config::{SwapBackend, SwapConfig};
use crate::services::cli_swapper::CliSwapper;
use crate::services::process::TokioProcessRunner;
use crate::services::swapper::FaceSwapper;
use std::sync::Arc;
use tracing::info;

/// Builds the swapper selected by `config.backend`. The library backend
/// loads its models here so a broken install fails at startup.
pub async fn setup_swapper(config: &SwapConfig) -> anyhow::Result<Arc<dyn FaceSwapper>> {
    match config.backend {
        SwapBackend::Process => {
            info!(
                "🔧 Process backend: `{}` in {} (timeout {}s)",
                config.facefusion_command.join(" "),
                config.facefusion_dir.display(),
                config.process_timeout.as_secs()
            );
            Ok(Arc::new(CliSwapper::new(
                Arc::new(TokioProcessRunner),
                config.facefusion_command.clone(),
                Some(config.facefusion_dir.clone()),
                config.process_timeout,
            )))
        }
        SwapBackend::Library => setup_library_swapper(config).await,
    }
}

#[cfg(feature = "python-engine")]
async fn setup_library_swapper(config: &SwapConfig) -> anyhow::Result<Arc<dyn FaceSwapper>> {
    use crate::models::SwapSettings;
    use crate::services::library_swapper::LibrarySwapper;
    use crate::services::python_engine::PythonFaceEngine;

    info!(
        "🐍 Library backend: loading FaceFusion from {}",
        config.facefusion_dir.display()
    );

    let dir = config.facefusion_dir.clone();
    let settings = SwapSettings::defaults(config);
    let swapper = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        let swapper = LibrarySwapper::new(PythonFaceEngine::new(&dir)?);
        swapper.pre_check(&settings)?;
        Ok(swapper)
    })
    .await??;

    info!("✅ Face swapper models ready");
    Ok(Arc::new(swapper))
}

#[cfg(not(feature = "python-engine"))]
async fn setup_library_swapper(_config: &SwapConfig) -> anyhow::Result<Arc<dyn FaceSwapper>> {
    anyhow::bail!(
        "The library backend is not compiled in. Rebuild with `--features python-engine` or set SWAP_BACKEND=process"
    )
}

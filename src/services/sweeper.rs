use crate::services::staging::ScratchDir;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tokio::time::sleep;

/// Periodically removes scratch files that per-request cleanup missed.
pub struct ScratchSweeper {
    scratch: ScratchDir,
    max_age: Duration,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl ScratchSweeper {
    pub fn new(
        scratch: ScratchDir,
        max_age: Duration,
        interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            scratch,
            max_age,
            interval,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(
            "🧹 Scratch sweeper started (max age {:?}, every {:?})",
            self.max_age,
            self.interval
        );

        loop {
            self.sweep().await;

            tokio::select! {
                _ = self.shutdown.changed() => {
                    tracing::info!("🛑 Scratch sweeper shutting down");
                    break;
                }
                _ = sleep(self.interval) => {}
            }
        }
    }

    async fn sweep(&self) {
        match sweep_scratch(self.scratch.root(), self.max_age).await {
            Ok(0) => tracing::debug!("Scratch sweep found nothing to remove"),
            Ok(n) => tracing::info!("Scratch sweep removed {} stale file(s)", n),
            Err(e) => tracing::error!(
                "Scratch sweep of {} failed: {}",
                self.scratch.root().display(),
                e
            ),
        }
    }
}

/// Deletes regular files in `dir` last modified at least `max_age` ago.
/// Returns how many were removed. Individual failures are logged and skipped.
pub async fn sweep_scratch(dir: &Path, max_age: Duration) -> std::io::Result<usize> {
    let now = SystemTime::now();
    let mut removed = 0;
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let meta = match entry.metadata().await {
            Ok(meta) if meta.is_file() => meta,
            _ => continue,
        };
        let age = meta
            .modified()
            .ok()
            .and_then(|m| now.duration_since(m).ok())
            .unwrap_or_default();
        if age < max_age {
            continue;
        }

        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!("Could not sweep {}: {}", entry.path().display(), e),
        }
    }

    Ok(removed)
}

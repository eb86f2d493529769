use crate::models::{SwapJob, SwapOutput};
use crate::services::process::{ProcessRunner, ProcessSpec};
use crate::services::swapper::{FaceSwapper, SwapError};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Runs the FaceFusion CLI (`headless-run`) once per swap.
pub struct CliSwapper {
    runner: Arc<dyn ProcessRunner>,
    /// Program followed by its leading arguments, e.g. `python3 facefusion.py`
    command: Vec<String>,
    workdir: Option<PathBuf>,
    timeout: Duration,
}

impl CliSwapper {
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        command: Vec<String>,
        workdir: Option<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            runner,
            command,
            workdir,
            timeout,
        }
    }

    /// The full command line for a job.
    pub fn build_spec(&self, job: &SwapJob) -> ProcessSpec {
        let mut parts = self.command.iter().cloned();
        let program = parts.next().unwrap_or_else(|| "facefusion".to_string());

        let mut args: Vec<String> = parts.collect();
        args.push("headless-run".to_string());
        args.push("--source".to_string());
        args.push(job.source.to_string_lossy().into_owned());
        args.push("--target".to_string());
        args.push(job.target.to_string_lossy().into_owned());
        args.push("--output-path".to_string());
        args.push(job.output.to_string_lossy().into_owned());
        args.push("--face-swapper-model".to_string());
        args.push(job.settings.face_swapper_model.clone());
        if job.settings.selector_mode_requested {
            args.push("--face-selector-mode".to_string());
            args.push(job.settings.face_selector_mode.clone());
        }

        ProcessSpec {
            program,
            args,
            cwd: self.workdir.clone(),
            timeout: self.timeout,
        }
    }
}

#[async_trait::async_trait]
impl FaceSwapper for CliSwapper {
    fn name(&self) -> &'static str {
        "process"
    }

    async fn swap(&self, job: &SwapJob) -> Result<SwapOutput, SwapError> {
        let spec = self.build_spec(job);
        tracing::info!("Running command: {}", spec.display());

        let outcome = self.runner.run(&spec).await.map_err(SwapError::Spawn)?;

        if outcome.timed_out {
            tracing::error!(
                "Process timed out after {} seconds.\nPartial output:\nSTDOUT: {}\nSTDERR: {}",
                self.timeout.as_secs(),
                outcome.stdout,
                outcome.stderr
            );
            return Err(SwapError::TimedOut {
                timeout: self.timeout,
                outcome,
            });
        }

        tracing::info!(
            "Command output:\nSTDOUT: {}\nSTDERR: {}",
            outcome.stdout,
            outcome.stderr
        );

        if !outcome.success() {
            tracing::error!(
                "FaceFusion exited with code {}: {}",
                outcome.return_code,
                outcome.stderr.trim()
            );
            return Err(SwapError::ProcessFailed(outcome));
        }

        // FaceFusion can exit 0 without writing anything.
        if !tokio::fs::try_exists(&job.output).await.unwrap_or(false) {
            return Err(SwapError::MissingOutput);
        }

        Ok(SwapOutput {
            faces_detected: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SwapConfig;
    use crate::models::{ProcessOutcome, SwapOptions, SwapSettings};
    use std::sync::Mutex;

    /// Records the spec it was given and returns a canned outcome,
    /// optionally creating the output file first.
    struct ScriptedRunner {
        outcome: ProcessOutcome,
        write_output: bool,
        seen: Mutex<Vec<ProcessSpec>>,
    }

    impl ScriptedRunner {
        fn new(outcome: ProcessOutcome, write_output: bool) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                write_output,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl ProcessRunner for ScriptedRunner {
        async fn run(&self, spec: &ProcessSpec) -> std::io::Result<ProcessOutcome> {
            self.seen.lock().unwrap().push(spec.clone());
            if self.write_output {
                let idx = spec.args.iter().position(|a| a == "--output-path").unwrap();
                tokio::fs::write(&spec.args[idx + 1], b"result").await?;
            }
            Ok(self.outcome.clone())
        }
    }

    fn job(dir: &std::path::Path, options: Option<SwapOptions>) -> SwapJob {
        SwapJob {
            source: dir.join("src.jpg"),
            target: dir.join("tgt.jpg"),
            output: dir.join("out.jpg"),
            settings: SwapSettings::resolve(&SwapConfig::default(), options.as_ref()),
        }
    }

    fn swapper(runner: Arc<dyn ProcessRunner>) -> CliSwapper {
        CliSwapper::new(
            runner,
            vec!["python3".to_string(), "facefusion.py".to_string()],
            Some(PathBuf::from("/opt/facefusion")),
            Duration::from_secs(300),
        )
    }

    #[test]
    fn test_build_spec_default_flags() {
        let runner = ScriptedRunner::new(ProcessOutcome::default(), false);
        let swapper = swapper(runner);
        let job = job(std::path::Path::new("/tmp/x"), None);
        let spec = swapper.build_spec(&job);

        assert_eq!(spec.program, "python3");
        assert_eq!(
            spec.args,
            vec![
                "facefusion.py",
                "headless-run",
                "--source",
                "/tmp/x/src.jpg",
                "--target",
                "/tmp/x/tgt.jpg",
                "--output-path",
                "/tmp/x/out.jpg",
                "--face-swapper-model",
                "inswapper_128",
            ]
        );
        assert_eq!(spec.cwd, Some(PathBuf::from("/opt/facefusion")));
        assert_eq!(spec.timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_build_spec_with_options() {
        let runner = ScriptedRunner::new(ProcessOutcome::default(), false);
        let swapper = swapper(runner);
        let job = job(
            std::path::Path::new("/tmp/x"),
            Some(SwapOptions {
                face_swapper_model: Some("simswap_256".to_string()),
                face_selector_mode: Some("many".to_string()),
            }),
        );
        let args = swapper.build_spec(&job).args;
        assert!(args.windows(2).any(|w| w == ["--face-swapper-model", "simswap_256"]));
        assert!(args.windows(2).any(|w| w == ["--face-selector-mode", "many"]));
    }

    #[tokio::test]
    async fn test_success_requires_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::new(ProcessOutcome::default(), true);
        let swapper = swapper(runner.clone());

        let output = swapper.swap(&job(dir.path(), None)).await.unwrap();
        assert_eq!(output.faces_detected, None);
        assert_eq!(runner.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_exit_zero_without_output_is_missing_output() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::new(ProcessOutcome::default(), false);
        let result = swapper(runner).swap(&job(dir.path(), None)).await;
        assert!(matches!(result, Err(SwapError::MissingOutput)));
    }

    #[tokio::test]
    async fn test_non_zero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = ProcessOutcome {
            return_code: 1,
            stdout: "loading".to_string(),
            stderr: "boom".to_string(),
            timed_out: false,
        };
        let runner = ScriptedRunner::new(outcome, true);
        match swapper(runner).swap(&job(dir.path(), None)).await {
            Err(SwapError::ProcessFailed(o)) => {
                assert_eq!(o.return_code, 1);
                assert_eq!(o.stderr, "boom");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = ProcessOutcome {
            return_code: -1,
            timed_out: true,
            ..Default::default()
        };
        let runner = ScriptedRunner::new(outcome, false);
        let result = swapper(runner).swap(&job(dir.path(), None)).await;
        assert!(matches!(result, Err(SwapError::TimedOut { .. })));
    }
}

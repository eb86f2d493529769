use crate::models::{SwapJob, SwapOutput, SwapSettings};
use crate::services::swapper::{FaceSwapper, SwapError};
use anyhow::{Result, anyhow};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// In-process face analysis and swapping. Implementations are blocking and
/// are only ever called from the blocking thread pool.
pub trait FaceEngine: Send + Sync + 'static {
    /// A decoded image
    type Frame: Send;
    /// A detected face, including whatever embedding the engine keeps
    type Face: Send;

    /// Makes sure models are present. Called once at startup.
    fn pre_check(&self, settings: &SwapSettings) -> Result<()>;

    fn read_image(&self, path: &Path) -> Result<Self::Frame>;

    fn detect_faces(&self, frame: &Self::Frame) -> Result<Vec<Self::Face>>;

    /// Bounding-box area, used to pick the largest face.
    fn face_area(&self, face: &Self::Face) -> Result<f32>;

    /// Combines one face per source image into a single source face.
    fn average_faces(&self, faces: Vec<Self::Face>) -> Result<Self::Face>;

    /// Swaps `source` into `target`. Which target faces are touched is up to
    /// the engine, driven by `settings.face_selector_mode`.
    fn swap_frame(
        &self,
        settings: &SwapSettings,
        source: &Self::Face,
        target: &Self::Frame,
    ) -> Result<Self::Frame>;

    fn write_image(&self, path: &Path, frame: &Self::Frame) -> Result<()>;
}

/// Face swapping through a [`FaceEngine`] in this process.
pub struct LibrarySwapper<E: FaceEngine> {
    engine: Arc<E>,
    /// Held for a whole job so engines that keep global settings never see
    /// another request's settings mid-swap.
    lock: Arc<Mutex<()>>,
}

impl<E: FaceEngine> LibrarySwapper<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine: Arc::new(engine),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn pre_check(&self, settings: &SwapSettings) -> Result<()> {
        self.engine.pre_check(settings)
    }
}

/// Largest face first; ties keep detection order.
fn largest_face<E: FaceEngine>(engine: &E, faces: Vec<E::Face>) -> Result<Option<E::Face>> {
    let mut sized = faces
        .into_iter()
        .map(|face| engine.face_area(&face).map(|area| (area, face)))
        .collect::<Result<Vec<_>>>()?;
    sized.sort_by(|a, b| b.0.total_cmp(&a.0));
    Ok(sized.into_iter().next().map(|(_, face)| face))
}

fn run_job<E: FaceEngine>(engine: &E, job: &SwapJob) -> Result<SwapOutput, SwapError> {
    let source_frame = engine.read_image(&job.source)?;
    let source_faces = engine.detect_faces(&source_frame)?;
    let Some(largest) = largest_face(engine, source_faces)? else {
        return Err(SwapError::NoSourceFace);
    };
    let source_face = engine.average_faces(vec![largest])?;

    let target_frame = engine.read_image(&job.target)?;
    let faces_detected = engine.detect_faces(&target_frame)?.len();
    if faces_detected == 0 {
        return Err(SwapError::NoTargetFace);
    }

    tracing::debug!(
        "Swapping onto {} target face(s) with model {} ({} mode)",
        faces_detected,
        job.settings.face_swapper_model,
        job.settings.face_selector_mode
    );
    let output_frame = engine.swap_frame(&job.settings, &source_face, &target_frame)?;
    engine.write_image(&job.output, &output_frame)?;

    Ok(SwapOutput {
        faces_detected: Some(faces_detected),
    })
}

#[async_trait::async_trait]
impl<E: FaceEngine> FaceSwapper for LibrarySwapper<E> {
    fn name(&self) -> &'static str {
        "library"
    }

    async fn swap(&self, job: &SwapJob) -> Result<SwapOutput, SwapError> {
        let engine = self.engine.clone();
        let lock = self.lock.clone();
        let job = job.clone();

        tokio::task::spawn_blocking(move || {
            let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
            run_job(engine.as_ref(), &job)
        })
        .await
        .map_err(|e| SwapError::Engine(anyhow!("Face swap task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SwapConfig;
    use std::collections::HashMap;
    use std::path::PathBuf;

    /// Faces are plain areas; frames are looked up by path.
    struct TableEngine {
        faces: HashMap<PathBuf, Vec<f32>>,
        swapped_with: Mutex<Vec<f32>>,
    }

    impl FaceEngine for TableEngine {
        type Frame = Vec<f32>;
        type Face = f32;

        fn pre_check(&self, _settings: &SwapSettings) -> Result<()> {
            Ok(())
        }

        fn read_image(&self, path: &Path) -> Result<Vec<f32>> {
            self.faces
                .get(path)
                .cloned()
                .ok_or_else(|| anyhow!("cannot read {}", path.display()))
        }

        fn detect_faces(&self, frame: &Vec<f32>) -> Result<Vec<f32>> {
            Ok(frame.clone())
        }

        fn face_area(&self, face: &f32) -> Result<f32> {
            Ok(*face)
        }

        fn average_faces(&self, faces: Vec<f32>) -> Result<f32> {
            Ok(faces.iter().sum::<f32>() / faces.len() as f32)
        }

        fn swap_frame(&self, _s: &SwapSettings, source: &f32, target: &Vec<f32>) -> Result<Vec<f32>> {
            self.swapped_with.lock().unwrap().push(*source);
            Ok(target.clone())
        }

        fn write_image(&self, path: &Path, _frame: &Vec<f32>) -> Result<()> {
            std::fs::write(path, b"frame")?;
            Ok(())
        }
    }

    fn setup(source: Vec<f32>, target: Vec<f32>) -> (tempfile::TempDir, SwapJob, TableEngine) {
        let dir = tempfile::tempdir().unwrap();
        let job = SwapJob {
            source: dir.path().join("src.jpg"),
            target: dir.path().join("tgt.jpg"),
            output: dir.path().join("out.jpg"),
            settings: SwapSettings::defaults(&SwapConfig::default()),
        };
        let engine = TableEngine {
            faces: HashMap::from([(job.source.clone(), source), (job.target.clone(), target)]),
            swapped_with: Mutex::new(Vec::new()),
        };
        (dir, job, engine)
    }

    #[test]
    fn test_largest_face_wins() {
        let (_dir, job, engine) = setup(vec![2.0, 9.0, 4.0], vec![1.0, 1.0]);
        let output = run_job(&engine, &job).unwrap();
        assert_eq!(output.faces_detected, Some(2));
        assert_eq!(*engine.swapped_with.lock().unwrap(), vec![9.0]);
        assert!(job.output.exists());
    }

    #[test]
    fn test_no_source_face() {
        let (_dir, job, engine) = setup(vec![], vec![1.0]);
        assert!(matches!(run_job(&engine, &job), Err(SwapError::NoSourceFace)));
        assert!(engine.swapped_with.lock().unwrap().is_empty());
    }

    #[test]
    fn test_no_target_face() {
        let (_dir, job, engine) = setup(vec![3.0], vec![]);
        assert!(matches!(run_job(&engine, &job), Err(SwapError::NoTargetFace)));
        assert!(!job.output.exists());
    }

    #[test]
    fn test_engine_error_surfaces() {
        let (_dir, mut job, engine) = setup(vec![3.0], vec![1.0]);
        job.target = PathBuf::from("/does/not/exist.jpg");
        match run_job(&engine, &job) {
            Err(SwapError::Engine(e)) => assert!(e.to_string().contains("cannot read")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_swap_runs_on_blocking_pool() {
        let (_dir, job, engine) = setup(vec![5.0], vec![1.0, 2.0, 3.0]);
        let swapper = LibrarySwapper::new(engine);
        let output = swapper.swap(&job).await.unwrap();
        assert_eq!(output.faces_detected, Some(3));
        assert_eq!(swapper.name(), "library");
    }
}

//! [`FaceEngine`] backed by FaceFusion's Python modules, embedded with pyo3.
//!
//! FaceFusion keeps its configuration in `facefusion.state_manager`, a
//! process-wide store. Every swap writes the job's settings into it right
//! before `process_frame`; `LibrarySwapper` holds its lock across the whole
//! job so two requests never interleave on that store.

use crate::models::SwapSettings;
use crate::services::library_swapper::FaceEngine;
use anyhow::{Context, Result, anyhow};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};
use std::path::Path;

const STATE_MANAGER: &str = "facefusion.state_manager";
const FACE_ANALYSER: &str = "facefusion.face_analyser";
const VISION: &str = "facefusion.vision";
const FACE_SWAPPER: &str = "facefusion.processors.modules.face_swapper";

pub struct PythonFaceEngine;

impl PythonFaceEngine {
    /// Puts `facefusion_dir` on `sys.path` and checks the modules import.
    pub fn new(facefusion_dir: &Path) -> Result<Self> {
        let root = facefusion_dir
            .canonicalize()
            .with_context(|| format!("FaceFusion dir {} not found", facefusion_dir.display()))?
            .to_string_lossy()
            .into_owned();

        Python::with_gil(|py| -> PyResult<()> {
            // onnxruntime and OpenMP fight over threads otherwise
            let os = py.import_bound("os")?;
            os.getattr("environ")?.set_item("OMP_NUM_THREADS", "1")?;

            let sys = py.import_bound("sys")?;
            sys.getattr("path")?.call_method1("insert", (0, root))?;

            for module in [STATE_MANAGER, FACE_ANALYSER, VISION, FACE_SWAPPER] {
                py.import_bound(module)?;
            }
            Ok(())
        })
        .context("Failed to import FaceFusion modules")?;

        tracing::info!("🐍 FaceFusion Python modules loaded");
        Ok(Self)
    }
}

fn apply_settings(py: Python<'_>, settings: &SwapSettings, method: &str) -> PyResult<()> {
    let state = py.import_bound(STATE_MANAGER)?;
    state.call_method1(method, ("face_swapper_model", settings.face_swapper_model.as_str()))?;
    state.call_method1(method, ("face_selector_mode", settings.face_selector_mode.as_str()))?;
    state.call_method1(method, ("face_mask_types", settings.face_mask_types.clone()))?;
    state.call_method1(method, ("face_mask_blur", settings.face_mask_blur))?;
    state.call_method1(method, ("face_mask_padding", settings.face_mask_padding))?;
    state.call_method1(
        method,
        (
            "face_swapper_pixel_boost",
            settings.face_swapper_pixel_boost.as_str(),
        ),
    )?;
    state.call_method1(method, ("face_mask_regions", settings.face_mask_regions.clone()))?;
    state.call_method1(
        method,
        ("reference_face_distance", settings.reference_face_distance),
    )?;
    state.call_method1(
        method,
        (
            "output_image_resolution",
            settings.output_image_resolution.as_str(),
        ),
    )?;
    Ok(())
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl FaceEngine for PythonFaceEngine {
    type Frame = PyObject;
    type Face = PyObject;

    fn pre_check(&self, settings: &SwapSettings) -> Result<()> {
        let ready = Python::with_gil(|py| -> PyResult<bool> {
            apply_settings(py, settings, "init_item")?;
            py.import_bound(FACE_SWAPPER)?
                .call_method0("pre_check")?
                .extract::<bool>()
        })?;

        if !ready {
            return Err(anyhow!(
                "Face swapper models not available. Please run FaceFusion normally first to download models."
            ));
        }
        Ok(())
    }

    fn read_image(&self, path: &Path) -> Result<PyObject> {
        Python::with_gil(|py| -> Result<PyObject> {
            let frame = py
                .import_bound(VISION)?
                .call_method1("read_static_image", (path_arg(path),))?;
            if frame.is_none() {
                return Err(anyhow!("Could not read image {}", path.display()));
            }
            Ok(frame.unbind())
        })
    }

    fn detect_faces(&self, frame: &PyObject) -> Result<Vec<PyObject>> {
        Python::with_gil(|py| -> Result<Vec<PyObject>> {
            let frames = PyList::new_bound(py, [frame.clone_ref(py)]);
            let faces = py
                .import_bound(FACE_ANALYSER)?
                .call_method1("get_many_faces", (frames,))?;
            Ok(faces.extract::<Vec<PyObject>>()?)
        })
    }

    fn face_area(&self, face: &PyObject) -> Result<f32> {
        Python::with_gil(|py| -> Result<f32> {
            let bbox = face
                .bind(py)
                .getattr("bounding_box")?
                .call_method0("tolist")?
                .extract::<Vec<f32>>()?;
            match bbox.as_slice() {
                [x1, y1, x2, y2] => Ok((x2 - x1).max(0.0) * (y2 - y1).max(0.0)),
                _ => Err(anyhow!("Unexpected bounding box shape: {:?}", bbox)),
            }
        })
    }

    fn average_faces(&self, faces: Vec<PyObject>) -> Result<PyObject> {
        Python::with_gil(|py| -> Result<PyObject> {
            let faces = PyList::new_bound(py, faces);
            let average = py
                .import_bound(FACE_ANALYSER)?
                .call_method1("get_average_face", (faces,))?;
            if average.is_none() {
                return Err(anyhow!("Could not average source faces"));
            }
            Ok(average.unbind())
        })
    }

    fn swap_frame(
        &self,
        settings: &SwapSettings,
        source: &PyObject,
        target: &PyObject,
    ) -> Result<PyObject> {
        Python::with_gil(|py| -> Result<PyObject> {
            apply_settings(py, settings, "set_item")?;

            let inputs = PyDict::new_bound(py);
            inputs.set_item("reference_faces", py.None())?;
            inputs.set_item("source_face", source.clone_ref(py))?;
            inputs.set_item("target_vision_frame", target.clone_ref(py))?;

            let frame = py
                .import_bound(FACE_SWAPPER)?
                .call_method1("process_frame", (inputs,))?;
            Ok(frame.unbind())
        })
    }

    fn write_image(&self, path: &Path, frame: &PyObject) -> Result<()> {
        let written = Python::with_gil(|py| -> PyResult<bool> {
            py.import_bound(VISION)?
                .call_method1("write_image", (path_arg(path), frame.clone_ref(py)))?
                .extract::<bool>()
        })?;

        if !written {
            return Err(anyhow!("Failed to write result image {}", path.display()));
        }
        Ok(())
    }
}

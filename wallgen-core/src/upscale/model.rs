//! FSRCNN network held in an ONNX Runtime session.
//!
//! The model takes one luma plane `[1, 1, H, W]` in `[0, 1]` and returns
//! `[1, 1, H*s, W*s]`. A file exported with several deconvolution heads names
//! its outputs `x2`, `x3`, `x4`; a single-head export such as
//! `FSRCNN-small_x4.onnx` carries its scale in the file name instead.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use regex::Regex;

use super::SUPPORTED_SCALES;
use crate::error::{Result, WallgenError};

fn scale_suffix() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)(?:^|_)x(\d+)$").expect("scale pattern is valid"))
}

fn parse_scale(name: &str) -> Option<u32> {
    scale_suffix()
        .captures(name)
        .and_then(|caps| caps[1].parse().ok())
}

/// Maps each trained scale to the graph output that produces it.
pub(crate) fn heads_from_outputs(
    outputs: &[String],
    path: &Path,
) -> std::result::Result<BTreeMap<u32, String>, String> {
    let mut heads: BTreeMap<u32, String> = outputs
        .iter()
        .filter_map(|name| parse_scale(name).map(|scale| (scale, name.clone())))
        .collect();

    if heads.is_empty() {
        let [output] = outputs else {
            return Err(format!(
                "expected one output or outputs named x<scale>, found {:?}",
                outputs
            ));
        };
        let scale = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(parse_scale)
            .ok_or_else(|| "single-output model must be named <name>_x<scale>".to_string())?;
        heads.insert(scale, output.clone());
    }

    heads.retain(|scale, _| SUPPORTED_SCALES.contains(scale));
    if heads.is_empty() {
        return Err(format!("model has no head for scales {:?}", SUPPORTED_SCALES));
    }
    Ok(heads)
}

pub struct FsrcnnModel {
    session: Mutex<Session>,
    heads: BTreeMap<u32, String>,
}

impl fmt::Debug for FsrcnnModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FsrcnnModel").field("heads", &self.heads).finish()
    }
}

impl FsrcnnModel {
    pub fn load(path: &Path) -> Result<Self> {
        let model_error = |reason: String| WallgenError::ModelLoad {
            path: path.to_path_buf(),
            reason,
        };

        if !path.is_file() {
            return Err(model_error("file not found".to_string()));
        }

        let build = || -> ort::Result<Session> {
            Session::builder()?
                .with_optimization_level(GraphOptimizationLevel::Level3)?
                .with_intra_threads(1)?
                .commit_from_file(path)
        };
        let session = build().map_err(|e| model_error(e.to_string()))?;

        if session.inputs().len() != 1 {
            return Err(model_error(format!(
                "expected a single luma input, found {}",
                session.inputs().len()
            )));
        }
        let outputs: Vec<String> = session
            .outputs()
            .iter()
            .map(|output| output.name().to_string())
            .collect();
        let heads = heads_from_outputs(&outputs, path).map_err(model_error)?;

        log::info!(
            "Loaded model {} (scales {:?})",
            path.display(),
            heads.keys().collect::<Vec<_>>()
        );
        Ok(Self {
            session: Mutex::new(session),
            heads,
        })
    }

    pub fn scales(&self) -> Vec<u32> {
        self.heads.keys().copied().collect()
    }

    pub fn has_scale(&self, scale: u32) -> bool {
        self.heads.contains_key(&scale)
    }

    /// Runs the network on a row-major luma plane and returns the upscaled plane.
    pub fn infer(&self, luma: Vec<f32>, width: usize, height: usize, scale: u32) -> Result<Vec<f32>> {
        let head = self
            .heads
            .get(&scale)
            .ok_or(WallgenError::UnsupportedScale(scale))?;
        let expected = width * height * (scale as usize).pow(2);

        let input = Tensor::from_array(([1usize, 1, height, width], luma))?;
        let mut session = self
            .session
            .lock()
            .map_err(|_| ort::Error::new("model session poisoned by an earlier panic"))?;
        let outputs = session.run(ort::inputs![input])?;
        let (shape, data) = outputs[head.as_str()].try_extract_tensor::<f32>()?;

        if data.len() != expected {
            return Err(WallgenError::Inference(ort::Error::new(format!(
                "head {} produced shape {:?}, expected {}x{}",
                head,
                shape,
                width * scale as usize,
                height * scale as usize
            ))));
        }
        Ok(data.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn named_heads_map_to_scales() {
        let heads = heads_from_outputs(&names(&["x2", "x3", "x4"]), Path::new("fsrcnn.onnx")).unwrap();
        assert_eq!(heads.keys().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(heads[&3], "x3");
    }

    #[test]
    fn single_output_takes_scale_from_file_name() {
        let path = PathBuf::from("/opt/models/FSRCNN-small_x4.onnx");
        let heads = heads_from_outputs(&names(&["output"]), &path).unwrap();
        assert_eq!(heads.len(), 1);
        assert_eq!(heads[&4], "output");
    }

    #[test]
    fn single_output_without_scale_is_rejected() {
        let err = heads_from_outputs(&names(&["output"]), Path::new("FSRCNN-small.onnx")).unwrap_err();
        assert!(err.contains("_x<scale>"));
    }

    #[test]
    fn untrained_scales_are_dropped() {
        let heads = heads_from_outputs(&names(&["x2", "x8"]), Path::new("m.onnx")).unwrap();
        assert_eq!(heads.keys().copied().collect::<Vec<_>>(), vec![2]);

        assert!(heads_from_outputs(&names(&["x8"]), Path::new("m.onnx")).is_err());
    }

    #[test]
    fn missing_file_is_model_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FsrcnnModel::load(&dir.path().join("FSRCNN-small_x4.onnx")).unwrap_err();
        assert!(matches!(err, WallgenError::ModelLoad { .. }));
    }

    #[test]
    fn corrupt_file_is_model_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("FSRCNN-small_x4.onnx");
        std::fs::write(&path, b"not a protobuf graph").unwrap();

        let err = FsrcnnModel::load(&path).unwrap_err();
        assert!(matches!(err, WallgenError::ModelLoad { path: p, .. } if p == path));
    }
}

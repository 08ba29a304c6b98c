//! Super-resolution model discovery and inference sessions.

use std::path::{Path, PathBuf};

use ndarray::Array4;
use tracing::{debug, info};

use crate::error::{AiError, Result};

/// Backend preference for model inference.
///
/// The in-tree engine runs on the CPU everywhere; accelerator tags are
/// carried so a runtime integration can honor them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelBackend {
    /// CPU inference.
    #[default]
    Cpu,
    /// GPU inference via CUDA.
    Cuda,
    /// Apple Neural Engine via CoreML.
    CoreMl,
}

impl ModelBackend {
    /// Check if this backend is available on the current system.
    #[must_use]
    pub fn is_available(&self) -> bool {
        match self {
            Self::Cpu => true,
            Self::Cuda => false,
            Self::CoreMl => cfg!(target_os = "macos"),
        }
    }

    /// The best available backend.
    #[must_use]
    pub fn best_available() -> Self {
        if Self::CoreMl.is_available() {
            return Self::CoreMl;
        }
        Self::Cpu
    }
}

/// Information derived from a model file.
#[derive(Debug, Clone)]
pub struct ModelInfo {
    /// Model name (file stem).
    pub name: String,
    /// Scale factor baked into the model, when the name declares one.
    pub scale_factor: Option<u32>,
    /// Model file path.
    pub path: PathBuf,
}

/// Locates model files on a set of search paths.
pub struct ModelLoader {
    search_paths: Vec<PathBuf>,
    backend: ModelBackend,
}

impl ModelLoader {
    /// Create a loader with the default search paths.
    #[must_use]
    pub fn new() -> Self {
        let mut search_paths = vec![PathBuf::from("models"), PathBuf::from("./models")];

        if let Ok(home) = std::env::var("HOME") {
            search_paths.push(PathBuf::from(format!("{home}/.upscale/models")));
        }

        #[cfg(target_os = "linux")]
        {
            search_paths.push(PathBuf::from("/usr/share/upscale/models"));
            search_paths.push(PathBuf::from("/usr/local/share/upscale/models"));
        }

        #[cfg(target_os = "macos")]
        {
            search_paths.push(PathBuf::from("/usr/local/share/upscale/models"));
        }

        Self {
            search_paths,
            backend: ModelBackend::best_available(),
        }
    }

    /// Set the inference backend.
    #[must_use]
    pub fn with_backend(mut self, backend: ModelBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Add a search path.
    #[must_use]
    pub fn with_search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    /// Find a model file by name.
    pub fn find_model(&self, name: &str) -> Result<PathBuf> {
        let extensions = ["onnx", "pt", "mlmodel"];

        for base_path in &self.search_paths {
            for ext in &extensions {
                let path = base_path.join(format!("{name}.{ext}"));
                if path.exists() {
                    debug!("found model: {:?}", path);
                    return Ok(path);
                }
            }
        }

        Err(AiError::ModelNotFound(format!(
            "'{}' not in search paths: {:?}",
            name, self.search_paths
        )))
    }

    /// Load model information from a file path.
    pub fn load_info(&self, path: &Path) -> Result<ModelInfo> {
        if !path.exists() {
            return Err(AiError::ModelNotFound(path.display().to_string()));
        }

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();

        // Scale factor is declared in the model name.
        let scale_factor = if name.contains("x2") || name.contains("2x") {
            Some(2)
        } else if name.contains("x4") || name.contains("4x") {
            Some(4)
        } else {
            None
        };

        info!("loaded model info: {}", name);

        Ok(ModelInfo {
            name,
            scale_factor,
            path: path.to_path_buf(),
        })
    }

    /// The configured backend.
    #[must_use]
    pub fn backend(&self) -> ModelBackend {
        self.backend
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// An opened model ready to run on NCHW tensors.
pub struct InferenceSession {
    info: ModelInfo,
    backend: ModelBackend,
}

impl InferenceSession {
    /// Open a session for a model file.
    pub fn new(model_path: &Path, backend: ModelBackend) -> Result<Self> {
        let loader = ModelLoader::new().with_backend(backend);
        let info = loader.load_info(model_path)?;
        info!("inference session for model: {}", info.name);
        Ok(Self { info, backend })
    }

    /// Model information.
    #[must_use]
    pub fn info(&self) -> &ModelInfo {
        &self.info
    }

    /// The backend this session was opened with.
    #[must_use]
    pub fn backend(&self) -> ModelBackend {
        self.backend
    }

    /// Run inference on a `[batch, channel, height, width]` tensor in
    /// the 0..=1 range. The output is scaled by the model's factor.
    pub fn run(&self, input: &Array4<f32>) -> Result<Array4<f32>> {
        let (batch, channels, height, width) = input.dim();
        if batch == 0 || channels == 0 || height == 0 || width == 0 {
            return Err(AiError::Inference("empty input tensor".into()));
        }

        let scale = self.info.scale_factor.unwrap_or(1) as usize;
        let out_height = height * scale;
        let out_width = width * scale;

        // Bilinear interpolation engine.
        let output = Array4::from_shape_fn(
            (batch, channels, out_height, out_width),
            |(b, c, y, x)| {
                let src_y = y as f32 / scale as f32;
                let src_x = x as f32 / scale as f32;

                let y0 = src_y.floor() as usize;
                let x0 = src_x.floor() as usize;
                let y1 = (y0 + 1).min(height - 1);
                let x1 = (x0 + 1).min(width - 1);

                let fy = src_y - y0 as f32;
                let fx = src_x - x0 as f32;

                let v00 = input[[b, c, y0, x0]];
                let v01 = input[[b, c, y0, x1]];
                let v10 = input[[b, c, y1, x0]];
                let v11 = input[[b, c, y1, x1]];

                (1.0 - fy) * ((1.0 - fx) * v00 + fx * v01)
                    + fy * ((1.0 - fx) * v10 + fx * v11)
            },
        );

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn finds_model_on_search_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("realesrgan_x2.onnx"), b"stub").unwrap();

        let loader = ModelLoader::new().with_search_path(dir.path());
        let path = loader.find_model("realesrgan_x2").unwrap();
        assert_eq!(path, dir.path().join("realesrgan_x2.onnx"));
    }

    #[test]
    fn missing_model_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ModelLoader {
            search_paths: vec![dir.path().to_path_buf()],
            backend: ModelBackend::Cpu,
        };
        assert!(matches!(
            loader.find_model("nope"),
            Err(AiError::ModelNotFound(_))
        ));
    }

    #[test]
    fn scale_factor_from_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("espcn_x4.onnx");
        fs::write(&path, b"stub").unwrap();

        let info = ModelLoader::new().load_info(&path).unwrap();
        assert_eq!(info.scale_factor, Some(4));
    }

    #[test]
    fn session_scales_tensor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("realesrgan_x2.onnx");
        fs::write(&path, b"stub").unwrap();

        let session = InferenceSession::new(&path, ModelBackend::Cpu).unwrap();
        let input = Array4::from_elem((1, 3, 4, 4), 0.5_f32);
        let output = session.run(&input).unwrap();
        assert_eq!(output.dim(), (1, 3, 8, 8));
        assert!((output[[0, 0, 3, 3]] - 0.5).abs() < 1e-6);
    }
}

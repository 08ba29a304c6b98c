//! The learned super-resolution frame transform.

use std::path::PathBuf;

use ndarray::Array4;
use tracing::{debug, warn};
use upscale_core::{FrameTransform, PixelFormat, TransformError, VideoFrame};

use crate::error::{AiError, Result};
use crate::model::{InferenceSession, ModelBackend, ModelLoader};

/// Model scale factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleFactor {
    /// 2x upscaling.
    #[default]
    X2,
    /// 4x upscaling.
    X4,
}

impl ScaleFactor {
    /// Numeric scale factor.
    #[must_use]
    pub fn as_u32(self) -> u32 {
        match self {
            Self::X2 => 2,
            Self::X4 => 4,
        }
    }

    /// The smallest model factor that covers a real-valued factor.
    ///
    /// `X4` is the largest model available, so factors above 4.0
    /// under-cover: the model output is then enlarged to the exact
    /// target by the Lanczos resample in [`Upscaler::process`].
    #[must_use]
    pub fn covering(factor: f64) -> Self {
        if factor > 4.0 {
            warn!(factor, "factor exceeds the largest model scale, resampling covers the rest");
        }
        if factor > 2.0 {
            Self::X4
        } else {
            Self::X2
        }
    }
}

/// Available model families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpscaleModel {
    /// Real-ESRGAN, the default for real-world footage.
    #[default]
    RealEsrgan,
    /// Lanczos interpolation, no model file needed.
    Lanczos,
}

impl UpscaleModel {
    /// Model name for file lookup.
    #[must_use]
    pub fn model_name(self, scale: ScaleFactor) -> String {
        let scale_str = match scale {
            ScaleFactor::X2 => "x2",
            ScaleFactor::X4 => "x4",
        };
        match self {
            Self::RealEsrgan => format!("realesrgan_{scale_str}"),
            Self::Lanczos => "lanczos".to_string(),
        }
    }

    /// Whether this model needs a weights file.
    #[must_use]
    pub fn requires_weights(self) -> bool {
        !matches!(self, Self::Lanczos)
    }
}

/// Upscaler configuration.
#[derive(Debug, Clone, Default)]
pub struct UpscalerConfig {
    /// Model scale factor.
    pub scale_factor: ScaleFactor,
    /// Model family to use.
    pub model: UpscaleModel,
    /// Inference backend.
    pub backend: ModelBackend,
    /// Custom model path, bypassing the search paths.
    pub model_path: Option<PathBuf>,
    /// Exact output dimensions. When set, model output is resampled to
    /// this size; when unset, output is input times the scale factor.
    pub target_size: Option<(u32, u32)>,
}

impl UpscalerConfig {
    /// Set the scale factor.
    #[must_use]
    pub fn with_scale_factor(mut self, scale: ScaleFactor) -> Self {
        self.scale_factor = scale;
        self
    }

    /// Set the model family.
    #[must_use]
    pub fn with_model(mut self, model: UpscaleModel) -> Self {
        self.model = model;
        self
    }

    /// Set the inference backend.
    #[must_use]
    pub fn with_backend(mut self, backend: ModelBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Set a custom model path.
    #[must_use]
    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = Some(path.into());
        self
    }

    /// Pin the output to exact dimensions.
    #[must_use]
    pub fn with_target_size(mut self, width: u32, height: u32) -> Self {
        self.target_size = Some((width, height));
        self
    }
}

/// Super-resolution upscaler implementing [`FrameTransform`].
pub struct Upscaler {
    config: UpscalerConfig,
    session: Option<InferenceSession>,
}

impl std::fmt::Debug for Upscaler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Upscaler")
            .field("config", &self.config)
            .field("has_session", &self.session.is_some())
            .finish()
    }
}

impl Upscaler {
    /// Create an upscaler, loading a model when one can be found.
    ///
    /// A missing model is not an error; the upscaler falls back to
    /// Lanczos interpolation.
    pub fn new(config: UpscalerConfig) -> Result<Self> {
        let session = if config.model.requires_weights() {
            if let Some(ref path) = config.model_path {
                Some(InferenceSession::new(path, config.backend)?)
            } else {
                let loader = ModelLoader::new().with_backend(config.backend);
                let model_name = config.model.model_name(config.scale_factor);
                match loader.find_model(&model_name) {
                    Ok(path) => Some(InferenceSession::new(&path, config.backend)?),
                    Err(_) => {
                        debug!("model '{}' not found, using interpolation", model_name);
                        None
                    }
                }
            }
        } else {
            None
        };

        Ok(Self { config, session })
    }

    /// Output dimensions for a given input size.
    #[must_use]
    pub fn target_for(&self, width: u32, height: u32) -> (u32, u32) {
        match self.config.target_size {
            Some(target) => target,
            None => {
                let scale = self.config.scale_factor.as_u32();
                (width * scale, height * scale)
            }
        }
    }

    /// Upscale one frame. The output keeps the input's pixel format.
    pub fn process(&self, frame: &VideoFrame) -> Result<VideoFrame> {
        frame.validate()?;

        let (target_w, target_h) = self.target_for(frame.width, frame.height);
        let rgb = frame_to_rgb(frame);

        let (scaled, scaled_w, scaled_h) = match &self.session {
            Some(session) => {
                let input = rgb_to_nchw(&rgb, frame.width, frame.height);
                let output = session.run(&input)?;
                nchw_to_rgb(&output)
            }
            None => {
                let resized = resize_rgb(&rgb, frame.width, frame.height, target_w, target_h)?;
                (resized, target_w, target_h)
            }
        };

        // Model output may be off by the rational part of the factor;
        // resample to the exact target.
        let (final_rgb, final_w, final_h) = if (scaled_w, scaled_h) == (target_w, target_h) {
            (scaled, target_w, target_h)
        } else {
            let resized = resize_rgb(&scaled, scaled_w, scaled_h, target_w, target_h)?;
            (resized, target_w, target_h)
        };

        let data = rgb_to_format(&final_rgb, frame.format);
        VideoFrame::new(final_w, final_h, frame.format, data).map_err(AiError::InvalidFrame)
    }

    /// Upscaler configuration.
    #[must_use]
    pub fn config(&self) -> &UpscalerConfig {
        &self.config
    }

    /// Whether a learned model is loaded.
    #[must_use]
    pub fn is_using_model(&self) -> bool {
        self.session.is_some()
    }
}

impl FrameTransform for Upscaler {
    fn output_size(&self, width: u32, height: u32) -> (u32, u32) {
        self.target_for(width, height)
    }

    fn transform(&self, frame: &VideoFrame) -> std::result::Result<VideoFrame, TransformError> {
        self.process(frame).map_err(Into::into)
    }
}

/// Extract a tightly packed RGB buffer from any supported format.
fn frame_to_rgb(frame: &VideoFrame) -> Vec<u8> {
    let pixels = frame.width as usize * frame.height as usize;
    match frame.format {
        PixelFormat::Rgb24 => frame.data.clone(),
        PixelFormat::Rgba => {
            let mut rgb = Vec::with_capacity(pixels * 3);
            for px in frame.data.chunks_exact(4) {
                rgb.extend_from_slice(&px[..3]);
            }
            rgb
        }
        PixelFormat::Bgra => {
            let mut rgb = Vec::with_capacity(pixels * 3);
            for px in frame.data.chunks_exact(4) {
                rgb.extend_from_slice(&[px[2], px[1], px[0]]);
            }
            rgb
        }
    }
}

/// Pack an RGB buffer back into the given format. Alpha is opaque.
fn rgb_to_format(rgb: &[u8], format: PixelFormat) -> Vec<u8> {
    match format {
        PixelFormat::Rgb24 => rgb.to_vec(),
        PixelFormat::Rgba => {
            let mut out = Vec::with_capacity(rgb.len() / 3 * 4);
            for px in rgb.chunks_exact(3) {
                out.extend_from_slice(&[px[0], px[1], px[2], 255]);
            }
            out
        }
        PixelFormat::Bgra => {
            let mut out = Vec::with_capacity(rgb.len() / 3 * 4);
            for px in rgb.chunks_exact(3) {
                out.extend_from_slice(&[px[2], px[1], px[0], 255]);
            }
            out
        }
    }
}

/// Convert packed RGB to a normalized NCHW tensor.
fn rgb_to_nchw(rgb: &[u8], width: u32, height: u32) -> Array4<f32> {
    let width = width as usize;
    let height = height as usize;
    Array4::from_shape_fn((1, 3, height, width), |(_, c, y, x)| {
        let idx = (y * width + x) * 3 + c;
        f32::from(rgb[idx]) / 255.0
    })
}

/// Convert an NCHW tensor back to packed RGB bytes.
fn nchw_to_rgb(array: &Array4<f32>) -> (Vec<u8>, u32, u32) {
    let (_, channels, height, width) = array.dim();
    let mut data = vec![0u8; width * height * channels];
    for c in 0..channels {
        for y in 0..height {
            for x in 0..width {
                let idx = (y * width + x) * channels + c;
                data[idx] = (array[[0, c, y, x]].clamp(0.0, 1.0) * 255.0) as u8;
            }
        }
    }
    (data, width as u32, height as u32)
}

/// Lanczos resample of a packed RGB buffer.
fn resize_rgb(rgb: &[u8], width: u32, height: u32, new_w: u32, new_h: u32) -> Result<Vec<u8>> {
    let img = image::RgbImage::from_raw(width, height, rgb.to_vec())
        .ok_or_else(|| AiError::Inference("rgb buffer does not match geometry".into()))?;
    let resized = image::imageops::resize(&img, new_w, new_h, image::imageops::FilterType::Lanczos3);
    Ok(resized.into_raw())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn gradient_frame(width: u32, height: u32, format: PixelFormat) -> VideoFrame {
        let mut frame = VideoFrame::black(width, height, format);
        for (i, byte) in frame.data.iter_mut().enumerate() {
            *byte = (i % 251) as u8;
        }
        frame
    }

    #[test]
    fn fallback_doubles_dimensions() {
        let up = Upscaler::new(UpscalerConfig::default().with_model(UpscaleModel::Lanczos))
            .unwrap();
        let frame = gradient_frame(16, 12, PixelFormat::Rgb24);
        let out = up.process(&frame).unwrap();
        assert_eq!(out.dimensions(), (32, 24));
        assert_eq!(out.format, PixelFormat::Rgb24);
        assert!(out.validate().is_ok());
    }

    #[test]
    fn target_size_overrides_factor() {
        let config = UpscalerConfig::default()
            .with_model(UpscaleModel::Lanczos)
            .with_target_size(100, 60);
        let up = Upscaler::new(config).unwrap();
        let frame = gradient_frame(16, 12, PixelFormat::Bgra);
        let out = up.process(&frame).unwrap();
        assert_eq!(out.dimensions(), (100, 60));
        assert_eq!(out.format, PixelFormat::Bgra);
    }

    #[test]
    fn model_session_is_used_when_found() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("realesrgan_x2.onnx");
        fs::write(&model, b"stub").unwrap();

        let up = Upscaler::new(UpscalerConfig::default().with_model_path(&model)).unwrap();
        assert!(up.is_using_model());

        let frame = gradient_frame(8, 8, PixelFormat::Rgb24);
        let out = up.process(&frame).unwrap();
        assert_eq!(out.dimensions(), (16, 16));
    }

    #[test]
    fn bgra_swizzle_round_trip() {
        let frame = VideoFrame::new(
            1,
            1,
            PixelFormat::Bgra,
            vec![10, 20, 30, 255],
        )
        .unwrap();
        let rgb = frame_to_rgb(&frame);
        assert_eq!(rgb, vec![30, 20, 10]);
        assert_eq!(rgb_to_format(&rgb, PixelFormat::Bgra), vec![10, 20, 30, 255]);
    }

    #[test]
    fn output_size_reports_target() {
        let up = Upscaler::new(
            UpscalerConfig::default()
                .with_model(UpscaleModel::Lanczos)
                .with_target_size(1024, 576),
        )
        .unwrap();
        assert_eq!(up.output_size(512, 288), (1024, 576));
    }

    #[test]
    fn covering_factor() {
        assert_eq!(ScaleFactor::covering(2.0), ScaleFactor::X2);
        assert_eq!(ScaleFactor::covering(1.5), ScaleFactor::X2);
        assert_eq!(ScaleFactor::covering(3.0), ScaleFactor::X4);
        // Beyond the largest model, X4 still covers and the exact
        // target is reached by resampling.
        assert_eq!(ScaleFactor::covering(6.0), ScaleFactor::X4);
    }

    #[test]
    fn under_covering_model_is_resampled_to_target() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("realesrgan_x2.onnx");
        fs::write(&model, b"stub").unwrap();

        // 6x target with a 2x model: inference output gets enlarged.
        let config = UpscalerConfig::default()
            .with_model_path(&model)
            .with_target_size(48, 48);
        let up = Upscaler::new(config).unwrap();
        assert!(up.is_using_model());

        let frame = gradient_frame(8, 8, PixelFormat::Rgb24);
        let out = up.process(&frame).unwrap();
        assert_eq!(out.dimensions(), (48, 48));
    }

    #[test]
    fn invalid_frame_is_rejected() {
        let up = Upscaler::new(UpscalerConfig::default().with_model(UpscaleModel::Lanczos))
            .unwrap();
        let frame = VideoFrame {
            width: 8,
            height: 8,
            format: PixelFormat::Rgb24,
            data: vec![0; 10],
        };
        assert!(up.process(&frame).is_err());
    }
}

//! Learned super-resolution for the upscale pipeline.
//!
//! Provides the [`Upscaler`], a [`upscale_core::FrameTransform`]
//! backed by a super-resolution model when one is found on the model
//! search path, with Lanczos interpolation as the fallback.

pub mod error;
pub mod model;
pub mod upscaler;

pub use error::{AiError, Result};
pub use model::{InferenceSession, ModelBackend, ModelInfo, ModelLoader};
pub use upscaler::{ScaleFactor, UpscaleModel, Upscaler, UpscalerConfig};

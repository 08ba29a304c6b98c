//! Decoded video frames.

use crate::error::{Error, Result};

/// Pixel layout of an interleaved frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 8-bit RGB, 3 bytes per pixel.
    Rgb24,
    /// 8-bit RGBA, 4 bytes per pixel.
    Rgba,
    /// 8-bit BGRA, 4 bytes per pixel.
    Bgra,
}

impl PixelFormat {
    /// Bytes per pixel for this format.
    #[must_use]
    pub const fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgb24 => 3,
            PixelFormat::Rgba | PixelFormat::Bgra => 4,
        }
    }

    /// Whether the format carries an alpha channel.
    #[must_use]
    pub const fn has_alpha(&self) -> bool {
        matches!(self, PixelFormat::Rgba | PixelFormat::Bgra)
    }
}

/// A decoded video frame with a tightly packed interleaved buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel layout of `data`.
    pub format: PixelFormat,
    /// Interleaved pixel data, `width * height * bytes_per_pixel` bytes.
    pub data: Vec<u8>,
}

impl VideoFrame {
    /// Create a frame, validating the buffer against the geometry.
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Result<Self> {
        let frame = Self {
            width,
            height,
            format,
            data,
        };
        frame.validate()?;
        Ok(frame)
    }

    /// Create a zero-filled frame of the given geometry.
    #[must_use]
    pub fn black(width: u32, height: u32, format: PixelFormat) -> Self {
        let size = width as usize * height as usize * format.bytes_per_pixel();
        Self {
            width,
            height,
            format,
            data: vec![0; size],
        }
    }

    /// Expected buffer size in bytes.
    #[must_use]
    pub fn expected_size(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }

    /// Width and height as a pair.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Check that the buffer matches the declared geometry.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidFrame(format!(
                "zero dimension: {}x{}",
                self.width, self.height
            )));
        }
        let expected = self.expected_size();
        if self.data.len() != expected {
            return Err(Error::InvalidFrame(format!(
                "buffer is {} bytes, geometry needs {}",
                self.data.len(),
                expected
            )));
        }
        Ok(())
    }
}

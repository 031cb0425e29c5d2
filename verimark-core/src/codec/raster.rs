//! Decoding carrier images into RGBA buffers and writing them back in their
//! original container format.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};
use tracing::debug;

use crate::error::{Result, VerimarkError};
use crate::media::MediaFile;

/// Quality used when a JPEG carrier has to be re-encoded.
pub const JPEG_QUALITY: u8 = 95;

/// A decoded carrier image plus the container format it came in.
#[derive(Debug, Clone)]
pub struct Raster {
    pub image: RgbaImage,
    pub format: ImageFormat,
}

impl Raster {
    /// Decode an image file. Non-image bytes are `UnsupportedType`.
    pub fn decode(file: &MediaFile) -> Result<Self> {
        let format = image::guess_format(&file.data).map_err(|_| {
            VerimarkError::UnsupportedType(format!(
                "'{}' ({}) is not a recognised image",
                file.display_name(),
                file.mime_type
            ))
        })?;
        let image = image::load_from_memory_with_format(&file.data, format)
            .map_err(|e| VerimarkError::ImageError(format!("Failed to decode image: {e}")))?;

        debug!(
            format = ?format,
            width = image.width(),
            height = image.height(),
            "Decoded carrier image"
        );

        Ok(Self {
            image: image.to_rgba8(),
            format,
        })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Whether pixel values survive a write/read cycle exactly.
    pub fn is_lossless(&self) -> bool {
        matches!(self.format, ImageFormat::Png | ImageFormat::WebP)
    }

    /// Reject containers we cannot write back without destroying the carrier.
    pub fn ensure_writable(&self) -> Result<()> {
        match self.format {
            ImageFormat::Png | ImageFormat::WebP | ImageFormat::Jpeg => Ok(()),
            other => Err(VerimarkError::UnsupportedType(format!(
                "Cannot embed into {other:?} images; use PNG, WebP or JPEG"
            ))),
        }
    }

    /// Encode back into the original container format.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        let written = match self.format {
            ImageFormat::Jpeg => {
                // JPEG has no alpha channel.
                let rgb = DynamicImage::ImageRgba8(self.image.clone()).to_rgb8();
                let encoder = JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);
                DynamicImage::ImageRgb8(rgb).write_with_encoder(encoder)
            }
            format => DynamicImage::ImageRgba8(self.image.clone()).write_to(&mut buffer, format),
        };
        written.map_err(|e| VerimarkError::ImageError(format!("Failed to encode image: {e}")))?;
        Ok(buffer.into_inner())
    }
}

/// One colour channel of an image as floating point samples.
#[derive(Debug, Clone)]
pub struct Plane {
    width: usize,
    height: usize,
    channel: usize,
    values: Vec<f32>,
}

impl Plane {
    /// Copy channel `channel` (0 = R, 1 = G, 2 = B) out of `image`.
    pub fn read(image: &RgbaImage, channel: usize) -> Self {
        let values = image.pixels().map(|p| p.0[channel] as f32).collect();
        Self {
            width: image.width() as usize,
            height: image.height() as usize,
            channel,
            values,
        }
    }

    /// Write the samples back, rounding and clamping to `0..=255`.
    pub fn write(&self, image: &mut RgbaImage) {
        for (pixel, value) in image.pixels_mut().zip(&self.values) {
            pixel.0[self.channel] = value.round().clamp(0.0, 255.0) as u8;
        }
    }

    /// Write the change relative to `original` into R, G and B alike.
    ///
    /// An equal offset on all three channels only moves luma, which lossy
    /// encoders quantize far more finely than chroma.
    pub fn write_as_luma(&self, original: &Plane, image: &mut RgbaImage) {
        for ((pixel, value), before) in image
            .pixels_mut()
            .zip(&self.values)
            .zip(&original.values)
        {
            let offset = value - before;
            for sample in &mut pixel.0[..3] {
                *sample = (*sample as f32 + offset).round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major copy of the `size`x`size` block at `(x0, y0)`.
    pub fn block(&self, x0: usize, y0: usize, size: usize) -> Vec<f32> {
        let mut out = Vec::with_capacity(size * size);
        for y in y0..y0 + size {
            let row = y * self.width;
            out.extend_from_slice(&self.values[row + x0..row + x0 + size]);
        }
        out
    }

    pub fn set_block(&mut self, x0: usize, y0: usize, size: usize, block: &[f32]) {
        for (dy, chunk) in block.chunks_exact(size).enumerate() {
            let row = (y0 + dy) * self.width;
            self.values[row + x0..row + x0 + size].copy_from_slice(chunk);
        }
    }
}

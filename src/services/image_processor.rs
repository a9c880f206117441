// src/services/image_processor.rs
use image::{GenericImageView, ImageFormat as ImgFormat};

use crate::errors::ImagineError;
use crate::models::{AspectRatio, ImagePayload};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub format: ImgFormat,
}

impl ImageInfo {
    /// Whether the pixel size is within 2% of the requested proportion.
    pub fn matches_ratio(&self, ratio: AspectRatio) -> bool {
        if self.height == 0 {
            return false;
        }
        let (w, h) = ratio.dimensions();
        let actual = self.width as f64 / self.height as f64;
        let expected = w as f64 / h as f64;
        ((actual - expected) / expected).abs() <= 0.02
    }
}

pub struct ImageProcessor;

impl ImageProcessor {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_image(&self, data: &[u8]) -> Result<ImageInfo, ImagineError> {
        let format = image::guess_format(data)
            .map_err(|e| ImagineError::ImageProcessing(format!("Unknown image format: {}", e)))?;

        let img = image::load_from_memory_with_format(data, format)
            .map_err(|e| ImagineError::ImageProcessing(format!("Invalid image data: {}", e)))?;

        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(ImagineError::ImageProcessing(
                "Image has no pixels".to_string(),
            ));
        }

        Ok(ImageInfo {
            width,
            height,
            format,
        })
    }

    /// Decodes and validates a payload, returning the raw bytes.
    pub fn decode_payload(&self, payload: &ImagePayload) -> Result<(Vec<u8>, ImageInfo), ImagineError> {
        let bytes = payload.decode()?;
        let info = self.validate_image(&bytes)?;
        Ok((bytes, info))
    }
}

impl Default for ImageProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40]));
    let mut output = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut output), ImgFormat::Png)
        .unwrap();
    output
}

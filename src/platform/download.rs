// src/platform/download.rs
use async_trait::async_trait;
use log::{info, warn};
use std::path::PathBuf;

use crate::models::GeneratedImage;
use crate::platform::{Downloader, PlatformError, download_file_name};
use crate::services::ImageProcessor;

/// Saves images into a directory on the local filesystem.
pub struct FileDownloader {
    output_dir: PathBuf,
    image_processor: ImageProcessor,
}

impl FileDownloader {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            image_processor: ImageProcessor::new(),
        }
    }
}

#[async_trait]
impl Downloader for FileDownloader {
    fn is_available(&self) -> bool {
        true
    }

    async fn save(&self, image: &GeneratedImage) -> Result<PathBuf, PlatformError> {
        let (bytes, info) = self
            .image_processor
            .decode_payload(image.payload())
            .map_err(|e| PlatformError::Failed(e.to_string()))?;

        if !info.matches_ratio(image.aspect_ratio()) {
            warn!(
                "Image is {}x{}, requested {}",
                info.width,
                info.height,
                image.aspect_ratio()
            );
        }

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| PlatformError::Failed(format!("Failed to create output directory: {}", e)))?;

        let path = self.output_dir.join(download_file_name(image));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| PlatformError::Failed(format!("Failed to write {}: {}", path.display(), e)))?;

        info!("Saved {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AspectRatio, ImagePayload};
    use crate::services::image_processor::sample_png;

    #[tokio::test]
    async fn saves_decoded_bytes_under_generated_name() {
        let dir = tempfile::tempdir().unwrap();
        let png = sample_png(16, 9);
        let image = GeneratedImage::new(
            ImagePayload::from_bytes("image/png", &png),
            "grid",
            AspectRatio::Landscape,
            77,
        );

        let path = FileDownloader::new(dir.path().join("out")).save(&image).await.unwrap();

        assert_eq!(path.file_name().unwrap(), "generated-image-77.png");
        assert_eq!(std::fs::read(&path).unwrap(), png);
    }

    #[tokio::test]
    async fn refuses_payloads_that_are_not_images() {
        let dir = tempfile::tempdir().unwrap();
        let image = GeneratedImage::new(
            ImagePayload::from_bytes("image/png", b"plain text"),
            "oops",
            AspectRatio::Square,
            1,
        );

        let err = FileDownloader::new(dir.path()).save(&image).await.unwrap_err();
        assert!(matches!(err, PlatformError::Failed(_)));
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }
}

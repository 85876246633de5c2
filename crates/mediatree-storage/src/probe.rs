//! Classify uploaded content and read image dimensions.

use std::io::Cursor;

use bytes::Bytes;
use image::ImageReader;
use tracing::debug;

use mediatree_core::error::{AppError, ErrorKind};
use mediatree_core::result::AppResult;
use mediatree_entity::node::media_type::mime_from_extension;
use mediatree_entity::{Dimensions, MediaType};

/// What the probe learned about a piece of content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbedMedia {
    /// MIME type guessed from the extension.
    pub mime_type: String,
    /// Media classification. Images the decoder understands are promoted
    /// to [`MediaType::SupportedImage`].
    pub media_type: MediaType,
    /// Pixel dimensions for supported images.
    pub dimensions: Option<Dimensions>,
}

/// Probe `data` uploaded with extension `ext`.
///
/// Only the image header is decoded. Content that claims to be an image
/// but cannot be read stays a plain [`MediaType::Image`].
pub async fn probe_image(data: Bytes, ext: &str) -> AppResult<ProbedMedia> {
    let mime_type = mime_from_extension(ext).to_string();
    let media_type = MediaType::from_mime(&mime_type);
    if media_type != MediaType::Image {
        return Ok(ProbedMedia {
            mime_type,
            media_type,
            dimensions: None,
        });
    }

    let dimensions = tokio::task::spawn_blocking(move || read_dimensions(&data))
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Internal, "Image probe task panicked", e))?;

    debug!(mime = %mime_type, ?dimensions, "Probed image");
    Ok(ProbedMedia {
        media_type: if dimensions.is_some() {
            MediaType::SupportedImage
        } else {
            MediaType::Image
        },
        mime_type,
        dimensions,
    })
}

fn read_dimensions(data: &[u8]) -> Option<Dimensions> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?;
    let (width, height) = reader.into_dimensions().ok()?;
    Some(Dimensions { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(width: u32, height: u32) -> Bytes {
        let img = image::RgbImage::new(width, height);
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        Bytes::from(out.into_inner())
    }

    #[tokio::test]
    async fn test_png_is_supported_image() {
        let probed = probe_image(png(4, 3), "png").await.unwrap();
        assert_eq!(probed.media_type, MediaType::SupportedImage);
        assert_eq!(probed.mime_type, "image/png");
        assert_eq!(
            probed.dimensions,
            Some(Dimensions {
                width: 4,
                height: 3
            })
        );
    }

    #[tokio::test]
    async fn test_undecodable_image_stays_image() {
        let probed = probe_image(Bytes::from_static(b"not a jpeg"), "jpg")
            .await
            .unwrap();
        assert_eq!(probed.media_type, MediaType::Image);
        assert!(probed.dimensions.is_none());
    }

    #[tokio::test]
    async fn test_documents_are_not_decoded() {
        let probed = probe_image(Bytes::from_static(b"%PDF-1.4"), "pdf")
            .await
            .unwrap();
        assert_eq!(probed.media_type, MediaType::Document);
        assert_eq!(probed.mime_type, "application/pdf");
    }
}

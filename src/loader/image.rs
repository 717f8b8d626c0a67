//! Raster image documents.
//!
//! Decoding goes through `image::load_from_memory`, so any format the `image`
//! crate was built with (PNG, JPEG, GIF, TIFF) is accepted. Inline payloads
//! are not sniffed first: a payload that does not decode is simply an
//! invalid resource.

use super::{Artifact, ByteTransport, Decoder, FetchPipeline, FetchSink, Loader};
use crate::config::ViewerConfig;
use crate::error::LoadError;
use crate::reachability::Reachability;
use crate::runtime::ExecutionPolicy;
use crate::source::{DocumentKind, DocumentSource};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::sync::Arc;
use tracing::{debug, warn};

/// A decoded raster image.
#[derive(Debug, Clone)]
pub struct ImageFile {
    image: DynamicImage,
}

impl ImageFile {
    pub fn new(image: DynamicImage) -> Self {
        Self { image }
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn has_alpha(&self) -> bool {
        self.image.color().has_alpha()
    }

    /// Encode for sharing: PNG when the image carries alpha, otherwise JPEG
    /// at `jpeg_quality`.
    pub fn encode_for_share(&self, jpeg_quality: u8) -> Result<Vec<u8>, image::ImageError> {
        let mut buf = Vec::new();

        if self.has_alpha() {
            DynamicImage::ImageRgba8(self.image.to_rgba8())
                .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
        } else {
            let rgb = self.image.to_rgb8();
            JpegEncoder::new_with_quality(&mut buf, jpeg_quality).encode_image(&rgb)?;
        }

        debug!(
            "Encoded {}x{} image for sharing → {} bytes",
            self.width(),
            self.height(),
            buf.len()
        );
        Ok(buf)
    }
}

impl Artifact for ImageFile {
    fn share_data(&self, config: &ViewerConfig) -> Option<Vec<u8>> {
        match self.encode_for_share(config.jpeg_quality) {
            Ok(data) => Some(data),
            Err(e) => {
                warn!("Failed to encode image for sharing: {}", e);
                None
            }
        }
    }
}

/// Decodes raw bytes into an [`ImageFile`]. Credentials are ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageDecoder;

impl Decoder for ImageDecoder {
    type Artifact = ImageFile;

    fn decode(&self, data: Vec<u8>, _credential: Option<&str>) -> Result<ImageFile, LoadError> {
        let image = image::load_from_memory(&data).map_err(|e| {
            debug!("Image decode failed ({} bytes): {}", data.len(), e);
            LoadError::InvalidResource
        })?;

        debug!("Decoded image: {}x{}", image.width(), image.height());
        Ok(ImageFile::new(image))
    }
}

/// Loads image documents.
pub struct ImageLoader {
    pipeline: FetchPipeline,
    decoder: Arc<ImageDecoder>,
}

impl ImageLoader {
    pub fn new(
        policy: ExecutionPolicy,
        reachability: Arc<dyn Reachability>,
        config: &ViewerConfig,
    ) -> Self {
        Self::with_pipeline(FetchPipeline::new(
            policy,
            reachability,
            ByteTransport::new(config.user_agent.clone()),
        ))
    }

    pub fn with_pipeline(pipeline: FetchPipeline) -> Self {
        Self {
            pipeline,
            decoder: Arc::new(ImageDecoder),
        }
    }
}

impl Loader for ImageLoader {
    type Artifact = ImageFile;

    const KIND: DocumentKind = DocumentKind::Image;

    fn fetch(&self, source: &DocumentSource, credential: Option<&str>, sink: FetchSink<ImageFile>) {
        self.pipeline.run(&self.decoder, source, credential, sink);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sniff::MimeType;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn png_bytes(image: DynamicImage) -> Vec<u8> {
        let mut buf = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn decodes_png() {
        let data = png_bytes(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            3,
            2,
            Rgb([10, 20, 30]),
        )));

        let file = ImageDecoder.decode(data, None).unwrap();
        assert_eq!((file.width(), file.height()), (3, 2));
        assert!(!file.has_alpha());
    }

    #[test]
    fn garbage_is_invalid_resource() {
        let err = ImageDecoder.decode(b"not an image".to_vec(), None).unwrap_err();
        assert_eq!(err, LoadError::InvalidResource);
    }

    #[test]
    fn opaque_image_shares_as_jpeg() {
        let file = ImageFile::new(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            4,
            4,
            Rgb([200, 100, 50]),
        )));
        let data = file.share_data(&ViewerConfig::default()).unwrap();
        assert_eq!(MimeType::detect(&data), MimeType::Jpeg);
    }

    #[test]
    fn transparent_image_shares_as_png() {
        let file = ImageFile::new(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            4,
            4,
            Rgba([0, 0, 0, 128]),
        )));
        let data = file.share_data(&ViewerConfig::default()).unwrap();
        assert_eq!(MimeType::detect(&data), MimeType::Png);
    }

    #[test]
    fn lower_quality_gives_smaller_jpeg() {
        let mut img = RgbImage::new(64, 64);
        for (x, y, px) in img.enumerate_pixels_mut() {
            *px = Rgb([(x * 4) as u8, (y * 4) as u8, ((x ^ y) * 4) as u8]);
        }
        let file = ImageFile::new(DynamicImage::ImageRgb8(img));

        let high = file.encode_for_share(100).unwrap();
        let low = file.encode_for_share(10).unwrap();
        assert!(low.len() < high.len());
    }
}

//! Decoded image handle.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;

use crate::error::EngineResult;

/// A decoded image ready for inference.
///
/// Created once per request or batch item from a base64 payload, used
/// for one or more detection attempts within that scope, then dropped.
/// Never shared across concurrent requests.
#[derive(Debug)]
pub struct FaceImage {
    image: DynamicImage,
    width: u32,
    height: u32,
}

impl FaceImage {
    /// Decode a base64 payload into an image.
    ///
    /// Accepts both raw base64 and data URLs ("data:image/...;base64,").
    pub fn from_base64(payload: &str) -> EngineResult<Self> {
        let encoded = match payload.split_once(";base64,") {
            Some((_, rest)) => rest,
            None => payload,
        };

        let bytes = STANDARD.decode(encoded.trim())?;
        let image = image::load_from_memory(&bytes)?;
        Ok(Self::from_image(image))
    }

    /// Wrap an already-decoded image.
    pub fn from_image(image: DynamicImage) -> Self {
        let width = image.width();
        let height = image.height();
        Self {
            image,
            width,
            height,
        }
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use image::{ImageBuffer, Rgb};
    use std::io::Cursor;

    fn png_base64(width: u32, height: u32) -> String {
        let buffer: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_pixel(width, height, Rgb([64, 128, 192]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(buffer)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        STANDARD.encode(bytes)
    }

    #[test]
    fn test_decode_raw_base64() {
        let payload = png_base64(32, 24);
        let face = FaceImage::from_base64(&payload).unwrap();
        assert_eq!(face.width(), 32);
        assert_eq!(face.height(), 24);
    }

    #[test]
    fn test_decode_data_url() {
        let payload = format!("data:image/png;base64,{}", png_base64(16, 16));
        let face = FaceImage::from_base64(&payload).unwrap();
        assert_eq!(face.width(), 16);
    }

    #[test]
    fn test_malformed_base64_is_rejected() {
        let err = FaceImage::from_base64("not-valid-base64!!!").unwrap_err();
        assert!(err.is_bad_input());
    }

    #[test]
    fn test_valid_base64_invalid_image_is_rejected() {
        let payload = STANDARD.encode(b"definitely not an image");
        let err = FaceImage::from_base64(&payload).unwrap_err();
        assert!(err.is_bad_input());
    }
}

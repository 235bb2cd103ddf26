use std::path::Path;

use image::DynamicImage;

use crate::AssetError;

/// An equirectangular high-dynamic-range image, 32-bit float RGB, rows top to bottom.
#[derive(Debug, Clone)]
pub struct HdrImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<f32>,
}

impl HdrImage {
    /// Loads an equirectangular environment map from disk.
    ///
    /// Anything that does not decode to 32-bit float RGB is rejected.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = path.as_ref();
        log::info!("[Assets] Loading environment map: {}", path.display());
        let image = image::open(path)?;
        Self::from_dynamic(image)
    }

    pub fn from_dynamic(image: DynamicImage) -> Result<Self, AssetError> {
        match image {
            DynamicImage::ImageRgb32F(buffer) => Ok(Self {
                width: buffer.width(),
                height: buffer.height(),
                pixels: buffer.into_raw(),
            }),
            other => Err(AssetError::UnsupportedLayout(other.color())),
        }
    }

    /// Expands to RGBA with alpha 1, the layout GPU textures expect.
    pub fn to_rgba(&self) -> Vec<f32> {
        let mut rgba = Vec::with_capacity(self.pixels.len() / 3 * 4);
        for rgb in self.pixels.chunks_exact(3) {
            rgba.extend_from_slice(rgb);
            rgba.push(1.0);
        }
        rgba
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, Rgba};

    #[test]
    fn accepts_float_rgb() {
        let buffer: ImageBuffer<Rgb<f32>, Vec<f32>> =
            ImageBuffer::from_pixel(4, 2, Rgb([2.0, 1.0, 0.5]));
        let hdr = HdrImage::from_dynamic(DynamicImage::ImageRgb32F(buffer)).unwrap();

        assert_eq!((hdr.width, hdr.height), (4, 2));
        assert_eq!(hdr.pixels.len(), 4 * 2 * 3);

        let rgba = hdr.to_rgba();
        assert_eq!(rgba.len(), 4 * 2 * 4);
        assert_eq!(&rgba[0..4], &[2.0, 1.0, 0.5, 1.0]);
    }

    #[test]
    fn rejects_float_rgba() {
        let buffer: ImageBuffer<Rgba<f32>, Vec<f32>> =
            ImageBuffer::from_pixel(2, 2, Rgba([1.0, 1.0, 1.0, 1.0]));
        let err = HdrImage::from_dynamic(DynamicImage::ImageRgba32F(buffer)).unwrap_err();
        assert!(matches!(err, AssetError::UnsupportedLayout(_)));
    }

    #[test]
    fn rejects_8bit_rgb() {
        let image = DynamicImage::new_rgb8(2, 2);
        assert!(matches!(
            HdrImage::from_dynamic(image),
            Err(AssetError::UnsupportedLayout(image::ColorType::Rgb8))
        ));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(HdrImage::load("definitely/not/here.hdr").is_err());
    }
}

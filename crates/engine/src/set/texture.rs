use std::io::Cursor;

use image::ImageReader;
use thiserror::Error;

use crate::region::BiomeMapRaster;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct MapDecodeError {
    pub message: String,
}

/// Decodes raw image bytes into a biome map raster. The bytes come from a
/// set's `<Region>.png`, but the decoder sniffs the actual format rather
/// than trusting the extension.
pub fn decode_biome_map(bytes: &[u8]) -> Result<BiomeMapRaster, MapDecodeError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|error| MapDecodeError {
            message: format!("format_probe_failed:{error}"),
        })?;
    let decoded = reader.decode().map_err(|error| MapDecodeError {
        message: format!("decode_failed:{error}"),
    })?;
    let image = decoded.to_rgba8();
    let (width, height) = image.dimensions();
    BiomeMapRaster::new(width, height, image.into_raw()).map_err(|error| MapDecodeError {
        message: format!("raster_rejected:{error}"),
    })
}

#[cfg(test)]
pub(crate) fn encode_test_png(width: u32, height: u32, fill: [u8; 4]) -> Vec<u8> {
    use image::{ImageFormat, RgbaImage};

    let mut image = RgbaImage::new(width, height);
    for pixel in image.pixels_mut() {
        *pixel = image::Rgba(fill);
    }
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("encode png");
    bytes.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_png_bytes_to_rgba_raster() {
        let bytes = encode_test_png(4, 2, [10, 20, 30, 255]);
        let raster = decode_biome_map(&bytes).expect("decode");
        assert_eq!(raster.width(), 4);
        assert_eq!(raster.height(), 2);
        assert_eq!(raster.pixel(3, 1), Some([10, 20, 30, 255]));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = decode_biome_map(b"definitely not an image").expect_err("err");
        assert!(
            err.message.starts_with("format_probe_failed:")
                || err.message.starts_with("decode_failed:")
        );
    }

    #[test]
    fn empty_bytes_fail_to_decode() {
        assert!(decode_biome_map(&[]).is_err());
    }
}

//! Artifact compression
//!
//! Text artifacts are gzip-compressed; screenshot PNGs are recompressed to
//! WebP. Both run through `spawn_blocking` from the storage layer since the
//! inputs can be multi-megabyte page bodies and full-page captures.

use std::io::{Cursor, Write};

use anyhow::{Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use image::codecs::webp::WebPEncoder;
use image::ImageReader;

/// Gzip-compress a byte buffer.
pub fn gzip_bytes(content: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::new(6));
    encoder
        .write_all(content)
        .context("failed to gzip content")?;
    encoder.finish().context("failed to finish gzip stream")
}

/// Re-encode PNG screenshot bytes as WebP.
pub fn recompress_webp(png_bytes: &[u8]) -> Result<Vec<u8>> {
    let image = ImageReader::new(Cursor::new(png_bytes))
        .with_guessed_format()
        .context("failed to sniff screenshot format")?
        .decode()
        .context("failed to decode screenshot")?;

    let mut output = Vec::new();
    let encoder = WebPEncoder::new_lossless(&mut output);
    image
        .write_with_encoder(encoder)
        .context("failed to encode WebP")?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    #[test]
    fn test_gzip_round_trip() {
        let original = b"<html><body>hello hello hello</body></html>".to_vec();
        let compressed = gzip_bytes(&original).unwrap();

        let mut decoder = GzDecoder::new(compressed.as_slice());
        let mut restored = Vec::new();
        decoder.read_to_end(&mut restored).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_webp_recompression_produces_webp_header() {
        // 2x2 red PNG produced through the image crate itself
        let mut png = Vec::new();
        let buffer = image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 255]));
        image::DynamicImage::ImageRgba8(buffer)
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let webp = recompress_webp(&png).unwrap();
        assert_eq!(&webp[0..4], b"RIFF");
        assert_eq!(&webp[8..12], b"WEBP");
    }

    #[test]
    fn test_invalid_image_is_an_error() {
        assert!(recompress_webp(b"not an image").is_err());
    }
}

//! PNG encoding of grayscale or RGB sample buffers.
//!
//! 16-bit samples are written big-endian as PNG requires; the `image` crate
//! takes care of the byte swap.

use std::path::Path;

use image::{ImageBuffer, ImageFormat, Luma, Pixel, Rgb};

use crate::error::{Result, ScanError};

/// Borrowed samples to encode.
#[derive(Debug, Clone, Copy)]
pub enum Samples<'a> {
    /// 8-bit samples.
    U8(&'a [u8]),
    /// 16-bit samples in host order.
    U16(&'a [u16]),
}

impl Samples<'_> {
    /// Number of samples.
    #[must_use]
    pub const fn len(&self) -> usize {
        match self {
            Self::U8(samples) => samples.len(),
            Self::U16(samples) => samples.len(),
        }
    }

    /// True if there are no samples.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Write `samples` as a `width` x `height` PNG with 1 (gray) or 3 (RGB)
/// channels.
pub fn encode_png(
    samples: Samples<'_>,
    width: u32,
    height: u32,
    channels: usize,
    path: &Path,
) -> Result<()> {
    if channels != 1 && channels != 3 {
        return Err(ScanError::UnsupportedChannels(channels));
    }
    let expected = width as usize * height as usize * channels;
    if samples.len() != expected {
        return Err(ScanError::Encoding(format!(
            "{} samples for a {width}x{height} image with {channels} channels, expected {expected}",
            samples.len()
        )));
    }

    match (samples, channels) {
        (Samples::U16(data), 1) => save::<Luma<u16>>(data, width, height, path),
        (Samples::U16(data), _) => save::<Rgb<u16>>(data, width, height, path),
        (Samples::U8(data), 1) => save::<Luma<u8>>(data, width, height, path),
        (Samples::U8(data), _) => save::<Rgb<u8>>(data, width, height, path),
    }?;

    log::debug!("Wrote {}x{} PNG to {}", width, height, path.display());
    Ok(())
}

fn save<P>(data: &[P::Subpixel], width: u32, height: u32, path: &Path) -> Result<()>
where
    P: Pixel + image::PixelWithColorType,
    [P::Subpixel]: image::EncodableLayout,
{
    let buffer = ImageBuffer::<P, &[P::Subpixel]>::from_raw(width, height, data)
        .ok_or_else(|| ScanError::Encoding("sample buffer too small".to_owned()))?;
    buffer.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_unsupported_channel_count() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = encode_png(Samples::U8(&[0; 8]), 2, 2, 2, &dir.path().join("x.png"))
            .expect_err("two channels should be rejected");
        assert!(matches!(err, ScanError::UnsupportedChannels(2)));
    }

    #[test]
    fn test_rejects_length_mismatch() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = encode_png(Samples::U16(&[0; 5]), 2, 2, 1, &dir.path().join("x.png"))
            .expect_err("short buffer should be rejected");
        assert!(matches!(err, ScanError::Encoding(_)));
    }

    #[test]
    fn test_gray16_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("gray.png");
        let samples = [0u16, 1, 0x0102, 65535, 300, 40000];
        encode_png(Samples::U16(&samples), 3, 2, 1, &path).expect("encode should succeed");

        let decoded = image::open(&path).expect("decode").into_luma16();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.into_raw(), samples.to_vec());
    }

    #[test]
    fn test_rgb8_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("rgb.png");
        let samples = [255u8, 0, 0, 0, 255, 0];
        encode_png(Samples::U8(&samples), 2, 1, 3, &path).expect("encode should succeed");

        let decoded = image::open(&path).expect("decode").into_rgb8();
        assert_eq!(decoded.into_raw(), samples.to_vec());
    }

    #[test]
    fn test_unwritable_path_is_encoding_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing").join("x.png");
        let err = encode_png(Samples::U8(&[0]), 1, 1, 1, &path).expect_err("write should fail");
        assert!(matches!(err, ScanError::Encoding(_)));
    }
}

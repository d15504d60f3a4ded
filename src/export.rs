//! Saving captured planes to disk.
//!
//! Every plane is written to its own file named
//! `{prefix}_{r|g|b|i}_{light}_{index:05}` with either the raw `.mmarr`
//! extension or `.png`.

use std::path::{Path, PathBuf};

use crate::buffer::{Channel, ImageBuffer};
use crate::encoder::{encode_png, Samples};
use crate::error::Result;
use crate::store;

/// Extension of raw sample archives.
pub const RAW_EXTENSION: &str = "mmarr";

/// File stem for one plane.
#[must_use]
pub fn plane_stem(prefix: &str, channel: Channel, light: i32, index: u32) -> String {
    format!("{prefix}_{}_{light}_{index:05}", channel.suffix())
}

fn plane_path(
    dir: &Path,
    prefix: &str,
    channel: Channel,
    light: i32,
    index: u32,
    extension: &str,
) -> PathBuf {
    dir.join(format!(
        "{}.{extension}",
        plane_stem(prefix, channel, light, index)
    ))
}

/// Write the four planes as raw archives. Returns the written paths in
/// channel order.
pub fn save_raw_planes(
    image: &ImageBuffer,
    dir: &Path,
    prefix: &str,
    light: i32,
    index: u32,
) -> Result<Vec<PathBuf>> {
    image
        .planes()
        .map(|(channel, plane)| {
            let path = plane_path(dir, prefix, channel, light, index, RAW_EXTENSION);
            store::write_samples(&path, plane)?;
            Ok(path)
        })
        .collect()
}

/// Write the four planes as 16-bit grayscale PNGs. Returns the written
/// paths in channel order.
pub fn save_png_planes(
    image: &ImageBuffer,
    dir: &Path,
    prefix: &str,
    light: i32,
    index: u32,
) -> Result<Vec<PathBuf>> {
    image
        .planes()
        .map(|(channel, plane)| {
            let path = plane_path(dir, prefix, channel, light, index, "png");
            encode_png(
                Samples::U16(plane),
                image.width(),
                image.height(),
                1,
                &path,
            )?;
            Ok(path)
        })
        .collect()
}

/// Write the R, G and B planes as one 16-bit RGB PNG.
pub fn save_rgb_png(image: &ImageBuffer, path: &Path) -> Result<()> {
    encode_png(
        Samples::U16(&image.interleave_rgb()),
        image.width(),
        image.height(),
        3,
        path,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_image() -> ImageBuffer {
        let mut image = ImageBuffer::with_size(2, 2);
        for index in 0..4u16 {
            image.set_pixel(
                usize::from(index),
                [index, index * 100, index * 1000, 65535 - index],
            );
        }
        image
    }

    #[test]
    fn test_plane_stem_format() {
        assert_eq!(plane_stem("scan", Channel::Red, 1, 7), "scan_r_1_00007");
        assert_eq!(
            plane_stem("cal", Channel::Infrared, 0, 12345),
            "cal_i_0_12345"
        );
    }

    #[test]
    fn test_save_raw_planes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let image = sample_image();
        let paths = save_raw_planes(&image, dir.path(), "scan", 1, 3).expect("save should succeed");

        assert_eq!(paths.len(), 4);
        assert_eq!(
            paths[2].file_name().and_then(|n| n.to_str()),
            Some("scan_b_1_00003.mmarr")
        );
        for (path, (_, plane)) in paths.iter().zip(image.planes()) {
            assert_eq!(store::read_samples(path).expect("read back"), plane);
        }
    }

    #[test]
    fn test_save_png_planes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let image = sample_image();
        let paths = save_png_planes(&image, dir.path(), "scan", 0, 0).expect("save should succeed");

        let decoded = image::open(&paths[3]).expect("decode").into_luma16();
        assert_eq!(decoded.dimensions(), (2, 2));
        assert_eq!(decoded.into_raw(), image.plane(Channel::Infrared));
    }

    #[test]
    fn test_save_rgb_png() {
        let dir = tempfile::tempdir().expect("tempdir");
        let image = sample_image();
        let path = dir.path().join("rgb.png");
        save_rgb_png(&image, &path).expect("save should succeed");

        let decoded = image::open(&path).expect("decode").into_rgb16();
        assert_eq!(decoded.into_raw(), image.interleave_rgb());
    }
}

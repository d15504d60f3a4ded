//! Image validation utilities for test pattern verification.
//!
//! This module provides functions to validate that acquired images contain
//! expected test patterns. Useful for integration testing with the simulated
//! scanner.

use crate::buffer::{Channel, ImageBuffer};
use crate::error::{Result, ScanError};

/// Minimum rise across a row for a plane to count as a gradient.
const MIN_GRADIENT_RISE: u16 = 4096;

/// Validates that one plane contains a horizontal gradient.
///
/// This function samples the center row of the image and verifies that the
/// samples never decrease from left to right. It also checks that there is a
/// significant overall rise across the row (not a solid plane).
///
/// # Arguments
///
/// * `image` - The image to validate
/// * `channel` - The plane to check
///
/// # Returns
///
/// * `Ok(())` if the gradient is valid
/// * `Err(ScanError::Validation)` if validation fails
///
/// # Errors
///
/// Returns `Validation` if:
/// - The image is empty
/// - The samples decrease anywhere along the row
/// - The total rise is smaller than a sixteenth of the 16-bit range
pub fn validate_gradient(image: &ImageBuffer, channel: Channel) -> Result<()> {
    let width = image.width() as usize;
    let center_y = image.height() as usize / 2;
    let row = image
        .plane(channel)
        .get(center_y * width..(center_y + 1) * width)
        .filter(|row| !row.is_empty())
        .ok_or_else(|| ScanError::Validation("Cannot validate an empty image".to_owned()))?;

    for (x, pair) in row.windows(2).enumerate() {
        if pair[1] < pair[0] {
            return Err(ScanError::Validation(format!(
                "Channel {} not monotonically increasing at x={}: {} < previous {}",
                channel.suffix(),
                x + 1,
                pair[1],
                pair[0]
            )));
        }
    }

    let first = row.first().copied().unwrap_or_default();
    let last = row.last().copied().unwrap_or_default();
    let rise = last.saturating_sub(first);
    if rise < MIN_GRADIENT_RISE {
        return Err(ScanError::Validation(format!(
            "Insufficient rise for gradient in channel {}: {rise} \
             (expected at least {MIN_GRADIENT_RISE})",
            channel.suffix()
        )));
    }

    Ok(())
}

/// Validates that every pixel equals `expected` within `tolerance`.
///
/// # Errors
///
/// Returns `Validation` naming the first pixel that differs.
pub fn validate_solid(image: &ImageBuffer, expected: [u16; 4], tolerance: u16) -> Result<()> {
    for index in 0..image.len() {
        let actual = image.pixel(index).unwrap_or_default();
        if !samples_match(actual, expected, tolerance) {
            return Err(pixel_mismatch(image, index, expected, actual));
        }
    }
    Ok(())
}

/// Validates that `image` is identical to `expected`.
///
/// # Errors
///
/// Returns `Validation` if the sizes differ or naming the first pixel that
/// differs.
pub fn validate_identical(image: &ImageBuffer, expected: &ImageBuffer) -> Result<()> {
    if (image.width(), image.height()) != (expected.width(), expected.height()) {
        return Err(ScanError::Validation(format!(
            "Image size {}x{} does not match expected {}x{}",
            image.width(),
            image.height(),
            expected.width(),
            expected.height()
        )));
    }

    for index in 0..image.len() {
        let actual = image.pixel(index).unwrap_or_default();
        let wanted = expected.pixel(index).unwrap_or_default();
        if actual != wanted {
            return Err(pixel_mismatch(image, index, wanted, actual));
        }
    }
    Ok(())
}

/// Validates that rows `from..` are all zero, as left behind by a scan that
/// ended early.
///
/// # Errors
///
/// Returns `Validation` naming the first non-zero pixel.
pub fn validate_blank_rows(image: &ImageBuffer, from: u32) -> Result<()> {
    let start = from as usize * image.width() as usize;
    for index in start..image.len() {
        let actual = image.pixel(index).unwrap_or_default();
        if actual != [0; 4] {
            return Err(pixel_mismatch(image, index, [0; 4], actual));
        }
    }
    Ok(())
}

fn pixel_mismatch(
    image: &ImageBuffer,
    index: usize,
    expected: [u16; 4],
    actual: [u16; 4],
) -> ScanError {
    let width = (image.width() as usize).max(1);
    ScanError::Validation(format!(
        "Pixel mismatch at ({}, {}): expected RGBI{expected:?}, got RGBI{actual:?}",
        index % width,
        index / width
    ))
}

/// Check if two RGBI samples match within a tolerance per channel.
fn samples_match(actual: [u16; 4], expected: [u16; 4], tolerance: u16) -> bool {
    actual
        .iter()
        .zip(expected)
        .all(|(a, e)| a.abs_diff(e) <= tolerance)
}

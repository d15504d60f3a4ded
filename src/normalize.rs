//! Per-channel contrast stretch to the full 16-bit range.

use crate::buffer::{Channel, ImageBuffer};

/// Stretch every plane of `image` independently to `0..=65535`.
///
/// Each sample becomes `round(65535 * (v - min) / (max - min))` using the
/// plane's own minimum and maximum. A plane with a single value has no range
/// to stretch and is set to all zeros. An empty image is left unchanged.
///
/// Returns the `(min, max)` of each plane before stretching, indexed by
/// [`Channel::index`].
pub fn normalize(image: &mut ImageBuffer) -> [(u16, u16); 4] {
    let mut ranges = [(0u16, 0u16); 4];
    for (channel, plane) in image.planes_mut() {
        let range = stretch_plane(plane);
        if let Some(slot) = ranges.get_mut(channel.index()) {
            *slot = range;
        }
        log::debug!(
            "Normalized channel {}: {}..={}",
            channel.suffix(),
            range.0,
            range.1
        );
    }
    ranges
}

fn stretch_plane(plane: &mut [u16]) -> (u16, u16) {
    let Some((min, max)) = min_max(plane) else {
        return (0, 0);
    };

    if max == min {
        plane.fill(0);
        return (min, max);
    }

    let span = u64::from(max - min);
    for sample in plane.iter_mut() {
        let scaled = (u64::from(*sample - min) * 65535 + span / 2) / span;
        *sample = u16::try_from(scaled).unwrap_or(u16::MAX);
    }
    (min, max)
}

fn min_max(plane: &[u16]) -> Option<(u16, u16)> {
    plane.iter().fold(None, |acc, &v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

/// Range of `channel` in `image`, or `None` when the image is empty.
#[must_use]
pub fn channel_range(image: &ImageBuffer, channel: Channel) -> Option<(u16, u16)> {
    min_max(image.plane(channel))
}

//! Planar RGBI image buffer filled by the acquisition loop.

/// Capture channel, in the order the device interleaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Red.
    Red,
    /// Green.
    Green,
    /// Blue.
    Blue,
    /// Infrared.
    Infrared,
}

impl Channel {
    /// All channels in interleave order.
    pub const ALL: [Self; 4] = [Self::Red, Self::Green, Self::Blue, Self::Infrared];

    /// Position of this channel within an interleaved pixel.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Red => 0,
            Self::Green => 1,
            Self::Blue => 2,
            Self::Infrared => 3,
        }
    }

    /// One-letter suffix used in file names.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Red => "r",
            Self::Green => "g",
            Self::Blue => "b",
            Self::Infrared => "i",
        }
    }
}

/// Four equal-length 16-bit sample planes.
///
/// Every plane always holds exactly `width * height` samples.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageBuffer {
    width: u32,
    height: u32,
    planes: [Vec<u16>; 4],
}

impl ImageBuffer {
    /// Empty 0x0 image.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Image of the given size with all samples zero.
    #[must_use]
    pub fn with_size(width: u32, height: u32) -> Self {
        let mut image = Self::new();
        image.resize(width, height);
        image
    }

    /// Build an image from existing planes (R, G, B, IR).
    ///
    /// Returns `None` if any plane length differs from `width * height`.
    #[must_use]
    pub fn from_planes(width: u32, height: u32, planes: [Vec<u16>; 4]) -> Option<Self> {
        let len = pixel_count(width, height);
        planes
            .iter()
            .all(|plane| plane.len() == len)
            .then_some(Self {
                width,
                height,
                planes,
            })
    }

    /// Reallocate every plane to `width * height` zeroed samples.
    ///
    /// Previous contents are not preserved.
    pub fn resize(&mut self, width: u32, height: u32) {
        let len = pixel_count(width, height);
        self.width = width;
        self.height = height;
        for plane in &mut self.planes {
            plane.clear();
            plane.resize(len, 0);
        }
        self.check_invariant();
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Samples per plane.
    #[must_use]
    pub fn len(&self) -> usize {
        self.planes[0].len()
    }

    /// True for a 0-sample image.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Samples of one channel, row-major.
    #[must_use]
    pub fn plane(&self, channel: Channel) -> &[u16] {
        &self.planes[channel.index()]
    }

    /// Mutable samples of one channel. The plane length cannot change.
    pub fn plane_mut(&mut self, channel: Channel) -> &mut [u16] {
        &mut self.planes[channel.index()]
    }

    /// All planes with their channel, in interleave order.
    pub fn planes(&self) -> impl Iterator<Item = (Channel, &[u16])> {
        Channel::ALL
            .into_iter()
            .zip(self.planes.iter().map(Vec::as_slice))
    }

    /// All planes mutably, in interleave order.
    pub fn planes_mut(&mut self) -> impl Iterator<Item = (Channel, &mut [u16])> {
        Channel::ALL
            .into_iter()
            .zip(self.planes.iter_mut().map(Vec::as_mut_slice))
    }

    /// Write one RGBI pixel at a flat index.
    ///
    /// Returns `false` without writing if `index` is out of bounds.
    pub fn set_pixel(&mut self, index: usize, rgbi: [u16; 4]) -> bool {
        if index >= self.len() {
            return false;
        }
        for (plane, value) in self.planes.iter_mut().zip(rgbi) {
            if let Some(sample) = plane.get_mut(index) {
                *sample = value;
            }
        }
        true
    }

    /// RGBI pixel at a flat index.
    #[must_use]
    pub fn pixel(&self, index: usize) -> Option<[u16; 4]> {
        let [r, g, b, i] = &self.planes;
        Some([*r.get(index)?, *g.get(index)?, *b.get(index)?, *i.get(index)?])
    }

    /// Interleave the R, G and B planes into one RGB buffer.
    #[must_use]
    pub fn interleave_rgb(&self) -> Vec<u16> {
        let [r, g, b, _] = &self.planes;
        r.iter()
            .zip(g)
            .zip(b)
            .flat_map(|((r, g), b)| [*r, *g, *b])
            .collect()
    }

    fn check_invariant(&self) {
        debug_assert!(
            self.planes
                .iter()
                .all(|plane| plane.len() == pixel_count(self.width, self.height)),
            "image planes out of sync with {}x{}",
            self.width,
            self.height
        );
    }
}

fn pixel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_image_is_empty() {
        let image = ImageBuffer::new();
        assert_eq!(image.width(), 0);
        assert_eq!(image.height(), 0);
        assert!(image.is_empty());
        for (_, plane) in image.planes() {
            assert!(plane.is_empty());
        }
    }

    #[test]
    fn test_resize_zero_fills() {
        let mut image = ImageBuffer::with_size(2, 2);
        image.plane_mut(Channel::Green).fill(7);
        image.resize(3, 1);
        assert_eq!(image.len(), 3);
        assert!(image.plane(Channel::Green).iter().all(|&v| v == 0));
    }

    #[test]
    fn test_set_pixel_writes_all_planes() {
        let mut image = ImageBuffer::with_size(2, 1);
        assert!(image.set_pixel(1, [1, 2, 3, 4]));
        assert_eq!(image.plane(Channel::Red), &[0, 1]);
        assert_eq!(image.plane(Channel::Green), &[0, 2]);
        assert_eq!(image.plane(Channel::Blue), &[0, 3]);
        assert_eq!(image.plane(Channel::Infrared), &[0, 4]);
        assert_eq!(image.pixel(1), Some([1, 2, 3, 4]));
    }

    #[test]
    fn test_set_pixel_out_of_bounds() {
        let mut image = ImageBuffer::with_size(2, 1);
        assert!(!image.set_pixel(2, [1, 2, 3, 4]));
        assert_eq!(image.pixel(2), None);
    }

    #[test]
    fn test_from_planes_rejects_mismatched_lengths() {
        let planes = [vec![0; 4], vec![0; 4], vec![0; 3], vec![0; 4]];
        assert!(ImageBuffer::from_planes(2, 2, planes).is_none());
    }

    #[test]
    fn test_interleave_rgb() {
        let planes = [vec![1, 4], vec![2, 5], vec![3, 6], vec![9, 9]];
        let image = ImageBuffer::from_planes(2, 1, planes).expect("valid planes");
        assert_eq!(image.interleave_rgb(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_channel_order() {
        let indices: Vec<usize> = Channel::ALL.iter().map(|c| c.index()).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    proptest! {
        #[test]
        fn prop_resize_keeps_planes_equal(w in 0u32..64, h in 0u32..64, w2 in 0u32..64, h2 in 0u32..64) {
            let mut image = ImageBuffer::with_size(w, h);
            image.resize(w2, h2);
            let expected = (w2 * h2) as usize;
            for (_, plane) in image.planes() {
                prop_assert_eq!(plane.len(), expected);
            }
            prop_assert_eq!(image.width(), w2);
            prop_assert_eq!(image.height(), h2);
        }
    }
}

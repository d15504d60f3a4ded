//! Exposure calibration sweep.
//!
//! Scans every exposure step twice, first with the lamp on and then with it
//! off. RGB exposure rises by 280 per step from 3000, infrared by 372 from
//! 700.

use piescan_capture::settings::{PerChannel, ScanSettings};

/// Lamp states visited, in order. The device light option is four times this.
const LIGHTS: [i32; 2] = [1, 0];
/// Exposure steps per lamp state.
const STEPS: u32 = 26;

/// One scan of the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepStep {
    /// Lamp state used in file names (1 on, 0 off).
    pub light: i32,
    /// Exposure step, also the image index in file names.
    pub index: u32,
}

impl SweepStep {
    /// Per-channel exposure for this step.
    pub fn exposure(&self) -> PerChannel {
        let step = i32::try_from(self.index).unwrap_or(i32::MAX);
        let rgb = 3000 + 280 * step;
        PerChannel {
            r: rgb,
            g: rgb,
            b: rgb,
            i: 700 + 372 * step,
        }
    }

    /// `base` with this step's lamp and exposure applied and analog gain
    /// zeroed.
    pub fn settings(&self, base: &ScanSettings) -> ScanSettings {
        base.clone()
            .with_light(4 * self.light)
            .with_exposure(self.exposure())
            .with_gain(PerChannel::uniform(0))
    }
}

/// Ordered list of sweep steps.
#[derive(Debug, Clone)]
pub struct SweepPlan {
    steps: Vec<SweepStep>,
}

#[allow(clippy::len_without_is_empty)]
impl SweepPlan {
    /// The full lamp-on then lamp-off sweep.
    pub fn calibration() -> Self {
        let steps = LIGHTS
            .iter()
            .flat_map(|&light| (0..STEPS).map(move |index| SweepStep { light, index }))
            .collect();
        Self { steps }
    }

    /// Number of scans.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Steps in scan order.
    pub fn iter(&self) -> impl Iterator<Item = &SweepStep> {
        self.steps.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_visits_both_lamp_states() {
        let plan = SweepPlan::calibration();
        assert_eq!(plan.len(), 52);

        let steps: Vec<&SweepStep> = plan.iter().collect();
        assert_eq!(*steps[0], SweepStep { light: 1, index: 0 });
        assert_eq!(*steps[25], SweepStep { light: 1, index: 25 });
        assert_eq!(*steps[26], SweepStep { light: 0, index: 0 });
    }

    #[test]
    fn test_exposure_ramp() {
        let first = SweepStep { light: 1, index: 0 }.exposure();
        assert_eq!((first.r, first.g, first.b, first.i), (3000, 3000, 3000, 700));

        let last = SweepStep { light: 0, index: 25 }.exposure();
        assert_eq!((last.r, last.i), (10000, 10000));
    }

    #[test]
    fn test_step_settings() {
        let base = ScanSettings::default().with_resolution(7200);
        let settings = SweepStep { light: 1, index: 2 }.settings(&base);
        assert_eq!(settings.light, 4);
        assert_eq!(settings.resolution, 7200);
        assert_eq!(settings.exposure.r, 3560);
        assert_eq!(settings.exposure.i, 1444);
        assert_eq!(settings.gain, PerChannel::uniform(0));

        let off = SweepStep { light: 0, index: 2 }.settings(&base);
        assert_eq!(off.light, 0);
    }
}

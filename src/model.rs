use crate::sample::ControlVector;

/// Reference model of the counter's registered transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterModel {
    width: u32,
    mask: u64,
    count: u64,
}

pub(crate) fn width_mask(width: u32) -> u64 {
    if width >= u64::BITS {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

impl CounterModel {
    pub fn new(width: u32) -> Self {
        Self {
            width,
            mask: width_mask(width),
            count: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn mask(&self) -> u64 {
        self.mask
    }

    /// Count after the most recent `step`.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Applies one clock edge and returns the count from before it.
    ///
    /// Priority is strict: reset, then load, then enable.
    pub fn step(&mut self, rst: bool, load: bool, load_val: u64, en: bool) -> u64 {
        let current = self.count;
        if rst {
            self.count = 0;
        } else if load {
            self.count = load_val & self.mask;
        } else if en {
            self.count = self.count.wrapping_add(1) & self.mask;
        }
        current
    }

    pub fn step_with(&mut self, inputs: &ControlVector) -> u64 {
        self.step(inputs.reset, inputs.load, inputs.load_value, inputs.enable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_returns_prior_count() {
        let mut m = CounterModel::new(8);
        assert_eq!(m.step(false, true, 9, false), 0);
        assert_eq!(m.step(false, false, 0, true), 9);
        assert_eq!(m.count(), 10);
    }

    #[test]
    fn reset_beats_load_beats_enable() {
        let mut m = CounterModel::new(8);
        m.step(false, true, 50, false);
        m.step(true, true, 7, true);
        assert_eq!(m.count(), 0);
        m.step(false, true, 7, true);
        assert_eq!(m.count(), 7);
        m.step(false, false, 200, true);
        assert_eq!(m.count(), 8);
    }

    #[test]
    fn load_value_is_truncated() {
        let mut m = CounterModel::new(4);
        m.step(false, true, 0x1f3, false);
        assert_eq!(m.count(), 0x3);
    }

    #[test]
    fn wraps_at_mask() {
        let mut m = CounterModel::new(8);
        m.step(false, true, 255, false);
        m.step(false, false, 0, true);
        assert_eq!(m.count(), 0);
    }

    #[test]
    fn full_width_mask() {
        let mut m = CounterModel::new(64);
        assert_eq!(m.mask(), u64::MAX);
        m.step(false, true, u64::MAX, false);
        m.step(false, false, 0, true);
        assert_eq!(m.count(), 0);
    }

    #[test]
    fn hold_keeps_count() {
        let mut m = CounterModel::new(8);
        m.step(false, true, 33, false);
        for _ in 0..10 {
            m.step(false, false, 99, false);
        }
        assert_eq!(m.count(), 33);
    }
}

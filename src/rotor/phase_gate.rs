// Phase window gate
// Near each quarter-period boundary the chopped waveform is not a clean step
// (field fringing at the rotor edges); samples taken there are discarded.

use crate::config::DEADTIME_TICKS;

/// Decides whether a timestamp lies in the usable part of the rotor cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseWindowGate {
    /// Ticks discarded on each side of a quarter-period boundary
    deadtime: u32,
}

impl PhaseWindowGate {
    pub const fn new(deadtime: u32) -> Self {
        Self { deadtime }
    }

    pub fn deadtime(&self) -> u32 {
        self.deadtime
    }

    /// Check a sample timestamp against the last recorded period
    ///
    /// # Arguments
    /// * `last_period` - Full-cycle period [tick], 0 if none recorded yet
    /// * `timestamp` - Timer value at acquisition [tick] (timer restarts every period)
    ///
    /// # Returns
    /// `true` iff `deadtime < timestamp % (last_period / 4) < last_period / 4 - deadtime`
    #[inline]
    pub fn is_usable(&self, last_period: u32, timestamp: u32) -> bool {
        let quarter = last_period >> 2;
        if quarter == 0 {
            return false;
        }
        let phase = timestamp % quarter;
        phase > self.deadtime && phase < quarter.saturating_sub(self.deadtime)
    }
}

impl Default for PhaseWindowGate {
    fn default() -> Self {
        Self::new(DEADTIME_TICKS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unusable_without_period() {
        let gate = PhaseWindowGate::default();
        for t in [0, 1, 60_001, 1_000_000, u32::MAX] {
            assert!(!gate.is_usable(0, t));
        }
    }

    #[test]
    fn test_window_matches_definition() {
        let gate = PhaseWindowGate::new(10);
        for period in [4, 40, 100, 161, 1000] {
            let quarter = period / 4;
            for t in 0..(period * 2) {
                let phase = t % quarter;
                let expected = 10 < phase && phase + 10 < quarter;
                assert_eq!(gate.is_usable(period, t), expected, "period={} t={}", period, t);
            }
        }
    }

    #[test]
    fn test_window_boundaries() {
        let gate = PhaseWindowGate::new(10);
        // quarter = 100
        assert!(!gate.is_usable(400, 10));
        assert!(gate.is_usable(400, 11));
        assert!(gate.is_usable(400, 89));
        assert!(!gate.is_usable(400, 90));
        assert!(!gate.is_usable(400, 100));
        assert!(gate.is_usable(400, 111));
    }

    #[test]
    fn test_short_period_never_usable() {
        // Quarter shorter than twice the deadtime leaves no window
        let gate = PhaseWindowGate::new(10);
        for t in 0..100 {
            assert!(!gate.is_usable(80, t));
        }
    }

    #[test]
    fn test_default_deadtime_at_3600_rpm() {
        let gate = PhaseWindowGate::default();
        let period = 1_333_333;
        let quarter = period / 4;
        assert!(!gate.is_usable(period, 60_000));
        assert!(gate.is_usable(period, 60_001));
        assert!(gate.is_usable(period, quarter - 60_001));
        assert!(!gate.is_usable(period, quarter - 60_000));
    }
}

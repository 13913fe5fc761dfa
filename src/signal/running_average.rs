// Exponential running average of the demodulated signal

use crate::config::AVERAGE_WINDOW;

/// avg = (avg * (N - 1) + x) / N with N = AVERAGE_WINDOW
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RunningAverage {
    value: f32,
}

impl RunningAverage {
    pub const fn new() -> Self {
        Self { value: 0.0 }
    }

    /// Start from a known value instead of zero
    pub const fn with_value(value: f32) -> Self {
        Self { value }
    }

    /// Feed one demodulated reading
    #[inline]
    pub fn update(&mut self, reading: i32) -> f32 {
        self.value = (self.value * (AVERAGE_WINDOW - 1.0) + reading as f32) / AVERAGE_WINDOW;
        self.value
    }

    pub fn value(&self) -> f32 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_is_scaled() {
        let mut avg = RunningAverage::new();
        assert_eq!(avg.update(5000), 0.5);
        assert_eq!(avg.value(), 0.5);
    }

    #[test]
    fn test_converges_to_constant_input() {
        let mut avg = RunningAverage::new();
        for _ in 0..200_000 {
            avg.update(100);
        }
        assert!((avg.value() - 100.0).abs() < 0.1, "avg = {}", avg.value());
    }

    #[test]
    fn test_negative_input() {
        let mut avg = RunningAverage::with_value(-100.0);
        avg.update(-100);
        assert!((avg.value() + 100.0).abs() < 1e-3);
    }
}

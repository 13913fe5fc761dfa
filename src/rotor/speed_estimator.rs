// Rotor speed estimation from full-cycle periods
// Receives periods from the edge interrupt and publishes RPM + validity

use embassy_time::{with_timeout, Duration, TimeoutError};
use embedded_hal::digital::OutputPin;

use crate::config::{RECEIVE_TIMEOUT_MS, RPM_CONSTANT};
use crate::queues::PeriodQueue;
use crate::state::RotorPhaseState;

/// Convert a full-cycle period to RPM
///
/// # Returns
/// `None` for a zero period
#[inline]
pub fn rpm_from_period(period_ticks: u32) -> Option<u32> {
    if period_ticks == 0 {
        return None;
    }
    let rpm = RPM_CONSTANT / period_ticks as u64;
    Some(u32::try_from(rpm).unwrap_or(u32::MAX))
}

/// What a receive timeout did to the estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutAction {
    /// First missed window: marked invalid, RPM kept (grace cycle)
    Invalidated,
    /// Already invalid: RPM forced to zero
    Stopped,
}

/// Speed estimator task state
pub struct RotorSpeedEstimator<'a> {
    state: &'a RotorPhaseState,
    periods: &'a PeriodQueue,
}

impl<'a> RotorSpeedEstimator<'a> {
    pub fn new(state: &'a RotorPhaseState, periods: &'a PeriodQueue) -> Self {
        Self { state, periods }
    }

    /// Handle a received period
    pub fn on_period(&self, period_ticks: u32) -> Option<u32> {
        let Some(rpm) = rpm_from_period(period_ticks) else {
            warn!("Ignoring zero rotor period");
            return None;
        };
        self.state.set_speed(rpm, period_ticks);
        Some(rpm)
    }

    /// Handle a receive timeout (no period for RECEIVE_TIMEOUT_MS)
    pub fn on_timeout(&self) -> TimeoutAction {
        if self.state.speed_valid() {
            self.state.invalidate_speed();
            TimeoutAction::Invalidated
        } else {
            if self.state.rpm() != 0 {
                warn!("Rotor stopped (no edges for {} ms)", RECEIVE_TIMEOUT_MS);
            }
            self.state.clear_rpm();
            TimeoutAction::Stopped
        }
    }

    /// Handle one receive result and drive the sensor-valid indicator
    ///
    /// The indicator goes high on every usable period and low only once RPM
    /// has been zeroed. The first timeout leaves it as it was.
    pub fn on_receive(&self, received: Result<u32, TimeoutError>, valid_led: &mut impl OutputPin) {
        match received {
            Ok(period) => {
                if self.on_period(period).is_some() {
                    valid_led.set_high().ok();
                }
            }
            Err(_) => {
                if self.on_timeout() == TimeoutAction::Stopped {
                    valid_led.set_low().ok();
                }
            }
        }
    }

    /// Task loop
    ///
    /// # Arguments
    /// * `valid_led` - Indicator driven high while periods arrive, low once RPM is zeroed
    pub async fn run(&self, mut valid_led: impl OutputPin) {
        info!("Rotor speed estimator started");
        loop {
            let received = with_timeout(
                Duration::from_millis(RECEIVE_TIMEOUT_MS),
                self.periods.receive(),
            )
            .await;
            self.on_receive(received, &mut valid_led);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::fake::FakePin;
    use embassy_sync::channel::Channel;

    #[test]
    fn test_rpm_at_3600() {
        assert_eq!(RPM_CONSTANT, 4_800_000_000);
        assert_eq!(rpm_from_period(1_333_333), Some(3600));
    }

    #[test]
    fn test_rpm_exact_division_boundary() {
        // 4.8e9 / 1_333_334 = 3599.997 → truncates
        assert_eq!(rpm_from_period(1_333_334), Some(3599));
        // Exact quotient
        assert_eq!(rpm_from_period(1_000_000), Some(4800));
        assert_eq!(rpm_from_period(1_200_000), Some(4000));
    }

    #[test]
    fn test_rpm_extremes() {
        assert_eq!(rpm_from_period(0), None);
        assert_eq!(rpm_from_period(1), Some(u32::MAX));
        assert_eq!(rpm_from_period(u32::MAX), Some(1));
    }

    #[test]
    fn test_period_marks_valid() {
        let state = RotorPhaseState::new();
        let periods: PeriodQueue = Channel::new();
        let estimator = RotorSpeedEstimator::new(&state, &periods);

        assert_eq!(estimator.on_period(1_333_333), Some(3600));
        assert!(state.speed_valid());
        assert_eq!(state.rpm(), 3600);
        assert_eq!(state.estimated_period(), 1_333_333);

        assert_eq!(estimator.on_period(0), None);
        assert_eq!(state.rpm(), 3600);
    }

    #[test]
    fn test_timeout_grace_cycle() {
        let state = RotorPhaseState::new();
        let periods: PeriodQueue = Channel::new();
        let estimator = RotorSpeedEstimator::new(&state, &periods);
        estimator.on_period(1_333_333);

        // First timeout: invalid, RPM kept
        assert_eq!(estimator.on_timeout(), TimeoutAction::Invalidated);
        assert!(!state.speed_valid());
        assert_eq!(state.rpm(), 3600);

        // Second timeout: RPM zeroed
        assert_eq!(estimator.on_timeout(), TimeoutAction::Stopped);
        assert_eq!(state.rpm(), 0);

        // A new period restores validity
        estimator.on_period(1_000_000);
        assert!(state.speed_valid());
        assert_eq!(state.rpm(), 4800);
    }

    #[test]
    fn test_valid_led_follows_estimate() {
        let state = RotorPhaseState::new();
        let periods: PeriodQueue = Channel::new();
        let estimator = RotorSpeedEstimator::new(&state, &periods);
        let mut led = FakePin::default();

        estimator.on_receive(Ok(1_333_333), &mut led);
        assert!(led.high);
        assert_eq!(led.writes, 1);

        // Grace cycle: indicator untouched
        estimator.on_receive(Err(TimeoutError), &mut led);
        assert!(led.high);
        assert_eq!(led.writes, 1);
        assert_eq!(state.rpm(), 3600);

        // RPM zeroed: indicator off
        estimator.on_receive(Err(TimeoutError), &mut led);
        assert!(!led.high);
        assert_eq!(state.rpm(), 0);

        // Zero period is ignored and does not light the indicator
        estimator.on_receive(Ok(0), &mut led);
        assert!(!led.high);
        assert_eq!(led.writes, 2);
    }
}

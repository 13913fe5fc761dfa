// Motor speed controller
// Incremental PD loop on RPM error driving the chopper motor PWM duty

use embassy_time::{Duration, Ticker};

use crate::config::settings::MotorSettings;
use crate::config::{motor, CONTROL_PERIOD_MS};
use crate::hal::PwmOutput;
use crate::state::{MotorControlState, RotorPhaseState};

/// Motor speed controller with deadband and hard output clamp
///
/// The accumulated power is the PWM duty in percent. There is no integral
/// reset or anti-windup beyond the [0, 100] clamp.
pub struct MotorSpeedController {
    /// Target speed [RPM]
    target_rpm: u32,
    /// Proportional gain (per RPM of error, per tick)
    kp: f32,
    /// Derivative gain (per RPM of error change, per tick)
    kd: f32,
    /// Accumulated power [%], always within [MIN_POWER, MAX_POWER]
    power: f32,
    /// Error of the last non-zero update [RPM]
    last_error: i32,
}

impl MotorSpeedController {
    pub fn new(settings: MotorSettings) -> Self {
        Self {
            target_rpm: settings.target_rpm,
            kp: settings.kp,
            kd: settings.kd,
            power: motor::MIN_POWER,
            last_error: 0,
        }
    }

    /// Apply new settings
    ///
    /// # Returns
    /// `true` if anything changed
    pub fn apply_settings(&mut self, settings: MotorSettings) -> bool {
        if settings == self.settings() {
            return false;
        }
        self.target_rpm = settings.target_rpm;
        self.kp = settings.kp;
        self.kd = settings.kd;
        true
    }

    pub fn settings(&self) -> MotorSettings {
        MotorSettings {
            target_rpm: self.target_rpm,
            kp: self.kp,
            kd: self.kd,
        }
    }

    /// Get the accumulated power [%]
    pub fn power(&self) -> f32 {
        self.power
    }

    /// Get the last non-zero error [RPM]
    pub fn last_error(&self) -> i32 {
        self.last_error
    }

    /// One controller tick
    ///
    /// # Arguments
    /// * `speed_valid` - Rotor speed estimate is valid
    /// * `enabled` - Motor enable flag
    /// * `rpm` - Current rotor speed [RPM]
    ///
    /// # Returns
    /// New PWM duty [%], or `None` to leave the output unchanged
    pub fn update(&mut self, speed_valid: bool, enabled: bool, rpm: u32) -> Option<f32> {
        if !enabled {
            return Some(motor::DISABLED_DUTY);
        }

        if !speed_valid {
            // Stalled or not yet started: kick the rotor so edges appear
            return (rpm == 0).then_some(motor::STALL_DUTY);
        }

        let error = rpm_error(self.target_rpm, rpm);
        if error == 0 {
            return None;
        }

        self.power += error as f32 * self.kp + error.saturating_sub(self.last_error) as f32 * self.kd;
        self.last_error = error;

        if self.power < motor::MIN_POWER {
            self.power = motor::MIN_POWER;
        }
        if self.power >= motor::MAX_POWER {
            self.power = motor::MAX_POWER;
            warn!(
                "Motor power range exhausted! (100% ; error = {} rpm (is {} rpm))",
                error, rpm
            );
        } else if self.power > motor::POWER_WARNING {
            warn!("Motor is getting close to its power limit! ({}%)", self.power);
        }

        Some(self.power)
    }

    /// One task tick: pick up reloaded settings, then update
    ///
    /// # Returns
    /// New PWM duty [%], or `None` to leave the output unchanged
    pub fn tick(&mut self, rotor: &RotorPhaseState, control: &MotorControlState) -> Option<f32> {
        if self.apply_settings(control.settings()) {
            info!(
                "Motor settings updated: target={} rpm, Kp={}, Kd={}",
                self.target_rpm, self.kp, self.kd
            );
        }
        self.update(rotor.speed_valid(), control.enabled(), rotor.rpm())
    }

    /// Task loop (100ms tick)
    pub async fn run(
        &mut self,
        rotor: &RotorPhaseState,
        control: &MotorControlState,
        pwm: &mut impl PwmOutput,
    ) {
        info!(
            "Motor speed controller started: target={} rpm, Kp={}, Kd={}",
            self.target_rpm, self.kp, self.kd
        );
        pwm.set_duty_percent(motor::DISABLED_DUTY);

        let mut ticker = Ticker::every(Duration::from_millis(CONTROL_PERIOD_MS));
        loop {
            ticker.next().await;
            if let Some(duty) = self.tick(rotor, control) {
                pwm.set_duty_percent(duty);
            }
        }
    }
}

/// target - measured, with |error| < DEADBAND_RPM treated as zero
#[inline]
pub fn rpm_error(target_rpm: u32, rpm: u32) -> i32 {
    let error = (target_rpm as i64 - rpm as i64).clamp(i32::MIN as i64, i32::MAX as i64) as i32;
    if error.unsigned_abs() < motor::DEADBAND_RPM as u32 {
        0
    } else {
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::fake::FakePwm;

    fn controller() -> MotorSpeedController {
        MotorSpeedController::new(MotorSettings {
            target_rpm: 3600,
            kp: 0.001,
            kd: -0.001,
        })
    }

    #[test]
    fn test_deadband() {
        assert_eq!(rpm_error(3600, 3599), 0);
        assert_eq!(rpm_error(3600, 3601), 0);
        assert_eq!(rpm_error(3600, 3598), 2);
        assert_eq!(rpm_error(3600, 3602), -2);
        assert_eq!(rpm_error(0, u32::MAX), i32::MIN);
    }

    #[test]
    fn test_deadband_leaves_power_unchanged() {
        let mut ctrl = controller();
        ctrl.update(true, true, 3000);
        let power = ctrl.power();
        let last_error = ctrl.last_error();

        assert_eq!(ctrl.update(true, true, 3599), None);
        assert_eq!(ctrl.power(), power);
        assert_eq!(ctrl.last_error(), last_error);
    }

    #[test]
    fn test_pd_step() {
        let mut ctrl = MotorSpeedController::new(MotorSettings {
            target_rpm: 3600,
            kp: 0.01,
            kd: 0.005,
        });
        // error 600: 600*0.01 + 600*0.005 = 9
        let duty = ctrl.update(true, true, 3000).unwrap();
        assert!((duty - 9.0).abs() < 1e-4);
        // error 400: +4 + (-200)*0.005 = +3 → 12
        let duty = ctrl.update(true, true, 3200).unwrap();
        assert!((duty - 12.0).abs() < 1e-4);
        assert_eq!(ctrl.last_error(), 400);
    }

    #[test]
    fn test_power_clamped() {
        let mut ctrl = MotorSpeedController::new(MotorSettings {
            target_rpm: 3600,
            kp: 1.0,
            kd: 0.0,
        });
        assert_eq!(ctrl.update(true, true, 0), Some(100.0));
        assert_eq!(ctrl.update(true, true, 0), Some(100.0));
        assert_eq!(ctrl.update(true, true, 7200), Some(0.0));
        assert_eq!(ctrl.power(), 0.0);
    }

    #[test]
    fn test_invalid_speed_fallback() {
        let mut ctrl = controller();
        ctrl.update(true, true, 3000);
        let power = ctrl.power();

        // Grace cycle: speed invalid but RPM still known → output unchanged
        assert_eq!(ctrl.update(false, true, 3500), None);
        // Rotor stopped → start-up kick
        assert_eq!(ctrl.update(false, true, 0), Some(motor::STALL_DUTY));
        // Accumulated power is not reset
        assert_eq!(ctrl.power(), power);
    }

    #[test]
    fn test_disabled_cuts_output() {
        let mut ctrl = controller();
        assert_eq!(ctrl.update(true, false, 3000), Some(0.0));
        assert_eq!(ctrl.update(false, false, 0), Some(0.0));
        assert_eq!(ctrl.power(), 0.0);
    }

    #[test]
    fn test_apply_settings() {
        let mut ctrl = controller();
        assert!(!ctrl.apply_settings(ctrl.settings()));
        let settings = MotorSettings {
            target_rpm: 3000,
            kp: 0.002,
            kd: -0.002,
        };
        assert!(ctrl.apply_settings(settings));
        assert_eq!(ctrl.settings(), settings);
    }

    #[test]
    fn test_fake_pwm_receives_duty() {
        let mut ctrl = controller();
        let mut pwm = FakePwm::default();
        if let Some(duty) = ctrl.update(false, true, 0) {
            pwm.set_duty_percent(duty);
        }
        assert_eq!(pwm.duty, Some(50.0));
        assert_eq!(pwm.writes, 1);
    }

    #[test]
    fn test_tick_uses_reloaded_settings() {
        let rotor = RotorPhaseState::new();
        let control = MotorControlState::new();
        let mut ctrl = MotorSpeedController::new(control.settings());
        rotor.set_speed(3000, 1_600_000);

        // Reload lowers the target to the current speed: inside the deadband
        control.store(MotorSettings {
            target_rpm: 3000,
            kp: 0.01,
            kd: 0.0,
        });
        assert_eq!(ctrl.tick(&rotor, &control), None);
        assert_eq!(ctrl.settings(), control.settings());
        assert_eq!(ctrl.power(), motor::MIN_POWER);

        // error 100: 100*0.01 = 1
        control.store(MotorSettings {
            target_rpm: 3100,
            kp: 0.01,
            kd: 0.0,
        });
        let duty = ctrl.tick(&rotor, &control).unwrap();
        assert!((duty - 1.0).abs() < 1e-4);
        assert_eq!(ctrl.last_error(), 100);
    }

    #[test]
    fn test_tick_follows_enable_flag() {
        let rotor = RotorPhaseState::new();
        let control = MotorControlState::new();
        let mut ctrl = MotorSpeedController::new(control.settings());
        let mut pwm = FakePwm::default();

        // Not spinning yet: stall kick
        if let Some(duty) = ctrl.tick(&rotor, &control) {
            pwm.set_duty_percent(duty);
        }
        assert_eq!(pwm.duty, Some(motor::STALL_DUTY));

        control.set_enabled(false);
        if let Some(duty) = ctrl.tick(&rotor, &control) {
            pwm.set_duty_percent(duty);
        }
        assert_eq!(pwm.duty, Some(motor::DISABLED_DUTY));
        assert_eq!(pwm.writes, 2);
    }
}

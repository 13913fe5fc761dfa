//! モーター速度制御タスク
//!
//! 100ms周期でローター回転数を目標値に合わせ、TIM1_CH1 のデューティを更新します。

use embassy_stm32::{peripherals, timer::simple_pwm::SimplePwm};

use field_mill::hal::PwmOutput;

use crate::state::FIELD_MILL;

/// チョッパーモーター駆動PWM（TIM1_CH1）
pub struct MotorPwm {
    pwm: SimplePwm<'static, peripherals::TIM1>,
}

impl MotorPwm {
    pub fn new(mut pwm: SimplePwm<'static, peripherals::TIM1>) -> Self {
        let mut ch1 = pwm.ch1();
        ch1.set_duty_cycle_fully_off();
        ch1.enable();
        Self { pwm }
    }
}

impl PwmOutput for MotorPwm {
    fn set_duty_percent(&mut self, duty: f32) {
        let mut ch1 = self.pwm.ch1();
        let max = ch1.max_duty_cycle();
        let duty = duty.clamp(0.0, 100.0);
        ch1.set_duty_cycle((duty / 100.0 * max as f32) as _);
    }
}

/// モーター速度制御タスク
#[embassy_executor::task]
pub async fn motor_control_task(pwm: SimplePwm<'static, peripherals::TIM1>) {
    let mut pwm = MotorPwm::new(pwm);
    FIELD_MILL
        .motor_controller()
        .run(FIELD_MILL.rotor(), FIELD_MILL.motor_control(), &mut pwm)
        .await;
}

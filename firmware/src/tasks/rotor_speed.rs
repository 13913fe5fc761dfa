//! ローター速度推定タスク
//!
//! エッジ割り込みから届く周期をRPMに変換し、センサー有効LEDを駆動します。

use embassy_stm32::gpio::Output;

use crate::state::FIELD_MILL;

/// ローター速度推定タスク（LED: 周期受信でHigh、停止判定でLow）
#[embassy_executor::task]
pub async fn rotor_speed_task(valid_led: Output<'static>) {
    FIELD_MILL.speed_estimator().run(valid_led).await;
}

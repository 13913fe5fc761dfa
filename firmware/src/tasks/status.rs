//! 状態ログタスク
//!
//! 測定値スナップショットを1秒ごとにログ出力します。

use embassy_time::{Duration, Ticker};

use crate::config::STATUS_LOG_PERIOD_MS;
use crate::state::FIELD_MILL;

/// 状態ログタスク
#[embassy_executor::task]
pub async fn status_task() {
    let mut ticker = Ticker::every(Duration::from_millis(STATUS_LOG_PERIOD_MS));

    loop {
        ticker.next().await;

        let measurement = FIELD_MILL.measurement();
        let rotor = FIELD_MILL.rotor();
        info!(
            "field={} reading={} rpm={} (valid={}, period={} ticks)",
            measurement.measured_field,
            measurement.sensor_reading,
            measurement.motor_rpm,
            rotor.speed_valid(),
            rotor.estimated_period()
        );
        if !FIELD_MILL.calibration().is_calibrated() {
            warn!("Field mill is not calibrated");
        }
    }
}

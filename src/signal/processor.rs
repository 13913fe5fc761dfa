//! 信号処理タスク
//!
//! サンプルを同期復調し、移動平均を更新してキャリブレーションカーブで
//! 電界値に変換します。チョッパーは半回転ごとに信号の符号を反転させるため、
//! ローター位置ビットで符号を戻すと直流成分が得られます。

use embassy_time::{with_timeout, Duration};

use super::calibration::{CalibrationStore, CalibrationTable};
use super::running_average::RunningAverage;
use crate::config::{AVERAGE_LOG_INTERVAL, RECEIVE_TIMEOUT_MS};
use crate::queues::{Sample, SampleQueue};
use crate::state::MeasurementState;

/// 同期復調（ローター位置で符号を合わせる）
#[inline(always)]
pub fn demodulate(sample: &Sample) -> i32 {
    if sample.rotor_position {
        sample.value
    } else {
        -sample.value
    }
}

/// 信号処理タスク
pub struct SignalProcessor<'a> {
    measurement: &'a MeasurementState,
    calibration: &'a CalibrationStore,
    /// 変換用のローカルコピー（版数が変わったときだけ更新）
    table: CalibrationTable,
    table_version: u32,
    average: RunningAverage,
    log_counter: u16,
}

impl<'a> SignalProcessor<'a> {
    pub fn new(measurement: &'a MeasurementState, calibration: &'a CalibrationStore) -> Self {
        let (table, table_version) = calibration.snapshot();
        Self {
            measurement,
            calibration,
            table,
            table_version,
            // 再起動時も公開中の平均値から継続
            average: RunningAverage::with_value(measurement.average()),
            log_counter: 0,
        }
    }

    /// サンプル1つを処理
    ///
    /// # Returns
    /// 更新後の電界値
    pub fn process(&mut self, sample: &Sample) -> f32 {
        let reading = demodulate(sample);
        let average = self.average.update(reading);
        self.measurement.set_average(average);

        // 変換は整数に切り捨てた平均値で行う（生値の公開値と同じ）
        if self.calibration.refresh(&mut self.table, &mut self.table_version) {
            info!("signal processor using calibration v{}", self.table_version);
        }
        let field = self.table.lookup(average as i32);
        self.measurement.set_field(field);

        self.log_counter += 1;
        if self.log_counter >= AVERAGE_LOG_INTERVAL {
            self.log_counter = 0;
            info!("currAvg = {} -> field {}", average, field);
        }
        field
    }

    /// タスクループ
    pub async fn run(&mut self, samples: &SampleQueue) {
        info!("Signal processor task started");
        loop {
            match with_timeout(Duration::from_millis(RECEIVE_TIMEOUT_MS), samples.receive()).await {
                Ok(sample) => {
                    self.process(&sample);
                }
                Err(_) => {
                    warn!("No ADC samples for {} ms", RECEIVE_TIMEOUT_MS);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UNCALIBRATED_FIELD;
    use crate::signal::calibration::CalibrationTable;

    fn sample(value: i32, rotor_position: bool) -> Sample {
        Sample {
            value,
            rotor_position,
            timestamp: 0,
        }
    }

    #[test]
    fn test_demodulation_sign() {
        assert_eq!(demodulate(&sample(120, true)), 120);
        assert_eq!(demodulate(&sample(120, false)), -120);
        assert_eq!(demodulate(&sample(-120, false)), 120);
    }

    #[test]
    fn test_chopped_signal_recovers_dc() {
        let measurement = MeasurementState::new();
        let calibration = CalibrationStore::new();
        let mut processor = SignalProcessor::new(&measurement, &calibration);

        // Chopper inverts the signal every half revolution
        for i in 0..100_000 {
            let high = i % 2 == 0;
            processor.process(&sample(if high { 200 } else { -200 }, high));
        }
        assert!((measurement.average() - 200.0).abs() < 1.0);
    }

    #[test]
    fn test_first_sample_and_uncalibrated_field() {
        let measurement = MeasurementState::new();
        let calibration = CalibrationStore::new();
        let mut processor = SignalProcessor::new(&measurement, &calibration);

        let field = processor.process(&sample(10_000, true));
        assert_eq!(measurement.average(), 1.0);
        assert_eq!(field, UNCALIBRATED_FIELD);
        assert_eq!(measurement.field(), UNCALIBRATED_FIELD);
    }

    #[test]
    fn test_field_uses_truncated_average() {
        let measurement = MeasurementState::new();
        let calibration = CalibrationStore::new();
        calibration.install(CalibrationTable::from_pairs(&[(-10, -1.0), (10, 1.0)]).unwrap());
        let mut processor = SignalProcessor::new(&measurement, &calibration);

        // average 1.5 → lookup(1) = 0.1
        processor.process(&sample(15_000, true));
        assert_eq!(measurement.average(), 1.5);
        assert!((measurement.field() - 0.1).abs() < 1e-5);
    }

    #[test]
    fn test_reload_after_start_is_picked_up() {
        let measurement = MeasurementState::new();
        let calibration = CalibrationStore::new();
        let mut processor = SignalProcessor::new(&measurement, &calibration);

        assert_eq!(processor.process(&sample(20_000, true)), UNCALIBRATED_FIELD);

        calibration.install(CalibrationTable::from_pairs(&[(0, 0.0), (10, 1.0)]).unwrap());
        // average 2.0 + (20 - 2) / 10000 → truncated 2 → 0.2
        let field = processor.process(&sample(20, true));
        assert!((field - 0.2).abs() < 1e-5);
        assert_eq!(processor.table_version, 1);
    }
}

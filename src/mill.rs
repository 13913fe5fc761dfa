//! フィールドミル本体
//!
//! 共有状態・キュー・キャリブレーションテーブルをまとめて保持し、
//! 各タスク／割り込みハンドラが使うコンポーネントを組み立てます。
//! ファームウェア側では `static` に1つだけ置きます。

use serde::Serialize;

use crate::acquisition::{AdcAcquisition, SamplingTrigger};
use crate::config::settings::{ConfigStore, MillSettings};
use crate::hal::{AlarmTimer, SerialBus, Timer};
use crate::motor::MotorSpeedController;
use crate::queues::{PeriodQueue, SampleQueue, TriggerQueue};
use crate::rotor::{PhaseWindowGate, RotorPhaseTracker, RotorSpeedEstimator};
use crate::signal::{CalibrationError, CalibrationStore, CalibrationTable, SignalProcessor};
use crate::state::{MeasurementState, MotorControlState, RotorPhaseState};

use embassy_sync::channel::Channel;

/// 公開する測定値のスナップショット
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Measurement {
    /// 校正済み電界値（未校正時 -1）
    #[serde(rename = "measuredField")]
    pub measured_field: f32,
    /// 復調後の移動平均（整数に切り捨て）
    #[serde(rename = "sensorReading")]
    pub sensor_reading: i32,
    /// ローター回転数 [RPM]
    #[serde(rename = "motorRPM")]
    pub motor_rpm: u32,
}

/// フィールドミル
pub struct FieldMill {
    rotor: RotorPhaseState,
    periods: PeriodQueue,
    triggers: TriggerQueue,
    samples: SampleQueue,
    measurement: MeasurementState,
    calibration: CalibrationStore,
    motor: MotorControlState,
}

impl FieldMill {
    pub const fn new() -> Self {
        Self {
            rotor: RotorPhaseState::new(),
            periods: Channel::new(),
            triggers: Channel::new(),
            samples: Channel::new(),
            measurement: MeasurementState::new(),
            calibration: CalibrationStore::new(),
            motor: MotorControlState::new(),
        }
    }

    /// 起動時の初期化
    ///
    /// 設定とキャリブレーションテーブルを読み込みます。タスク起動前に呼ぶこと。
    ///
    /// # Returns
    /// 読み込んだ設定（サンプリングレート要求値はタイマー設定に使う）
    pub fn init(&self, store: &impl ConfigStore) -> MillSettings {
        info!("Field mill init");
        self.reload(store)
    }

    /// 設定とキャリブレーションテーブルを再読み込み
    ///
    /// 不正なキャリブレーションテーブルはログに残して無視します。
    pub fn reload(&self, store: &impl ConfigStore) -> MillSettings {
        let settings = self.reload_settings(store);
        if let Err(e) = self.load_calibration(store) {
            error!("Calibration table rejected: {}", e);
        }
        settings
    }

    /// 設定の再読み込み（モーター制御タスクは次の周期で反映）
    pub fn reload_settings(&self, store: &impl ConfigStore) -> MillSettings {
        let settings = MillSettings::load(store);
        self.motor.store(settings.motor);
        settings
    }

    /// キャリブレーションテーブルの再読み込み
    ///
    /// 不正なテーブルは拒否し、現在のテーブルをそのまま使い続けます。
    pub fn load_calibration(&self, store: &impl ConfigStore) -> Result<usize, CalibrationError> {
        let table = CalibrationTable::from_pairs(store.calibration_points())?;
        let points = table.len();
        if !table.is_calibrated() {
            warn!("Field mill is not calibrated ({} points)", points);
        }
        self.calibration.install(table);
        Ok(points)
    }

    // --- 公開値 ---

    /// 校正済み電界値（未校正時 -1）
    pub fn field(&self) -> f32 {
        self.measurement.field()
    }

    /// 移動平均の生値（整数に切り捨て）
    pub fn raw_reading(&self) -> i32 {
        self.measurement.average() as i32
    }

    /// ローター回転数 [RPM]
    pub fn motor_rpm(&self) -> u32 {
        self.rotor.rpm()
    }

    pub fn measurement(&self) -> Measurement {
        Measurement {
            measured_field: self.field(),
            sensor_reading: self.raw_reading(),
            motor_rpm: self.motor_rpm(),
        }
    }

    /// タイムスタンプがデッドタイム外か（現在の周期とデフォルトのデッドタイムで判定）
    pub fn is_usable(&self, timestamp: u32) -> bool {
        PhaseWindowGate::default().is_usable(self.rotor.last_period(), timestamp)
    }

    /// モーター有効/無効
    pub fn set_motor_enabled(&self, enabled: bool) {
        info!("Motor {}", if enabled { "enabled" } else { "disabled" });
        self.motor.set_enabled(enabled);
    }

    pub fn rotor(&self) -> &RotorPhaseState {
        &self.rotor
    }

    pub fn calibration(&self) -> &CalibrationStore {
        &self.calibration
    }

    // --- コンポーネント ---

    /// エッジ割り込み用
    pub fn phase_tracker<T: Timer>(&self, timer: T) -> RotorPhaseTracker<'_, T> {
        RotorPhaseTracker::new(&self.rotor, &self.periods, timer)
    }

    /// サンプリングアラーム割り込み用
    pub fn sampling_trigger<A: AlarmTimer>(&self, alarm: A) -> SamplingTrigger<'_, A> {
        SamplingTrigger::new(&self.triggers, alarm)
    }

    pub fn speed_estimator(&self) -> RotorSpeedEstimator<'_> {
        RotorSpeedEstimator::new(&self.rotor, &self.periods)
    }

    pub fn acquisition<T: Timer, B: SerialBus>(&self, timer: T, bus: B) -> AdcAcquisition<'_, T, B> {
        AdcAcquisition::new(&self.rotor, &self.samples, PhaseWindowGate::default(), timer, bus)
    }

    pub fn signal_processor(&self) -> SignalProcessor<'_> {
        SignalProcessor::new(&self.measurement, &self.calibration)
    }

    /// 現在の設定で速度制御器を作成
    pub fn motor_controller(&self) -> MotorSpeedController {
        MotorSpeedController::new(self.motor.settings())
    }

    pub fn motor_control(&self) -> &MotorControlState {
        &self.motor
    }

    pub fn triggers(&self) -> &TriggerQueue {
        &self.triggers
    }

    pub fn samples(&self) -> &SampleQueue {
        &self.samples
    }
}

impl Default for FieldMill {
    fn default() -> Self {
        Self::new()
    }
}

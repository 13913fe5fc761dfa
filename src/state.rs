//! 共有状態
//!
//! 割り込みとタスクの間で共有するスカラー値。各フィールドは書き込み側が
//! ただ1つ（割り込みハンドラ or 特定のタスク）に決まっており、読み出しは
//! すべてアトミック操作で行います。複数の値を組で読む必要があるモーター設定だけは
//! ブロッキングミューテックスで保護します。

use core::cell::Cell;
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use portable_atomic::AtomicF32;

use crate::config::settings::MotorSettings;
use crate::config::UNCALIBRATED_FIELD;

/// ローター位相・速度の状態
///
/// 書き込み元:
/// - エッジ割り込み: `position`, `last_period`, `last_edge`, `edge_count`
/// - 速度推定タスク: `speed_valid`, `rpm`, `estimated_period`
pub struct RotorPhaseState {
    position: AtomicBool,
    last_period: AtomicU32,
    last_edge: AtomicU32,
    edge_count: AtomicU8,
    speed_valid: AtomicBool,
    rpm: AtomicU32,
    estimated_period: AtomicU32,
}

impl RotorPhaseState {
    pub const fn new() -> Self {
        Self {
            position: AtomicBool::new(false),
            last_period: AtomicU32::new(0),
            last_edge: AtomicU32::new(0),
            edge_count: AtomicU8::new(0),
            speed_valid: AtomicBool::new(false),
            rpm: AtomicU32::new(0),
            estimated_period: AtomicU32::new(0),
        }
    }

    /// ローター位置ビット（インタラプタ入力レベル）
    #[inline(always)]
    pub fn position(&self) -> bool {
        self.position.load(Ordering::Relaxed)
    }

    /// 最後に記録した1周期の長さ [tick]（0 = 未記録）
    #[inline(always)]
    pub fn last_period(&self) -> u32 {
        self.last_period.load(Ordering::Acquire)
    }

    /// 最後に受理したエッジのタイマー値 [tick]
    #[inline(always)]
    pub fn last_edge(&self) -> u32 {
        self.last_edge.load(Ordering::Relaxed)
    }

    /// 周期内のエッジカウンタ（0-3）
    #[inline(always)]
    pub fn edge_count(&self) -> u8 {
        self.edge_count.load(Ordering::Relaxed)
    }

    /// 速度推定値が有効か
    #[inline(always)]
    pub fn speed_valid(&self) -> bool {
        self.speed_valid.load(Ordering::Acquire)
    }

    /// 最後に計算した回転数 [RPM]
    #[inline(always)]
    pub fn rpm(&self) -> u32 {
        self.rpm.load(Ordering::Acquire)
    }

    /// 速度推定タスクが最後に受け取った周期 [tick]
    #[inline(always)]
    pub fn estimated_period(&self) -> u32 {
        self.estimated_period.load(Ordering::Relaxed)
    }

    // --- エッジ割り込み側 ---

    #[inline(always)]
    pub(crate) fn set_position(&self, level: bool) {
        self.position.store(level, Ordering::Relaxed);
    }

    #[inline(always)]
    pub(crate) fn record_edge(&self, timestamp: u32, count: u8) {
        self.last_edge.store(timestamp, Ordering::Relaxed);
        self.edge_count.store(count, Ordering::Relaxed);
    }

    #[inline(always)]
    pub(crate) fn record_period(&self, period: u32) {
        self.edge_count.store(0, Ordering::Relaxed);
        self.last_edge.store(0, Ordering::Relaxed);
        self.last_period.store(period, Ordering::Release);
    }

    // --- 速度推定タスク側 ---

    pub(crate) fn set_speed(&self, rpm: u32, period: u32) {
        self.estimated_period.store(period, Ordering::Relaxed);
        self.rpm.store(rpm, Ordering::Release);
        self.speed_valid.store(true, Ordering::Release);
    }

    pub(crate) fn invalidate_speed(&self) {
        self.speed_valid.store(false, Ordering::Release);
    }

    pub(crate) fn clear_rpm(&self) {
        self.rpm.store(0, Ordering::Release);
    }
}

/// 測定値（信号処理タスクのみが書き込む）
pub struct MeasurementState {
    average: AtomicF32,
    field: AtomicF32,
}

impl MeasurementState {
    pub const fn new() -> Self {
        Self {
            average: AtomicF32::new(0.0),
            field: AtomicF32::new(UNCALIBRATED_FIELD),
        }
    }

    /// 復調後の移動平均（生値）
    #[inline(always)]
    pub fn average(&self) -> f32 {
        self.average.load(Ordering::Relaxed)
    }

    /// 校正済み電界値
    #[inline(always)]
    pub fn field(&self) -> f32 {
        self.field.load(Ordering::Relaxed)
    }

    pub(crate) fn set_average(&self, average: f32) {
        self.average.store(average, Ordering::Relaxed);
    }

    pub(crate) fn set_field(&self, field: f32) {
        self.field.store(field, Ordering::Relaxed);
    }
}

/// モーター制御の設定値（設定リロードで更新、制御タスクが毎周期読む）
///
/// 目標回転数とゲインは常に同じ版の組として読み書きする。
pub struct MotorControlState {
    settings: Mutex<CriticalSectionRawMutex, Cell<MotorSettings>>,
    enabled: AtomicBool,
}

impl MotorControlState {
    pub const fn new() -> Self {
        Self {
            settings: Mutex::new(Cell::new(MotorSettings::DEFAULT)),
            enabled: AtomicBool::new(true),
        }
    }

    pub fn settings(&self) -> MotorSettings {
        self.settings.lock(Cell::get)
    }

    pub fn store(&self, settings: MotorSettings) {
        self.settings.lock(|current| current.set(settings));
    }

    /// モーター有効/無効フラグ
    #[inline(always)]
    pub fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_rotor_state() {
        let state = RotorPhaseState::new();
        assert_eq!(state.last_period(), 0);
        assert!(!state.speed_valid());
        assert_eq!(state.rpm(), 0);
    }

    #[test]
    fn test_invalidate_keeps_rpm() {
        let state = RotorPhaseState::new();
        state.set_speed(3600, 1_333_333);
        state.invalidate_speed();
        assert!(!state.speed_valid());
        assert_eq!(state.rpm(), 3600);
        state.clear_rpm();
        assert_eq!(state.rpm(), 0);
    }

    #[test]
    fn test_motor_settings_roundtrip() {
        let state = MotorControlState::new();
        let settings = MotorSettings { target_rpm: 3000, kp: 0.5, kd: -0.25 };
        state.store(settings);
        assert_eq!(state.settings(), settings);
        assert!(state.enabled());
    }

    #[test]
    fn test_motor_settings_replaced_as_a_set() {
        let state = MotorControlState::new();
        assert_eq!(state.settings(), MotorSettings::default());

        let first = MotorSettings { target_rpm: 2400, kp: 0.01, kd: 0.0 };
        let second = MotorSettings { target_rpm: 4800, kp: 0.02, kd: -0.5 };
        for settings in [first, second, first] {
            state.store(settings);
            let read = state.settings();
            assert_eq!(read, settings);
        }
        // Enable flag is independent of the settings set
        state.set_enabled(false);
        assert_eq!(state.settings(), first);
        assert!(!state.enabled());
    }
}

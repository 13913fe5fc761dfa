//! 設定ストア
//!
//! ボードに焼き込む設定値とキャリブレーション点。値は文字列で保持し、
//! 型変換と検証はライブラリ側（`MillSettings::load`）で行います。

use field_mill::config::keys;
use field_mill::ConfigStore;

/// 設定値（キー, 値）
const SETTINGS: &[(&str, &str)] = &[
    (keys::TARGET_RPM, "3600"),
    (keys::TUNE_P, "0.001"),
    (keys::TUNE_D, "-0.001"),
    (keys::SAMPLING_RATE, "2400"),
];

/// キャリブレーション点（センサー生値, 印加電界 [V/m]）
///
/// 空のままなら未校正（電界値は -1）として動作します。
const CALIBRATION_POINTS: &[(i32, f32)] = &[];

/// フラッシュ上の定数テーブルを読む設定ストア
pub struct StoredConfig {
    settings: &'static [(&'static str, &'static str)],
    calibration: &'static [(i32, f32)],
}

impl StoredConfig {
    pub const fn new() -> Self {
        Self {
            settings: SETTINGS,
            calibration: CALIBRATION_POINTS,
        }
    }
}

impl ConfigStore for StoredConfig {
    fn get_setting(&self, key: &str) -> Option<&str> {
        self.settings
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
    }

    fn calibration_points(&self) -> &[(i32, f32)] {
        self.calibration
    }
}

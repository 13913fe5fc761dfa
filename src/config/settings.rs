//! ランタイム設定の読み込み
//!
//! 設定ストア（外部コンポーネント）から文字列で値を取り出し、型付きの
//! `MillSettings` に変換します。欠落・不正な値はデフォルトのまま残し、
//! ログに記録するだけでエラーにはしません。

use core::fmt;
use core::str::FromStr;

use super::params::{keys, motor, sampling};

/// 設定ストアのインターフェース
pub trait ConfigStore {
    /// キーに対応する設定値（文字列）を取得
    fn get_setting(&self, key: &str) -> Option<&str>;

    /// キャリブレーション点 (センサー値, 印加電界) のリスト
    fn calibration_points(&self) -> &[(i32, f32)];
}

/// 設定値の取得エラー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SettingError {
    /// キーが存在しない
    Missing,
    /// 値を解釈できない
    Invalid,
}

impl fmt::Display for SettingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingError::Missing => f.write_str("setting missing"),
            SettingError::Invalid => f.write_str("setting value invalid"),
        }
    }
}

/// 設定値を型付きで取得
pub fn parse_setting<T: FromStr, S: ConfigStore + ?Sized>(store: &S, key: &str) -> Result<T, SettingError> {
    let raw = store.get_setting(key).ok_or(SettingError::Missing)?;
    raw.trim().parse().map_err(|_| SettingError::Invalid)
}

/// 取得できなければデフォルト値を使う（理由はログに残す）
fn setting_or<T: FromStr + Copy>(store: &impl ConfigStore, key: &str, default: T) -> T {
    match parse_setting(store, key) {
        Ok(value) => {
            info!("setting {} loaded", key);
            value
        }
        Err(SettingError::Missing) => {
            info!("setting {} not found, using default", key);
            default
        }
        Err(SettingError::Invalid) => {
            warn!("setting {} has an invalid value, using default", key);
            default
        }
    }
}

/// モーター速度制御の設定
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorSettings {
    /// 目標回転数 [RPM]
    pub target_rpm: u32,
    /// 比例ゲイン
    pub kp: f32,
    /// 微分ゲイン
    pub kd: f32,
}

impl MotorSettings {
    pub const DEFAULT: Self = Self {
        target_rpm: motor::DEFAULT_TARGET_RPM,
        kp: motor::DEFAULT_KP,
        kd: motor::DEFAULT_KD,
    };
}

impl Default for MotorSettings {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// ストアから読み込んだ設定一式（キャリブレーション点を除く）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MillSettings {
    pub motor: MotorSettings,
    /// サンプリングレート要求値 [Hz]
    pub sampling_rate_hz: u32,
}

impl Default for MillSettings {
    fn default() -> Self {
        Self {
            motor: MotorSettings::default(),
            sampling_rate_hz: sampling::DEFAULT_RATE_HZ,
        }
    }
}

impl MillSettings {
    /// ストアから設定を読み込む
    pub fn load(store: &impl ConfigStore) -> Self {
        let defaults = Self::default();
        let settings = Self {
            motor: MotorSettings {
                target_rpm: setting_or(store, keys::TARGET_RPM, defaults.motor.target_rpm),
                kp: setting_or(store, keys::TUNE_P, defaults.motor.kp),
                kd: setting_or(store, keys::TUNE_D, defaults.motor.kd),
            },
            sampling_rate_hz: setting_or(store, keys::SAMPLING_RATE, defaults.sampling_rate_hz),
        };
        info!(
            "settings: target={} rpm, Kp={}, Kd={}, sampling={} Hz",
            settings.motor.target_rpm, settings.motor.kp, settings.motor.kd, settings.sampling_rate_hz
        );
        settings
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// テスト用の固定ストア
    pub struct TestStore {
        pub settings: &'static [(&'static str, &'static str)],
        pub points: &'static [(i32, f32)],
    }

    impl ConfigStore for TestStore {
        fn get_setting(&self, key: &str) -> Option<&str> {
            self.settings.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
        }

        fn calibration_points(&self) -> &[(i32, f32)] {
            self.points
        }
    }

    #[test]
    fn test_empty_store_uses_defaults() {
        let store = TestStore { settings: &[], points: &[] };
        assert_eq!(MillSettings::load(&store), MillSettings::default());
    }

    #[test]
    fn test_values_are_parsed() {
        let store = TestStore {
            settings: &[
                ("FM_targetRPM", "3000"),
                ("FM_motorTuneP", "0.002"),
                ("FM_motorTuneD", " -0.0005 "),
                ("FM_samplingRate", "500"),
            ],
            points: &[],
        };
        let settings = MillSettings::load(&store);
        assert_eq!(settings.motor.target_rpm, 3000);
        assert_eq!(settings.motor.kp, 0.002);
        assert_eq!(settings.motor.kd, -0.0005);
        assert_eq!(settings.sampling_rate_hz, 500);
    }

    #[test]
    fn test_invalid_value_keeps_default() {
        let store = TestStore {
            settings: &[("FM_targetRPM", "fast")],
            points: &[],
        };
        assert_eq!(
            parse_setting::<u32, _>(&store, "FM_targetRPM"),
            Err(SettingError::Invalid)
        );
        assert_eq!(parse_setting::<u32, _>(&store, "FM_motorTuneP"), Err(SettingError::Missing));
        assert_eq!(MillSettings::load(&store).motor.target_rpm, 3600);
    }
}

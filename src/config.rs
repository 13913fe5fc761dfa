//! Configuration module
//!
//! 固定パラメータ（タイマー由来の定数）と、設定ストアからの
//! ランタイム設定読み込みを提供します。

pub mod params;
pub mod settings;

// params.rsから主要な定数を再エクスポート
pub use params::*;

pub use settings::{parse_setting, ConfigStore, MillSettings, MotorSettings, SettingError};

//! グローバル共有状態
//!
//! 割り込みハンドラとタスクはすべてこの1つのフィールドミルを参照します。

use field_mill::FieldMill;

use crate::config::StoredConfig;

/// フィールドミル（状態・キュー・キャリブレーションテーブル）
pub static FIELD_MILL: FieldMill = FieldMill::new();

/// 設定ストア
pub static CONFIG_STORE: StoredConfig = StoredConfig::new();

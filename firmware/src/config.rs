//! Configuration module
//!
//! ボード固有のハードウェア設定と、設定ストアの実装を提供します。

pub mod params;
pub mod storage;

// params.rsから主要な定数を再エクスポート
pub use params::*;

pub use storage::StoredConfig;

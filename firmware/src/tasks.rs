//! タスクモジュール
//!
//! 各タスクの実装を分離して管理します。

pub mod acquisition;
pub mod motor_control;
pub mod rotor_speed;
pub mod signal;
pub mod status;

// タスク関数を再エクスポート
pub use acquisition::acquisition_task;
pub use motor_control::motor_control_task;
pub use rotor_speed::rotor_speed_task;
pub use signal::signal_task;
pub use status::status_task;

// Motor module
// Chopper motor speed regulation

pub mod speed_controller;

pub use speed_controller::{rpm_error, MotorSpeedController};

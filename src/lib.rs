//! Electrostatic field mill
//!
//! Rotor phase tracking, phase-gated acquisition, synchronous demodulation,
//! calibration mapping and chopper motor speed control. Hardware is reached
//! only through the traits in [`hal`]; the STM32G431 firmware lives in
//! `firmware/`.

#![cfg_attr(not(test), no_std)]

// ログマクロは他のモジュールより先に宣言
mod fmt;

pub mod acquisition;
pub mod config;
pub mod hal;
pub mod mill;
pub mod motor;
pub mod queues;
pub mod rotor;
pub mod signal;
pub mod state;

pub use config::{ConfigStore, MillSettings, MotorSettings};
pub use mill::{FieldMill, Measurement};

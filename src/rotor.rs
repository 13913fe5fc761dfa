// Rotor module
// Interrupter-based phase tracking, speed estimation and phase gating

pub mod phase_gate;
pub mod phase_tracker;
pub mod speed_estimator;

// Re-export main types for easier access
pub use phase_gate::PhaseWindowGate;
pub use phase_tracker::{EdgeEvent, RotorPhaseTracker};
pub use speed_estimator::{rpm_from_period, RotorSpeedEstimator, TimeoutAction};

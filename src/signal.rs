// Signal module
// Synchronous demodulation, running average and calibration mapping

pub mod calibration;
pub mod processor;
pub mod running_average;

pub use calibration::{CalibrationError, CalibrationPoint, CalibrationStore, CalibrationTable};
pub use processor::{demodulate, SignalProcessor};
pub use running_average::RunningAverage;

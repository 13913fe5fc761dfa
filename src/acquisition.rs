// Acquisition module
// Sampling trigger (timer interrupt) and phase-gated ADC reads

pub mod adc;
pub mod sampling_trigger;

pub use adc::{decode_frame, AcquireOutcome, AdcAcquisition};
pub use sampling_trigger::SamplingTrigger;

// Sampling trigger
// Timer alarm interrupt → trigger queue, at a fixed cadence

use crate::config::sampling;
use crate::hal::AlarmTimer;
use crate::queues::{post, TriggerQueue};

/// Periodic acquisition trigger driven by a hardware alarm
pub struct SamplingTrigger<'a, A: AlarmTimer> {
    triggers: &'a TriggerQueue,
    alarm: A,
}

impl<'a, A: AlarmTimer> SamplingTrigger<'a, A> {
    pub fn new(triggers: &'a TriggerQueue, alarm: A) -> Self {
        Self { triggers, alarm }
    }

    /// Configure the sampling cadence
    ///
    /// The requested rate is currently ignored and the alarm is always
    /// programmed for `sampling::PINNED_RATE_HZ`.
    ///
    /// # Returns
    /// Alarm period actually programmed [tick]
    pub fn set_sampling_rate(&mut self, requested_hz: u32) -> u32 {
        // TODO: honour requested_hz once the acquisition timing at other rates has been validated
        if requested_hz != sampling::PINNED_RATE_HZ {
            warn!(
                "Sampling rate {} Hz requested, using fixed {} Hz",
                requested_hz,
                sampling::PINNED_RATE_HZ
            );
        }
        let ticks = sampling::alarm_ticks(sampling::PINNED_RATE_HZ);
        info!("Sampling alarm target count = {}", ticks);
        self.alarm.set_alarm_ticks(ticks);
        ticks
    }

    /// Alarm interrupt body: re-arm and signal the acquisition task
    ///
    /// # Returns
    /// `false` if the trigger queue was full and the trigger was dropped
    #[inline(always)]
    pub fn on_alarm(&mut self) -> bool {
        self.alarm.rearm();
        post(self.triggers, ())
    }
}

//! Bounded hand-off queues between interrupt and task contexts
//!
//! Producers never block: a full queue drops the new value and the
//! producer carries on. Consumers wait with a liveness timeout.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use crate::config::QUEUE_CAPACITY;

/// One acquired converter reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sample {
    /// Sign-extended 13-bit reading
    pub value: i32,
    /// Rotor position bit at acquisition time
    pub rotor_position: bool,
    /// Free-running timer value at acquisition [tick]
    pub timestamp: u32,
}

pub type Queue<T> = Channel<CriticalSectionRawMutex, T, QUEUE_CAPACITY>;

/// Full-cycle rotor periods [tick] (edge interrupt → speed estimator)
pub type PeriodQueue = Queue<u32>;

/// Sampling alarms (timer interrupt → acquisition task)
pub type TriggerQueue = Queue<()>;

/// Gated samples (acquisition task → signal processor)
pub type SampleQueue = Queue<Sample>;

/// Non-blocking send. Returns `false` when the value was dropped.
#[inline(always)]
pub fn post<T>(queue: &Queue<T>, value: T) -> bool {
    queue.try_send(value).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_drops_newest() {
        let queue: PeriodQueue = Channel::new();
        for period in 0..10 {
            assert!(post(&queue, period));
        }
        assert_eq!(queue.len(), 10);

        // 11th value is dropped without blocking
        assert!(!post(&queue, 99));
        assert_eq!(queue.len(), 10);

        for expected in 0..10 {
            assert_eq!(queue.try_receive().ok(), Some(expected));
        }
        assert!(queue.try_receive().is_err());
    }

    #[test]
    fn test_trigger_queue_accepts_unit() {
        let queue: TriggerQueue = Channel::new();
        assert!(post(&queue, ()));
        assert_eq!(queue.len(), 1);
    }
}

// Rotor interrupter edge handling
// Runs in interrupt context on every edge: no allocation, no blocking, bounded time

use embedded_hal::digital::OutputPin;

use crate::config::{DEBOUNCE_SHIFT, EDGES_PER_PERIOD};
use crate::hal::Timer;
use crate::queues::{post, PeriodQueue};
use crate::state::RotorPhaseState;

/// Result of one interrupter edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeEvent {
    /// Edge arrived sooner than 1/16 of the last period (bounce / noise)
    Bounce,
    /// Edge counted, cycle not complete yet
    Counted(u8),
    /// Fourth edge: full period recorded; `queued` is false if the queue was full
    Period { ticks: u32, queued: bool },
}

/// Tracks rotor phase from interrupter edges and emits one period per 4 edges
///
/// Holds only references: all mutable state lives in `RotorPhaseState`
/// atomics, so the interrupt handler can build one on the fly.
pub struct RotorPhaseTracker<'a, T: Timer> {
    state: &'a RotorPhaseState,
    periods: &'a PeriodQueue,
    timer: T,
}

impl<'a, T: Timer> RotorPhaseTracker<'a, T> {
    pub fn new(state: &'a RotorPhaseState, periods: &'a PeriodQueue, timer: T) -> Self {
        Self {
            state,
            periods,
            timer,
        }
    }

    /// Handle one edge of the interrupter input
    ///
    /// # Arguments
    /// * `level` - Interrupter pin level sampled at the edge (rotor position bit)
    #[inline(always)]
    pub fn on_edge(&self, level: bool) -> EdgeEvent {
        // Position follows the pin even for rejected edges
        self.state.set_position(level);

        let now = self.timer.now();
        let elapsed = now.wrapping_sub(self.state.last_edge());

        // Debounce threshold scales with rotor speed (0 until the first period)
        if elapsed < (self.state.last_period() >> DEBOUNCE_SHIFT) {
            return EdgeEvent::Bounce;
        }

        let count = self.state.edge_count() + 1;
        if count < EDGES_PER_PERIOD {
            self.state.record_edge(now, count);
            return EdgeEvent::Counted(count);
        }

        // Full cycle: timer restarts so timestamps are phase within the cycle
        self.state.record_period(now);
        self.timer.reset();
        let queued = post(self.periods, now);
        EdgeEvent::Period { ticks: now, queued }
    }

    /// Same as [`on_edge`](Self::on_edge), echoing the position bit on a scope pin first
    #[inline(always)]
    pub fn on_edge_echo(&self, level: bool, position_pin: &mut impl OutputPin) -> EdgeEvent {
        position_pin.set_state(level.into()).ok();
        self.on_edge(level)
    }
}

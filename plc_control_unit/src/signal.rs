//! Edge detectors and tick timers.
//!
//! Every detector keeps the previous sample and must be updated exactly once
//! per scan; a detector that is skipped for a tick keeps its old sample.
//! Timers count scan ticks, not wall time.

/// False → true transition detector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RisingEdge {
    prev: bool,
}

impl RisingEdge {
    pub const fn new() -> Self {
        Self { prev: false }
    }

    /// Feed the current sample; true on a low→high transition.
    #[inline]
    pub fn update(&mut self, current: bool) -> bool {
        let rising = current && !self.prev;
        self.prev = current;
        rising
    }

    #[inline]
    pub const fn previous(&self) -> bool {
        self.prev
    }
}

/// True → false transition detector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FallingEdge {
    prev: bool,
}

impl FallingEdge {
    pub const fn new() -> Self {
        Self { prev: false }
    }

    /// Feed the current sample; true on a high→low transition.
    #[inline]
    pub fn update(&mut self, current: bool) -> bool {
        let falling = !current && self.prev;
        self.prev = current;
        falling
    }
}

/// Counts complete pulses: a rising edge followed by a falling edge.
///
/// A falling edge with no rising edge seen since the last count (for
/// example a signal already high at power-on) is not a pulse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PulseCounter {
    prev: bool,
    was_high: bool,
}

impl PulseCounter {
    pub const fn new() -> Self {
        Self {
            prev: false,
            was_high: false,
        }
    }

    /// Feed the current sample; true when a pulse completes.
    #[inline]
    pub fn update(&mut self, current: bool) -> bool {
        if current && !self.prev {
            self.was_high = true;
        }
        let completed = !current && self.prev && self.was_high;
        if completed {
            self.was_high = false;
        }
        self.prev = current;
        completed
    }
}

/// One-shot tick counter.
///
/// `start(n)` arms the timer; each `tick()` advances it and reports expiry
/// on the n-th tick after arming (the arming tick included when `tick()` is
/// called in the same scan). A threshold of 0 or 1 expires on the first
/// tick. Expiry disarms the timer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickTimer {
    elapsed: u32,
    threshold: u32,
    running: bool,
}

impl TickTimer {
    pub const fn new() -> Self {
        Self {
            elapsed: 0,
            threshold: 0,
            running: false,
        }
    }

    /// Arm (or re-arm) with a fresh count.
    #[inline]
    pub fn start(&mut self, threshold: u32) {
        self.elapsed = 0;
        self.threshold = threshold;
        self.running = true;
    }

    #[inline]
    pub fn stop(&mut self) {
        *self = Self::new();
    }

    /// Advance one tick. Returns true exactly once, on expiry.
    #[inline]
    pub fn tick(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.elapsed = self.elapsed.saturating_add(1);
        if self.elapsed >= self.threshold {
            self.stop();
            true
        } else {
            false
        }
    }

    #[inline]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    #[inline]
    pub const fn elapsed(&self) -> u32 {
        self.elapsed
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rising_edge_fires_once_per_transition() {
        let mut edge = RisingEdge::new();
        let fired: Vec<bool> = [false, true, true, false, true]
            .into_iter()
            .map(|s| edge.update(s))
            .collect();
        assert_eq!(fired, [false, true, false, false, true]);
    }

    #[test]
    fn falling_edge_ignores_initial_low() {
        let mut edge = FallingEdge::new();
        assert!(!edge.update(false));
        assert!(!edge.update(true));
        assert!(edge.update(false));
        assert!(!edge.update(false));
    }

    #[test]
    fn pulse_counter_needs_full_pulse() {
        let mut counter = PulseCounter::new();
        assert!(!counter.update(true));
        assert!(counter.update(false));
        assert!(!counter.update(false));
        assert!(!counter.update(true));
        assert!(!counter.update(true));
        assert!(counter.update(false));
    }

    #[test]
    fn timer_expires_on_nth_tick() {
        let mut timer = TickTimer::new();
        assert!(!timer.tick());
        timer.start(3);
        assert!(!timer.tick());
        assert!(!timer.tick());
        assert!(timer.tick());
        assert!(!timer.is_running());
        assert!(!timer.tick());
    }

    #[test]
    fn zero_threshold_expires_immediately() {
        let mut timer = TickTimer::new();
        timer.start(0);
        assert!(timer.tick());
    }

    #[test]
    fn restart_resets_count() {
        let mut timer = TickTimer::new();
        timer.start(2);
        timer.tick();
        timer.start(2);
        assert!(!timer.tick());
        assert!(timer.tick());
    }

    proptest! {
        #[test]
        fn rising_edges_match_transitions(samples in prop::collection::vec(any::<bool>(), 0..200)) {
            let mut edge = RisingEdge::new();
            let mut prev = false;
            for s in samples {
                prop_assert_eq!(edge.update(s), s && !prev);
                prev = s;
            }
        }

        #[test]
        fn pulses_never_exceed_rising_edges(samples in prop::collection::vec(any::<bool>(), 0..200)) {
            let mut pulses = PulseCounter::new();
            let mut edge = RisingEdge::new();
            let (mut p, mut r) = (0, 0);
            for s in samples {
                p += pulses.update(s) as u32;
                r += edge.update(s) as u32;
            }
            prop_assert!(p <= r && r <= p + 1);
        }
    }
}

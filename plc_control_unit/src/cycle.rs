//! Scan engine: image + logic + per-tick bookkeeping.
//!
//! The engine is synchronous and owns everything a tick touches. The caller
//! decides when ticks happen; the engine only guarantees that each tick is
//! atomic: either every block ran, or (after a panic) the image and the
//! logic are exactly as they were before the tick.

use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use plc_common::config::LogicTimings;
use plc_common::io::image::{ImageOp, ImageReply, IoImage};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::state::{LogicSnapshot, PlantLogic};

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-tick timing statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CycleStats {
    /// Ticks executed (faulted ticks included).
    pub cycle_count: u64,
    /// Last tick duration [ns].
    pub last_cycle_ns: u64,
    /// Minimum tick duration [ns].
    pub min_cycle_ns: u64,
    /// Maximum tick duration [ns].
    pub max_cycle_ns: u64,
    /// Running sum for average computation.
    pub sum_cycle_ns: u64,
    /// Ticks that took longer than the cycle budget.
    pub overruns: u64,
    /// Ticks rolled back after a panic.
    pub faults: u64,
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: u64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
            faults: 0,
        }
    }

    /// Record a tick duration. Returns true when it exceeded `budget_ns`.
    #[inline]
    pub fn record(&mut self, duration_ns: u64, budget_ns: u64) -> bool {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        self.min_cycle_ns = self.min_cycle_ns.min(duration_ns);
        self.max_cycle_ns = self.max_cycle_ns.max(duration_ns);
        self.sum_cycle_ns = self.sum_cycle_ns.saturating_add(duration_ns);
        let overrun = duration_ns > budget_ns;
        if overrun {
            self.overruns += 1;
        }
        overrun
    }

    /// Average tick time [ns] (0 if no ticks).
    #[inline]
    pub fn avg_cycle_ns(&self) -> u64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count
        }
    }
}

/// What happened during one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Completed,
    /// The tick panicked and was rolled back.
    Faulted(String),
}

// ─── Engine ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ScanEngine {
    image: IoImage,
    logic: PlantLogic,
    stats: CycleStats,
    budget: Duration,
}

impl ScanEngine {
    pub fn new(timings: &LogicTimings, budget: Duration) -> Self {
        Self {
            image: IoImage::new(),
            logic: PlantLogic::new(timings),
            stats: CycleStats::new(),
            budget,
        }
    }

    /// Run every logic block once.
    pub fn scan(&mut self) -> ScanOutcome {
        self.run_guarded(|logic, image| logic.scan(image))
    }

    /// Run `body` as one tick, rolling back on panic.
    pub(crate) fn run_guarded<F>(&mut self, body: F) -> ScanOutcome
    where
        F: FnOnce(&mut PlantLogic, &mut IoImage),
    {
        let checkpoint_image = self.image.clone();
        let checkpoint_logic = self.logic.clone();
        let started = Instant::now();

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            body(&mut self.logic, &mut self.image)
        }));

        let elapsed_ns = u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX);
        let budget_ns = u64::try_from(self.budget.as_nanos()).unwrap_or(u64::MAX);
        if self.stats.record(elapsed_ns, budget_ns)
            && (self.stats.overruns <= 10 || self.stats.overruns % 1000 == 0)
        {
            warn!(
                "Scan overrun #{}: tick took {}us (budget {}us)",
                self.stats.overruns,
                elapsed_ns / 1000,
                budget_ns / 1000
            );
        }
        if self.stats.cycle_count % 1000 == 0 {
            debug!(
                "Scan loop: {} ticks, avg={}us, max={}us, overruns={}",
                self.stats.cycle_count,
                self.stats.avg_cycle_ns() / 1000,
                self.stats.max_cycle_ns / 1000,
                self.stats.overruns
            );
        }

        match result {
            Ok(()) => ScanOutcome::Completed,
            Err(payload) => {
                self.image = checkpoint_image;
                self.logic = checkpoint_logic;
                self.stats.faults += 1;
                let message = panic_message(payload.as_ref());
                error!(faults = self.stats.faults, "Scan tick panicked, rolled back: {message}");
                ScanOutcome::Faulted(message)
            }
        }
    }

    /// Serve one image request between ticks.
    #[inline]
    pub fn apply(&mut self, op: &ImageOp) -> ImageReply {
        self.image.apply(op)
    }

    /// Zero the image and return every block to power-on state.
    pub fn reset(&mut self) {
        self.image.reset();
        self.logic.reset();
    }

    #[inline]
    pub fn image(&self) -> &IoImage {
        &self.image
    }

    #[inline]
    pub fn image_mut(&mut self) -> &mut IoImage {
        &mut self.image
    }

    #[inline]
    pub fn logic(&self) -> &PlantLogic {
        &self.logic
    }

    #[inline]
    pub fn snapshot(&self) -> LogicSnapshot {
        self.logic.snapshot()
    }

    #[inline]
    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    #[inline]
    pub fn budget(&self) -> Duration {
        self.budget
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

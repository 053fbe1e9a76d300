//! Sorting and batching lanes.
//!
//! Each lane pushes passing products into a box, counts them, and when the
//! box holds a full batch runs the roller to carry it off to the stacker. The
//! normal lane and the defect lane share this type; the defect lane adds a
//! sort-conveyor hold, a disposal gate and two indicator lights.

use plc_common::config::LogicTimings;
use plc_common::io::address::{CoilAddr, InputAddr, coil, input};
use plc_common::io::image::IoImage;
use serde::Serialize;
use tracing::{debug, info};

use crate::signal::{FallingEdge, PulseCounter, RisingEdge, TickTimer};

/// Addresses of one lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortingWiring {
    pub name: &'static str,
    /// Rising edge requests a fresh box.
    pub box_request: InputAddr,
    /// Falling edge starts the pusher.
    pub classifier: InputAddr,
    pub counter: InputAddr,
    pub pusher: CoilAddr,
    /// Lane conveyor, stopped while the pusher runs.
    pub lane_conveyor: CoilAddr,
    pub roller: CoilAddr,
    pub box_emitter: CoilAddr,
    /// Conveyor held for a while after each box request.
    pub sort_hold: Option<CoilAddr>,
    /// When high, products are not pushed and travel on to disposal.
    pub dispose_gate: Option<InputAddr>,
    pub rework_light: Option<CoilAddr>,
    pub disposal_light: Option<CoilAddr>,
}

pub const NORMAL_LANE: SortingWiring = SortingWiring {
    name: "normal",
    box_request: input::ERROR_DETECTED,
    classifier: input::NORMAL_SENSOR,
    counter: input::PROD_COUNTER,
    pusher: coil::NORMAL_PUSHER,
    lane_conveyor: coil::NORMAL_SORT,
    roller: coil::NORMAL_ROLLER,
    box_emitter: coil::BOX_EMITTER,
    sort_hold: None,
    dispose_gate: None,
    rework_light: None,
    disposal_light: None,
};

pub const DEFECT_LANE: SortingWiring = SortingWiring {
    name: "defect",
    box_request: input::ERROR_SORT_SENSOR,
    classifier: input::ERROR_CATE_SENSOR,
    counter: input::ERROR_COUNTER,
    pusher: coil::ERROR_PUSHER,
    lane_conveyor: coil::DEL_PCB,
    roller: coil::ERROR_ROLLER,
    box_emitter: coil::ERROR_BOX_EMITTER,
    sort_hold: Some(coil::SORT_CONVC),
    dispose_gate: Some(input::DEFECT_DISPOSE),
    rework_light: Some(coil::REPROCESSING),
    disposal_light: Some(coil::DISPOSED_LIGHT),
};

/// Lane durations in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortingTimings {
    pub pusher_ticks: u32,
    pub roller_ticks: u32,
    pub roller_delay_ticks: u32,
    pub sort_hold_ticks: u32,
    pub batch_size: u8,
}

/// Externally visible lane state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SortingStatus {
    pub count: u8,
    pub box_needed: bool,
    pub pusher_active: bool,
    pub roller_pending: bool,
    pub roller_active: bool,
    pub conveyor_held: bool,
    pub batches: u64,
}

#[derive(Debug, Clone)]
pub struct SortingLane {
    wiring: SortingWiring,
    timings: SortingTimings,

    box_request: RisingEdge,
    classifier: FallingEdge,
    counter: PulseCounter,

    pusher: TickTimer,
    roller_delay: TickTimer,
    roller: TickTimer,
    hold: TickTimer,

    count: u8,
    box_needed: bool,
    batches: u64,
}

impl SortingLane {
    pub fn new(wiring: SortingWiring, timings: SortingTimings) -> Self {
        Self {
            wiring,
            timings,
            box_request: RisingEdge::new(),
            classifier: FallingEdge::new(),
            counter: PulseCounter::new(),
            pusher: TickTimer::new(),
            roller_delay: TickTimer::new(),
            roller: TickTimer::new(),
            hold: TickTimer::new(),
            count: 0,
            box_needed: false,
            batches: 0,
        }
    }

    pub fn normal(t: &LogicTimings) -> Self {
        Self::new(
            NORMAL_LANE,
            SortingTimings {
                pusher_ticks: t.pusher_ticks,
                roller_ticks: t.roller_ticks,
                roller_delay_ticks: t.normal_roller_delay_ticks,
                sort_hold_ticks: 0,
                batch_size: t.batch_size,
            },
        )
    }

    pub fn defect(t: &LogicTimings) -> Self {
        Self::new(
            DEFECT_LANE,
            SortingTimings {
                pusher_ticks: t.pusher_ticks,
                roller_ticks: t.roller_ticks,
                roller_delay_ticks: t.defect_roller_delay_ticks,
                sort_hold_ticks: t.sort_hold_ticks,
                batch_size: t.batch_size,
            },
        )
    }

    pub fn scan(&mut self, image: &mut IoImage) {
        let w = self.wiring;

        if self.box_request.update(image.input(w.box_request)) {
            if w.sort_hold.is_some() {
                self.hold.start(self.timings.sort_hold_ticks);
            }
            if !self.roller.is_running() {
                self.box_needed = true;
            }
        }
        self.hold.tick();

        let classifier = image.input(w.classifier);
        let dispose = w.dispose_gate.is_some_and(|gate| image.input(gate));
        if self.classifier.update(classifier) {
            if dispose {
                debug!(lane = w.name, "Product routed to disposal");
            } else {
                self.pusher.start(self.timings.pusher_ticks);
            }
        }
        self.pusher.tick();

        if self.counter.update(image.input(w.counter)) {
            self.count = self.count.saturating_add(1);
            debug!(lane = w.name, count = self.count, batch = self.timings.batch_size, "Product boxed");
        }

        if self.count >= self.timings.batch_size
            && !self.roller.is_running()
            && !self.roller_delay.is_running()
        {
            self.count = 0;
            self.box_needed = false;
            self.batches += 1;
            self.roller_delay.start(self.timings.roller_delay_ticks);
            info!(lane = w.name, batches = self.batches, "Batch complete");
        }
        if self.roller_delay.tick() {
            self.roller.start(self.timings.roller_ticks);
        }
        self.roller.tick();

        let pushing = self.pusher.is_running();
        image.set_coil(w.pusher, pushing);
        image.set_coil(w.lane_conveyor, !pushing);
        image.set_coil(w.roller, self.roller.is_running());
        image.set_coil(w.box_emitter, self.box_needed && !self.roller.is_running());
        if let Some(hold) = w.sort_hold {
            image.set_coil(hold, !self.hold.is_running());
        }
        if let Some(light) = w.rework_light {
            image.set_coil(light, pushing);
        }
        if let Some(light) = w.disposal_light {
            image.set_coil(light, classifier && dispose);
        }
    }

    pub fn status(&self) -> SortingStatus {
        SortingStatus {
            count: self.count,
            box_needed: self.box_needed,
            pusher_active: self.pusher.is_running(),
            roller_pending: self.roller_delay.is_running(),
            roller_active: self.roller.is_running(),
            conveyor_held: self.hold.is_running(),
            batches: self.batches,
        }
    }

    #[inline]
    pub fn wiring(&self) -> &SortingWiring {
        &self.wiring
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

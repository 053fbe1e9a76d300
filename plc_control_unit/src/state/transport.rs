//! Transport line: raw conveyor, transfer center, clamp and exit conveyors.
//!
//! One type serves both the bases and the lids line; only the wiring
//! differs. The line parks a part at the entry, runs it through the
//! transfer center, clamps it at the exit and then reports itself ready
//! for assembly.

use plc_common::config::LogicTimings;
use plc_common::io::address::{CoilAddr, InputAddr, coil, input};
use plc_common::io::image::IoImage;
use serde::Serialize;
use tracing::debug;

use crate::signal::{RisingEdge, TickTimer};

/// Sensor and actuator addresses of one transport line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportWiring {
    pub name: &'static str,
    pub at_entry: InputAddr,
    pub at_exit: InputAddr,
    pub enter: InputAddr,
    pub clamped: InputAddr,
    pub center_start: CoilAddr,
    pub emitter: CoilAddr,
    pub raw_conveyor: CoilAddr,
    pub clamp: CoilAddr,
    pub exit_conveyors: [CoilAddr; 3],
    pub curved_exits: [CoilAddr; 2],
}

pub const BASES_LINE: TransportWiring = TransportWiring {
    name: "bases",
    at_entry: input::BASES_AT_ENTRY,
    at_exit: input::BASES_AT_EXIT,
    enter: input::BASES_ENTER,
    clamped: input::BASES_CLAMPED,
    center_start: coil::BASES_CENTER_START,
    emitter: coil::BASES_EMITTER,
    raw_conveyor: coil::BASES_RAW_CONV,
    clamp: coil::CLAMP_BASES,
    exit_conveyors: [
        coil::BASES_EXIT_CONV1,
        coil::BASES_EXIT_CONV2,
        coil::BASES_EXIT_CONV3,
    ],
    curved_exits: [coil::CURVED_EXIT_B, coil::CURVED_EXIT_B2],
};

pub const LIDS_LINE: TransportWiring = TransportWiring {
    name: "lids",
    at_entry: input::LIDS_AT_ENTRY,
    at_exit: input::LIDS_AT_EXIT,
    enter: input::LIDS_ENTER,
    clamped: input::LIDS_CLAMPED,
    center_start: coil::LIDS_CENTER_START,
    emitter: coil::LIDS_EMITTER,
    raw_conveyor: coil::LIDS_RAW_CONV,
    clamp: coil::CLAMP_LIDS,
    exit_conveyors: [
        coil::LIDS_EXIT_CONV1,
        coil::LIDS_EXIT_CONV2,
        coil::LIDS_EXIT_CONV3,
    ],
    curved_exits: [coil::CURVED_EXIT_L, coil::CURVED_EXIT_L2],
};

/// Externally visible flags of a line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransportStatus {
    pub center_busy: bool,
    pub raw_conveyor_stop: bool,
    pub waiting_at_entry: bool,
    pub clamp_active: bool,
    pub exit_conveyor_stop: bool,
    pub ready_for_assembly: bool,
}

/// One transport line.
#[derive(Debug, Clone)]
pub struct TransportLine {
    wiring: TransportWiring,
    clamp_delay_ticks: u32,

    at_entry: RisingEdge,
    at_exit: RisingEdge,
    center_start: RisingEdge,
    enter: RisingEdge,
    clamped: RisingEdge,
    clamp_delay: TickTimer,

    status: TransportStatus,
}

impl TransportLine {
    pub fn new(wiring: TransportWiring, clamp_delay_ticks: u32) -> Self {
        Self {
            wiring,
            clamp_delay_ticks,
            at_entry: RisingEdge::new(),
            at_exit: RisingEdge::new(),
            center_start: RisingEdge::new(),
            enter: RisingEdge::new(),
            clamped: RisingEdge::new(),
            clamp_delay: TickTimer::new(),
            status: TransportStatus::default(),
        }
    }

    pub fn bases(timings: &LogicTimings) -> Self {
        Self::new(BASES_LINE, timings.clamp_delay_ticks)
    }

    pub fn lids(timings: &LogicTimings) -> Self {
        Self::new(LIDS_LINE, timings.clamp_delay_ticks)
    }

    /// Run one scan of this line against the image.
    pub fn scan(&mut self, image: &mut IoImage) {
        let w = self.wiring;
        let s = &mut self.status;

        if self.at_entry.update(image.input(w.at_entry)) {
            s.raw_conveyor_stop = true;
            s.waiting_at_entry = true;
        }

        let center_start = s.center_busy || s.waiting_at_entry;
        if self.center_start.update(center_start) {
            s.center_busy = true;
            s.waiting_at_entry = false;
            debug!(line = w.name, "Part entering transfer center");
        }

        if self.at_exit.update(image.input(w.at_exit)) {
            s.center_busy = false;
            s.raw_conveyor_stop = false;
        }

        if self.enter.update(image.input(w.enter)) {
            self.clamp_delay.start(self.clamp_delay_ticks);
        }
        if self.clamp_delay.tick() {
            s.clamp_active = true;
        }

        if self.clamped.update(image.input(w.clamped)) {
            s.exit_conveyor_stop = true;
            s.ready_for_assembly = true;
            debug!(line = w.name, "Part clamped, ready for assembly");
        }

        image.set_coil(w.center_start, center_start);
        image.set_coil(w.emitter, !s.raw_conveyor_stop);
        image.set_coil(w.raw_conveyor, !s.raw_conveyor_stop);
        image.set_coil(w.clamp, s.clamp_active);
        image.set_coil(w.exit_conveyors[0], true);
        image.set_coil(w.exit_conveyors[1], true);
        image.set_coil(w.exit_conveyors[2], !s.exit_conveyor_stop);
        for curved in w.curved_exits {
            image.set_coil(curved, true);
        }
    }

    #[inline]
    pub fn status(&self) -> TransportStatus {
        self.status
    }

    #[inline]
    pub fn ready_for_assembly(&self) -> bool {
        self.status.ready_for_assembly
    }

    /// Clear the one-shot ready flag.
    #[inline]
    pub fn consume_ready(&mut self) {
        self.status.ready_for_assembly = false;
    }

    #[inline]
    pub fn release_clamp(&mut self) {
        self.status.clamp_active = false;
    }

    #[inline]
    pub fn resume_exit(&mut self) {
        self.status.exit_conveyor_stop = false;
    }

    #[inline]
    pub fn wiring(&self) -> &TransportWiring {
        &self.wiring
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

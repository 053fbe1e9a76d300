//! Palletizing stacker sequencer.
//!
//! A box arriving on the loading conveyor holds the conveyor and starts a
//! cycle: shift under the box, lift it, travel to the target slot, place it,
//! lower, then return home. The target slot advances after every cycle and
//! wraps after the last one.
//!
//! Travel completion is reported by the plant as a falling edge on the
//! moving-X / moving-Z sensors. Those edges are sampled only in the steps
//! that wait for them, and every wait is bounded by a timeout.

use bitflags::bitflags;
use plc_common::config::LogicTimings;
use plc_common::consts::{STACKER_HOME_POSITION, STACKER_SLOTS};
use plc_common::io::address::{CoilAddr, InputAddr, RegisterAddr, coil, input, register};
use plc_common::io::image::IoImage;
use serde::Serialize;
use tracing::{debug, info};

use crate::signal::{FallingEdge, RisingEdge, TickTimer};

bitflags! {
    /// Stacker fork drives.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StackerDrive: u8 {
        const RIGHT = 0b001;
        const LIFT  = 0b010;
        const LEFT  = 0b100;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[repr(u8)]
pub enum StackerStep {
    #[default]
    Idle = 0,
    ShiftRight = 1,
    Lift = 2,
    SetTarget = 3,
    AwaitTravelX = 4,
    AwaitTravelZ = 5,
    Place = 6,
    Lower = 7,
    SendHome = 8,
    AwaitHome = 9,
}

impl StackerStep {
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Idle),
            1 => Some(Self::ShiftRight),
            2 => Some(Self::Lift),
            3 => Some(Self::SetTarget),
            4 => Some(Self::AwaitTravelX),
            5 => Some(Self::AwaitTravelZ),
            6 => Some(Self::Place),
            7 => Some(Self::Lower),
            8 => Some(Self::SendHome),
            9 => Some(Self::AwaitHome),
            _ => None,
        }
    }

    pub const fn next(self) -> Self {
        match Self::from_u8(self as u8 + 1) {
            Some(step) => step,
            None => Self::Idle,
        }
    }

    /// Drives energized while in this step.
    pub const fn drive(self) -> StackerDrive {
        match self {
            Self::ShiftRight => StackerDrive::RIGHT,
            Self::Lift | Self::SetTarget | Self::AwaitTravelX | Self::AwaitTravelZ => {
                StackerDrive::LIFT
            }
            Self::Place => StackerDrive::LIFT.union(StackerDrive::LEFT),
            _ => StackerDrive::empty(),
        }
    }
}

/// Addresses of one stacker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackerWiring {
    pub name: &'static str,
    pub box_entry: InputAddr,
    pub moving_x: InputAddr,
    pub moving_z: InputAddr,
    pub right: CoilAddr,
    pub lift: CoilAddr,
    pub left: CoilAddr,
    pub loading_conveyor: CoilAddr,
    pub target: RegisterAddr,
}

pub const NORMAL_STACKER: StackerWiring = StackerWiring {
    name: "normal",
    box_entry: input::NORMAL_BOX,
    moving_x: input::STACKER_MOVING_X,
    moving_z: input::STACKER_MOVING_Z,
    right: coil::STACKER_RIGHT,
    lift: coil::STACKER_LIFT,
    left: coil::STACKER_LEFT,
    loading_conveyor: coil::LOADING_NORMAL,
    target: register::STACKER_TARGET_POS,
};

pub const ERROR_STACKER: StackerWiring = StackerWiring {
    name: "error",
    box_entry: input::ERROR_BOX,
    moving_x: input::ERROR_STACKER_MOVING_X,
    moving_z: input::ERROR_STACKER_MOVING_Z,
    right: coil::ERROR_STACKER_RIGHT,
    lift: coil::ERROR_STACKER_LIFT,
    left: coil::ERROR_STACKER_LEFT,
    loading_conveyor: coil::LOADING_ERROR,
    target: register::ERROR_STACKER_TARGET_POS,
};

/// Step durations in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackerTimings {
    pub shift_ticks: u32,
    pub lift_ticks: u32,
    pub travel_timeout_ticks: u32,
    pub place_ticks: u32,
    pub lower_ticks: u32,
    pub home_delay_ticks: u32,
    pub home_timeout_ticks: u32,
}

impl StackerTimings {
    fn for_step(&self, step: StackerStep) -> u32 {
        match step {
            StackerStep::Idle => 0,
            StackerStep::ShiftRight => self.shift_ticks,
            StackerStep::Lift => self.lift_ticks,
            StackerStep::SetTarget => 1,
            StackerStep::AwaitTravelX | StackerStep::AwaitTravelZ => self.travel_timeout_ticks,
            StackerStep::Place => self.place_ticks,
            StackerStep::Lower => self.lower_ticks,
            StackerStep::SendHome => self.home_delay_ticks,
            StackerStep::AwaitHome => self.home_timeout_ticks,
        }
    }
}

/// Externally visible stacker state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StackerStatus {
    pub step: StackerStep,
    pub busy: bool,
    pub target_position: u16,
    pub loading_hold: bool,
    pub cycles: u64,
}

#[derive(Debug, Clone)]
pub struct Stacker {
    wiring: StackerWiring,
    timings: StackerTimings,

    step: StackerStep,
    timer: TickTimer,
    busy: bool,
    target_position: u16,
    loading_hold: bool,
    cycles: u64,

    box_entry: RisingEdge,
    moving_x: FallingEdge,
    moving_z: FallingEdge,
}

impl Stacker {
    pub fn new(wiring: StackerWiring, timings: StackerTimings) -> Self {
        Self {
            wiring,
            timings,
            step: StackerStep::Idle,
            timer: TickTimer::new(),
            busy: false,
            target_position: 1,
            loading_hold: false,
            cycles: 0,
            box_entry: RisingEdge::new(),
            moving_x: FallingEdge::new(),
            moving_z: FallingEdge::new(),
        }
    }

    pub fn normal(t: &LogicTimings) -> Self {
        Self::new(NORMAL_STACKER, Self::timings(t, t.normal_shift_ticks, t.normal_lift_ticks))
    }

    pub fn error(t: &LogicTimings) -> Self {
        Self::new(ERROR_STACKER, Self::timings(t, t.error_shift_ticks, t.error_lift_ticks))
    }

    fn timings(t: &LogicTimings, shift_ticks: u32, lift_ticks: u32) -> StackerTimings {
        StackerTimings {
            shift_ticks,
            lift_ticks,
            travel_timeout_ticks: t.travel_timeout_ticks,
            place_ticks: t.place_ticks,
            lower_ticks: t.lower_ticks,
            home_delay_ticks: t.home_delay_ticks,
            home_timeout_ticks: t.home_timeout_ticks,
        }
    }

    pub fn scan(&mut self, image: &mut IoImage) {
        let w = self.wiring;

        if self.box_entry.update(image.input(w.box_entry)) {
            self.loading_hold = true;
            debug!(stacker = w.name, "Box at stacker");
        }

        if self.loading_hold && !self.busy && self.step == StackerStep::Idle {
            self.busy = true;
            self.enter(StackerStep::ShiftRight);
            info!(stacker = w.name, target = self.target_position, "Stacker cycle started");
        }

        match self.step {
            StackerStep::Lift => self.loading_hold = false,
            StackerStep::SetTarget => image.set_register(w.target, self.target_position),
            StackerStep::SendHome => image.set_register(w.target, STACKER_HOME_POSITION),
            _ => {}
        }

        let drive = self.step.drive();
        image.set_coil(w.right, drive.contains(StackerDrive::RIGHT));
        image.set_coil(w.lift, drive.contains(StackerDrive::LIFT));
        image.set_coil(w.left, drive.contains(StackerDrive::LEFT));

        let arrived = match self.step {
            StackerStep::AwaitTravelX | StackerStep::AwaitHome => {
                self.moving_x.update(image.input(w.moving_x))
            }
            StackerStep::AwaitTravelZ => self.moving_z.update(image.input(w.moving_z)),
            _ => false,
        };
        let expired = self.step != StackerStep::Idle && self.timer.tick();

        if arrived || expired {
            if self.step == StackerStep::AwaitHome {
                self.finish_cycle();
            } else {
                if expired && matches!(self.step, StackerStep::AwaitTravelX | StackerStep::AwaitTravelZ) {
                    debug!(stacker = w.name, step = ?self.step, "Travel wait timed out");
                }
                self.enter(self.step.next());
            }
        }

        image.set_coil(w.loading_conveyor, !self.loading_hold);
    }

    fn enter(&mut self, step: StackerStep) {
        self.step = step;
        self.timer.start(self.timings.for_step(step));
    }

    fn finish_cycle(&mut self) {
        self.target_position = if self.target_position >= STACKER_SLOTS {
            1
        } else {
            self.target_position + 1
        };
        self.busy = false;
        self.cycles += 1;
        self.step = StackerStep::Idle;
        self.timer.stop();
        info!(
            stacker = self.wiring.name,
            next_target = self.target_position,
            cycles = self.cycles,
            "Stacker cycle complete"
        );
    }

    pub fn status(&self) -> StackerStatus {
        StackerStatus {
            step: self.step,
            busy: self.busy,
            target_position: self.target_position,
            loading_hold: self.loading_hold,
            cycles: self.cycles,
        }
    }

    #[inline]
    pub fn wiring(&self) -> &StackerWiring {
        &self.wiring
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

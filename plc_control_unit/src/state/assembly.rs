//! Pick-and-place assembly sequencer.
//!
//! Waits for both transport lines to report a clamped part, then moves a lid
//! onto the base in ten timed steps. Steps only advance forward; the last
//! step drops back to `Idle`. There is no preemption once a cycle starts.

use bitflags::bitflags;
use plc_common::io::address::coil;
use plc_common::io::image::IoImage;
use serde::Serialize;
use tracing::{debug, info};

use super::transport::TransportLine;
use crate::signal::TickTimer;

bitflags! {
    /// Gripper actuators driven by the sequencer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Actuators: u8 {
        const MOVE_X     = 0b0001;
        const MOVE_Z     = 0b0010;
        const GRAB       = 0b0100;
        const POSITIONER = 0b1000;
    }
}

/// Side effect applied when a step is left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitAction {
    None,
    ReleaseLidsClamp,
    ReleaseBasesClamp,
}

/// Assembly step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[repr(u8)]
pub enum AssemblyStep {
    #[default]
    Idle = 0,
    LowerToLid = 1,
    GrabLid = 2,
    RaiseLid = 3,
    TraverseToBase = 4,
    LowerToBase = 5,
    ReleaseLid = 6,
    RaiseEmpty = 7,
    ReturnHome = 8,
    Eject = 9,
    Complete = 10,
}

/// Static description of one step.
#[derive(Debug, Clone, Copy)]
pub struct StepSpec {
    pub actuators: Actuators,
    pub ticks: u32,
    pub on_leave: ExitAction,
}

const fn spec(actuators: Actuators, ticks: u32, on_leave: ExitAction) -> StepSpec {
    StepSpec {
        actuators,
        ticks,
        on_leave,
    }
}

impl AssemblyStep {
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Idle),
            1 => Some(Self::LowerToLid),
            2 => Some(Self::GrabLid),
            3 => Some(Self::RaiseLid),
            4 => Some(Self::TraverseToBase),
            5 => Some(Self::LowerToBase),
            6 => Some(Self::ReleaseLid),
            7 => Some(Self::RaiseEmpty),
            8 => Some(Self::ReturnHome),
            9 => Some(Self::Eject),
            10 => Some(Self::Complete),
            _ => None,
        }
    }

    /// Step that follows this one; `Complete` wraps to `Idle`.
    pub const fn next(self) -> Self {
        match Self::from_u8(self as u8 + 1) {
            Some(step) => step,
            None => Self::Idle,
        }
    }

    /// Actuator set, hold time and exit action of this step.
    pub const fn spec(self) -> StepSpec {
        use Actuators as A;
        use ExitAction as E;
        match self {
            Self::Idle => spec(A::empty(), 0, E::None),
            Self::LowerToLid => spec(A::MOVE_Z, 5, E::None),
            Self::GrabLid => spec(A::MOVE_Z.union(A::GRAB), 7, E::ReleaseLidsClamp),
            Self::RaiseLid => spec(A::GRAB, 5, E::None),
            Self::TraverseToBase => spec(A::MOVE_X.union(A::GRAB), 12, E::None),
            Self::LowerToBase => spec(A::MOVE_X.union(A::MOVE_Z).union(A::GRAB), 7, E::None),
            Self::ReleaseLid => spec(A::MOVE_X.union(A::MOVE_Z), 5, E::ReleaseBasesClamp),
            Self::RaiseEmpty => spec(A::MOVE_X, 5, E::None),
            Self::ReturnHome => spec(A::empty(), 10, E::None),
            Self::Eject => spec(A::POSITIONER, 10, E::None),
            Self::Complete => spec(A::empty(), 1, E::None),
        }
    }
}

/// The sequencer.
#[derive(Debug, Clone, Default)]
pub struct AssemblySequencer {
    step: AssemblyStep,
    timer: TickTimer,
    actuators: Actuators,
    completed: u64,
}

impl AssemblySequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one scan. Consumes the ready flags of both lines on entry and
    /// drives their clamps and exit conveyors while assembling.
    pub fn scan(&mut self, bases: &mut TransportLine, lids: &mut TransportLine, image: &mut IoImage) {
        if self.step == AssemblyStep::Idle && bases.ready_for_assembly() && lids.ready_for_assembly() {
            bases.consume_ready();
            lids.consume_ready();
            self.enter(AssemblyStep::LowerToLid);
            info!("Assembly cycle started");
        }

        let spec = self.step.spec();
        self.actuators = spec.actuators;

        if self.step == AssemblyStep::Eject {
            bases.resume_exit();
            lids.resume_exit();
        }

        if self.step != AssemblyStep::Idle && self.timer.tick() {
            match spec.on_leave {
                ExitAction::None => {}
                ExitAction::ReleaseLidsClamp => lids.release_clamp(),
                ExitAction::ReleaseBasesClamp => bases.release_clamp(),
            }
            let next = self.step.next();
            if next == AssemblyStep::Idle {
                self.completed += 1;
                info!(completed = self.completed, "Assembly cycle complete");
            }
            self.enter(next);
        }

        image.set_coil(coil::GRAB, self.actuators.contains(Actuators::GRAB));
        image.set_coil(coil::MOVE_Z, self.actuators.contains(Actuators::MOVE_Z));
        image.set_coil(coil::MOVE_X, self.actuators.contains(Actuators::MOVE_X));
        image.set_coil(
            coil::BASES_RIGHT_POSITIONER,
            self.actuators.contains(Actuators::POSITIONER),
        );
    }

    fn enter(&mut self, step: AssemblyStep) {
        debug!(from = ?self.step, to = ?step, "Assembly step");
        self.step = step;
        match step {
            AssemblyStep::Idle => self.timer.stop(),
            _ => self.timer.start(step.spec().ticks),
        }
    }

    #[inline]
    pub fn step(&self) -> AssemblyStep {
        self.step
    }

    #[inline]
    pub fn actuators(&self) -> Actuators {
        self.actuators
    }

    /// Number of finished cycles since the last reset.
    #[inline]
    pub fn completed(&self) -> u64 {
        self.completed
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

//! Plant logic blocks and their aggregate.
//!
//! [`PlantLogic`] owns one instance of every block and runs them in the
//! fixed scan order: both transport lines, assembly, inspection, both
//! sorting lanes, both stackers, then the common conveyors.

pub mod assembly;
pub mod inspection;
pub mod sorting;
pub mod stacker;
pub mod transport;

use plc_common::config::LogicTimings;
use plc_common::io::address::coil;
use plc_common::io::image::IoImage;
use serde::Serialize;

use assembly::{AssemblySequencer, AssemblyStep};
use inspection::InspectionStation;
use sorting::{SortingLane, SortingStatus};
use stacker::{Stacker, StackerStatus};
use transport::{TransportLine, TransportStatus};

/// All control logic state.
#[derive(Debug, Clone)]
pub struct PlantLogic {
    timings: LogicTimings,
    pub bases: TransportLine,
    pub lids: TransportLine,
    pub assembly: AssemblySequencer,
    pub inspection: InspectionStation,
    pub normal_lane: SortingLane,
    pub defect_lane: SortingLane,
    pub normal_stacker: Stacker,
    pub error_stacker: Stacker,
}

impl PlantLogic {
    pub fn new(timings: &LogicTimings) -> Self {
        Self {
            timings: timings.clone(),
            bases: TransportLine::bases(timings),
            lids: TransportLine::lids(timings),
            assembly: AssemblySequencer::new(),
            inspection: InspectionStation::new(timings.inspection_timeout_ticks),
            normal_lane: SortingLane::normal(timings),
            defect_lane: SortingLane::defect(timings),
            normal_stacker: Stacker::normal(timings),
            error_stacker: Stacker::error(timings),
        }
    }

    /// One pass over every block.
    pub fn scan(&mut self, image: &mut IoImage) {
        self.bases.scan(image);
        self.lids.scan(image);
        self.assembly.scan(&mut self.bases, &mut self.lids, image);
        self.inspection.scan(image);
        self.normal_lane.scan(image);
        self.defect_lane.scan(image);
        self.normal_stacker.scan(image);
        self.error_stacker.scan(image);

        image.set_coil(coil::CURVED_CONVC, true);
    }

    /// Back to power-on state, keeping the configured timings.
    pub fn reset(&mut self) {
        *self = Self::new(&self.timings);
    }

    #[inline]
    pub fn timings(&self) -> &LogicTimings {
        &self.timings
    }

    pub fn snapshot(&self) -> LogicSnapshot {
        LogicSnapshot {
            bases: self.bases.status(),
            lids: self.lids.status(),
            assembly_step: self.assembly.step(),
            assemblies_completed: self.assembly.completed(),
            inspecting: self.inspection.inspecting(),
            last_result_normal: self.inspection.last_result_normal(),
            normal_lane: self.normal_lane.status(),
            defect_lane: self.defect_lane.status(),
            normal_stacker: self.normal_stacker.status(),
            error_stacker: self.error_stacker.status(),
        }
    }
}

/// Serializable view of the logic state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogicSnapshot {
    pub bases: TransportStatus,
    pub lids: TransportStatus,
    pub assembly_step: AssemblyStep,
    pub assemblies_completed: u64,
    pub inspecting: bool,
    pub last_result_normal: bool,
    pub normal_lane: SortingStatus,
    pub defect_lane: SortingStatus,
    pub normal_stacker: StackerStatus,
    pub error_stacker: StackerStatus,
}

impl LogicSnapshot {
    /// True when every block is at rest with nothing latched.
    pub fn is_cold(&self) -> bool {
        *self == PlantLogic::new(&LogicTimings::default()).snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_scan_drives_only_idle_outputs() {
        let mut logic = PlantLogic::new(&LogicTimings::default());
        let mut image = IoImage::new();
        logic.scan(&mut image);

        assert!(image.coil(coil::CURVED_CONVC));
        assert!(image.coil(coil::BASES_RAW_CONV));
        assert!(image.coil(coil::LIDS_RAW_CONV));
        assert!(image.coil(coil::CONV_WITH_SENSOR));
        assert!(image.coil(coil::SORT_CONVC));
        assert!(image.coil(coil::LOADING_NORMAL));
        assert!(image.coil(coil::LOADING_ERROR));
        assert!(!image.coil(coil::GRAB));
        assert!(!image.coil(coil::STACKER_RIGHT));
        assert!(image.registers().iter().all(|r| *r == 0));
    }

    #[test]
    fn reset_returns_to_cold_snapshot() {
        let mut logic = PlantLogic::new(&LogicTimings::default());
        let mut image = IoImage::new();
        image.set_input(plc_common::io::address::input::NORMAL_BOX, true);
        logic.scan(&mut image);
        assert!(!logic.snapshot().is_cold());

        logic.reset();
        assert!(logic.snapshot().is_cold());
    }
}

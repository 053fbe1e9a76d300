//! # PLC Control Unit Library
//!
//! Scan-cycle logic for the assembly / sorting / palletizing line. Pure and
//! synchronous: no I/O, no threads, no clocks other than tick counts. The
//! supervisor crate decides when a tick runs.
//!
//! ## Scan order
//!
//! 1. Transport (bases), Transport (lids)
//! 2. Assembly sequencer
//! 3. Inspection station
//! 4. Sorting (normal), Sorting (defect)
//! 5. Stacker (normal), Stacker (error)
//! 6. Common conveyors
//!
//! Edge detectors and timers live in [`signal`]; every block keeps its own.

pub mod cycle;
pub mod signal;
pub mod state;

pub use cycle::{CycleStats, ScanEngine, ScanOutcome};
pub use state::{LogicSnapshot, PlantLogic};

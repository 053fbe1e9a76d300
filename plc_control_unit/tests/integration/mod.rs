mod cold_start;
mod line_flow;
mod sorting_flow;
mod stacker_flow;

use std::time::Duration;

use plc_common::config::LogicTimings;
use plc_common::io::address::InputAddr;
use plc_control_unit::ScanEngine;

pub fn engine() -> ScanEngine {
    ScanEngine::new(&LogicTimings::default(), Duration::from_millis(50))
}

pub fn set(engine: &mut ScanEngine, addr: InputAddr, value: bool) {
    engine.image_mut().set_input(addr, value);
}

pub fn run(engine: &mut ScanEngine, ticks: u32) {
    for _ in 0..ticks {
        engine.scan();
    }
}

/// One high tick followed by one low tick.
pub fn pulse(engine: &mut ScanEngine, addr: InputAddr) {
    set(engine, addr, true);
    engine.scan();
    set(engine, addr, false);
    engine.scan();
}

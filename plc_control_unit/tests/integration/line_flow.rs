//! Transport lines feeding the assembly sequencer.

use plc_common::io::address::{coil, input};
use plc_control_unit::state::assembly::AssemblyStep;

use super::{engine, run, set};

#[test]
fn transfer_center_cycles_exactly_once() {
    let mut engine = engine();
    let mut busy = vec![false];
    let mut stop = vec![false];
    let mut record = |engine: &plc_control_unit::ScanEngine| {
        let s = engine.logic().bases.status();
        if busy.last() != Some(&s.center_busy) {
            busy.push(s.center_busy);
        }
        if stop.last() != Some(&s.raw_conveyor_stop) {
            stop.push(s.raw_conveyor_stop);
        }
    };

    engine.scan();
    record(&engine);
    set(&mut engine, input::BASES_AT_ENTRY, true);
    for _ in 0..3 {
        engine.scan();
        record(&engine);
    }
    assert!(engine.image().coil(coil::BASES_CENTER_START));
    assert!(!engine.image().coil(coil::BASES_EMITTER));

    set(&mut engine, input::BASES_AT_ENTRY, false);
    set(&mut engine, input::BASES_AT_EXIT, true);
    for _ in 0..3 {
        engine.scan();
        record(&engine);
    }
    set(&mut engine, input::BASES_AT_EXIT, false);
    for _ in 0..3 {
        engine.scan();
        record(&engine);
    }

    assert_eq!(busy, [false, true, false]);
    assert_eq!(stop, [false, true, false]);
    assert!(engine.image().coil(coil::BASES_EMITTER));
    assert!(!engine.image().coil(coil::BASES_CENTER_START));
}

#[test]
fn clamped_parts_are_assembled_in_67_ticks() {
    let mut engine = engine();
    set(&mut engine, input::BASES_ENTER, true);
    set(&mut engine, input::LIDS_ENTER, true);
    run(&mut engine, 10);
    assert!(engine.image().coil(coil::CLAMP_BASES));
    assert!(engine.image().coil(coil::CLAMP_LIDS));

    set(&mut engine, input::BASES_CLAMPED, true);
    set(&mut engine, input::LIDS_CLAMPED, true);
    engine.scan();
    assert_eq!(engine.logic().assembly.step(), AssemblyStep::LowerToLid);
    assert!(!engine.logic().bases.ready_for_assembly());
    assert!(!engine.image().coil(coil::BASES_EXIT_CONV3));
    assert!(!engine.image().coil(coil::LIDS_EXIT_CONV3));
    assert!(engine.image().coil(coil::MOVE_Z));

    run(&mut engine, 65);
    assert_eq!(engine.logic().assembly.step(), AssemblyStep::Complete);
    engine.scan();
    assert_eq!(engine.logic().assembly.step(), AssemblyStep::Idle);
    assert_eq!(engine.logic().assembly.completed(), 1);

    // Clamp and exit-conveyor coils follow on the next transport scan.
    engine.scan();
    assert!(!engine.image().coil(coil::CLAMP_BASES));
    assert!(!engine.image().coil(coil::CLAMP_LIDS));
    assert!(engine.image().coil(coil::BASES_EXIT_CONV3));
    assert!(engine.image().coil(coil::LIDS_EXIT_CONV3));
    assert!(!engine.image().coil(coil::BASES_RIGHT_POSITIONER));
    assert!(!engine.image().coil(coil::GRAB));
}

#[test]
fn single_line_never_starts_assembly() {
    let mut engine = engine();
    set(&mut engine, input::LIDS_CLAMPED, true);
    run(&mut engine, 200);
    assert_eq!(engine.logic().assembly.step(), AssemblyStep::Idle);
    assert!(engine.logic().lids.ready_for_assembly());
    assert!(!engine.image().coil(coil::MOVE_Z));
}

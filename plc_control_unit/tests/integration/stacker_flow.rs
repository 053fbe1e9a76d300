//! Both stackers cycling against simulated travel sensors.

use plc_common::io::address::{coil, input, register};
use plc_control_unit::state::stacker::StackerStep;

use super::{engine, run, set};

fn wait_for(engine: &mut plc_control_unit::ScanEngine, step: StackerStep) -> u32 {
    let mut ticks = 0;
    while engine.logic().normal_stacker.status().step != step {
        engine.scan();
        ticks += 1;
        assert!(ticks < 1000, "stacker never reached {step:?}");
    }
    ticks
}

#[test]
fn box_entry_runs_full_cycle_with_travel_edges() {
    let mut engine = engine();
    engine.scan();
    assert!(engine.image().coil(coil::LOADING_NORMAL));

    set(&mut engine, input::NORMAL_BOX, true);
    engine.scan();
    assert!(engine.image().coil(coil::STACKER_RIGHT));
    assert!(!engine.image().coil(coil::LOADING_NORMAL));

    wait_for(&mut engine, StackerStep::AwaitTravelX);
    assert_eq!(engine.image().register(register::STACKER_TARGET_POS), 1);
    assert!(engine.image().coil(coil::STACKER_LIFT));
    assert!(engine.image().coil(coil::LOADING_NORMAL));

    set(&mut engine, input::STACKER_MOVING_X, true);
    engine.scan();
    set(&mut engine, input::STACKER_MOVING_X, false);
    engine.scan();
    assert_eq!(engine.logic().normal_stacker.status().step, StackerStep::AwaitTravelZ);

    set(&mut engine, input::STACKER_MOVING_Z, true);
    engine.scan();
    set(&mut engine, input::STACKER_MOVING_Z, false);
    engine.scan();
    assert_eq!(engine.logic().normal_stacker.status().step, StackerStep::Place);

    wait_for(&mut engine, StackerStep::AwaitHome);
    assert_eq!(engine.image().register(register::STACKER_TARGET_POS), 99);

    set(&mut engine, input::STACKER_MOVING_X, true);
    engine.scan();
    set(&mut engine, input::STACKER_MOVING_X, false);
    engine.scan();

    let s = engine.logic().normal_stacker.status();
    assert_eq!(s.step, StackerStep::Idle);
    assert!(!s.busy);
    assert_eq!(s.target_position, 2);
}

#[test]
fn ten_cycles_wrap_to_first_slot() {
    let mut engine = engine();
    for _ in 0..10 {
        set(&mut engine, input::NORMAL_BOX, true);
        engine.scan();
        set(&mut engine, input::NORMAL_BOX, false);
        while engine.logic().normal_stacker.status().busy {
            engine.scan();
        }
    }
    let s = engine.logic().normal_stacker.status();
    assert_eq!(s.target_position, 1);
    assert_eq!(s.cycles, 10);
}

#[test]
fn stackers_run_independently() {
    let mut engine = engine();
    set(&mut engine, input::ERROR_BOX, true);
    run(&mut engine, 5);
    assert!(engine.logic().error_stacker.status().busy);
    assert!(!engine.logic().normal_stacker.status().busy);
    assert!(engine.image().coil(coil::ERROR_STACKER_RIGHT));
    assert!(!engine.image().coil(coil::STACKER_RIGHT));
    assert!(!engine.image().coil(coil::LOADING_ERROR));
    assert!(engine.image().coil(coil::LOADING_NORMAL));
}

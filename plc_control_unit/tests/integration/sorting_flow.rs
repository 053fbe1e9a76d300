//! Inspection verdicts and batching through both sorting lanes.

use plc_common::io::address::{coil, input};

use super::{engine, pulse, run, set};

#[test]
fn three_products_fill_a_normal_box() {
    let mut engine = engine();

    // Product at the camera requests a box.
    set(&mut engine, input::ERROR_DETECTED, true);
    engine.scan();
    assert!(engine.image().coil(coil::BOX_EMITTER));
    assert!(engine.image().coil(coil::INSPECTION_REQUEST));

    // Vision answers "normal".
    set(&mut engine, input::VISION_DONE, true);
    engine.scan();
    assert!(engine.image().coil(coil::NORMAL_LIGHT));
    assert!(engine.image().coil(coil::CONV_WITH_SENSOR));
    set(&mut engine, input::VISION_DONE, false);
    set(&mut engine, input::ERROR_DETECTED, false);
    engine.scan();

    for _ in 0..3 {
        pulse(&mut engine, input::PROD_COUNTER);
    }
    let lane = engine.logic().normal_lane.status();
    assert_eq!(lane.count, 0);
    assert!(!lane.box_needed);
    assert!(lane.roller_pending);
    assert!(!engine.image().coil(coil::BOX_EMITTER));

    run(&mut engine, 40);
    assert!(engine.image().coil(coil::NORMAL_ROLLER));

    // A new box request while the roller runs is ignored.
    pulse(&mut engine, input::ERROR_DETECTED);
    assert!(!engine.logic().normal_lane.status().box_needed);

    run(&mut engine, 170);
    assert!(!engine.image().coil(coil::NORMAL_ROLLER));
}

#[test]
fn defect_verdict_lights_red_and_counts() {
    let mut engine = engine();
    set(&mut engine, input::ERROR_DETECTED, true);
    engine.scan();
    set(&mut engine, input::VISION_DEFECT, true);
    set(&mut engine, input::VISION_DONE, true);
    engine.scan();

    assert!(engine.image().coil(coil::ERROR_LIGHT));
    assert!(!engine.image().coil(coil::NORMAL_LIGHT));
    assert!(!engine.image().coil(coil::DEFECTED_LIGHT));
    assert_eq!(engine.logic().inspection.counts(), (1, 1));
}

#[test]
fn defect_lane_rolls_without_delay() {
    let mut engine = engine();
    pulse(&mut engine, input::ERROR_SORT_SENSOR);
    assert!(engine.image().coil(coil::ERROR_BOX_EMITTER));
    assert!(!engine.image().coil(coil::SORT_CONVC));

    for _ in 0..3 {
        pulse(&mut engine, input::ERROR_COUNTER);
    }
    assert!(engine.image().coil(coil::ERROR_ROLLER));
    assert!(!engine.image().coil(coil::ERROR_BOX_EMITTER));

    // A fourth product during the roller is counted but does not re-arm it.
    pulse(&mut engine, input::ERROR_COUNTER);
    let lane = engine.logic().defect_lane.status();
    assert_eq!(lane.count, 1);
    assert_eq!(lane.batches, 1);
}

//! Stop/start semantics: a reset engine is indistinguishable from a new one.

use plc_common::io::address::input;

use super::{engine, run, set};

#[test]
fn reset_mid_cycle_matches_fresh_engine() {
    let mut used = engine();
    set(&mut used, input::NORMAL_BOX, true);
    set(&mut used, input::BASES_AT_ENTRY, true);
    set(&mut used, input::ERROR_DETECTED, true);
    run(&mut used, 30);
    assert!(!used.snapshot().is_cold());

    used.reset();
    assert!(used.image().is_zeroed());
    assert!(used.snapshot().is_cold());

    let mut fresh = engine();
    for e in [&mut used, &mut fresh] {
        set(e, input::NORMAL_BOX, true);
        set(e, input::LIDS_AT_ENTRY, true);
        run(e, 12);
    }
    assert_eq!(used.image(), fresh.image());
    assert_eq!(used.snapshot(), fresh.snapshot());
}

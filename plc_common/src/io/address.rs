//! Plant address map: symbolic names for every wired I/O slot.
//!
//! Three separate namespaces, one newtype each, so an input offset can never
//! be used to address a coil. Offsets are wire-compatible with the simulated
//! plant and must stay stable: each one is checked at compile time to be
//! inside the image and unique within its namespace.

use std::fmt;

use serde::{Deserialize, Serialize};
use static_assertions::const_assert;

use crate::consts::IMAGE_SIZE;

/// Offset into the input (sensor) array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InputAddr(pub u16);

/// Offset into the coil (actuator) array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CoilAddr(pub u16);

/// Offset into the holding-register array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegisterAddr(pub u16);

macro_rules! impl_addr {
    ($($ty:ident => $prefix:literal),* $(,)?) => {
        $(
            impl $ty {
                /// Array index of this slot.
                #[inline]
                pub const fn index(self) -> usize {
                    self.0 as usize
                }
            }

            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, concat!($prefix, "{}"), self.0)
                }
            }
        )*
    };
}

impl_addr!(InputAddr => "I", CoilAddr => "Q", RegisterAddr => "R");

/// Declares one address namespace: typed constants, a symbol table and the
/// compile-time bounds/uniqueness check.
macro_rules! address_map {
    (
        $(#[$meta:meta])*
        pub mod $ns:ident: $ty:ident {
            $( $(#[$doc:meta])* $name:ident = $offset:literal, )*
        }
    ) => {
        $(#[$meta])*
        pub mod $ns {
            use super::*;

            $( $(#[$doc])* pub const $name: $ty = $ty($offset); )*

            /// Every symbol in this namespace with its offset.
            pub const ALL: &[(&str, $ty)] = &[ $( (stringify!($name), $name), )* ];

            const OFFSETS: &[u16] = &[ $( $offset, )* ];

            const_assert!(offsets_valid(OFFSETS));

            /// Look up a slot by its symbolic name.
            pub fn by_name(name: &str) -> Option<$ty> {
                ALL.iter().find(|(n, _)| *n == name).map(|(_, addr)| *addr)
            }
        }
    };
}

/// True when every offset is inside the image and none repeats.
const fn offsets_valid(offsets: &[u16]) -> bool {
    let mut i = 0;
    while i < offsets.len() {
        if offsets[i] as usize >= IMAGE_SIZE {
            return false;
        }
        let mut j = i + 1;
        while j < offsets.len() {
            if offsets[i] == offsets[j] {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}

address_map! {
    /// Sensor signals written by the plant (and by the vision collaborator).
    pub mod input: InputAddr {
        // Lids transfer center
        LIDS_CENTER_BUSY = 0,
        LIDS_CENTER_ERROR = 1,
        LIDS_AT_ENTRY = 2,
        // Bases transfer center
        BASES_CENTER_BUSY = 3,
        BASES_CENTER_ERROR = 4,
        BASES_AT_ENTRY = 5,
        LIDS_AT_EXIT = 6,
        BASES_AT_EXIT = 7,
        ITEM_DETECTED = 14,
        BASES_CLAMPED = 18,
        LIDS_CLAMPED = 20,
        BASES_ENTER = 27,
        LIDS_ENTER = 28,
        /// Product present at the inspection camera.
        ERROR_DETECTED = 29,
        PROD_COUNTER = 34,
        NORMAL_SENSOR = 40,
        ERROR_SORT_SENSOR = 42,
        ERROR_CATE_SENSOR = 43,
        ERROR_COUNTER = 44,
        NORMAL_BOX = 47,
        ERROR_BOX = 48,
        ERROR_STACKER_MOVING_X = 54,
        ERROR_STACKER_MOVING_Z = 55,
        STACKER_MOVING_X = 56,
        STACKER_MOVING_Z = 57,
        /// Vision verdict level: true = defect detected.
        VISION_DEFECT = 60,
        /// Vision handshake: verdict is valid.
        VISION_DONE = 61,
        /// Classification: send defects to disposal instead of the rework box.
        DEFECT_DISPOSE = 62,
    }
}

address_map! {
    /// Actuator outputs written by the scan engine, read by the plant.
    pub mod coil: CoilAddr {
        LIDS_EMITTER = 4,
        LIDS_EXIT_CONV1 = 5,
        BASES_RIGHT_POSITIONER = 6,
        LIDS_CENTER_START = 8,
        BASES_CENTER_START = 9,
        BOX_EMITTER = 10,
        BASES_EMITTER = 11,
        BASES_EXIT_CONV1 = 12,
        LIDS_EXIT_CONV3 = 13,
        CURVED_EXIT_L = 14,
        BASES_EXIT_CONV2 = 15,
        LIDS_RAW_CONV = 16,
        BASES_RAW_CONV = 17,
        ERROR_BOX_EMITTER = 18,
        CURVED_EXIT_B2 = 19,
        CURVED_EXIT_B = 20,
        LIDS_EXIT_CONV2 = 21,
        BASES_EXIT_CONV3 = 22,
        CURVED_EXIT_L2 = 23,
        MOVE_Z = 24,
        MOVE_X = 25,
        GRAB = 26,
        /// Disposal conveyor of the defect lane.
        DEL_PCB = 30,
        NORMAL_PUSHER = 31,
        CLAMP_LIDS = 32,
        CLAMP_BASES = 33,
        /// Conveyor through the inspection camera.
        CONV_WITH_SENSOR = 35,
        CURVED_CONVC = 36,
        NORMAL_ROLLER = 37,
        LOADING_NORMAL = 38,
        SORT_CONVC = 39,
        NORMAL_SORT = 41,
        ERROR_PUSHER = 44,
        ERROR_ROLLER = 45,
        LOADING_ERROR = 46,
        ERROR_STACKER_LEFT = 49,
        ERROR_STACKER_LIFT = 50,
        ERROR_STACKER_RIGHT = 51,
        STACKER_LIFT = 52,
        STACKER_RIGHT = 53,
        STACKER_LEFT = 54,
        /// Inspection light: red (defect).
        ERROR_LIGHT = 55,
        /// Inspection light: green (normal).
        NORMAL_LIGHT = 56,
        /// Inspection light: yellow (inspecting).
        DEFECTED_LIGHT = 57,
        DISPOSED_LIGHT = 58,
        REPROCESSING = 59,
        /// Vision handshake: a verdict is requested.
        INSPECTION_REQUEST = 60,
    }
}

address_map! {
    /// 16-bit values written by the scan engine.
    pub mod register: RegisterAddr {
        ERROR_STACKER_TARGET_POS = 0,
        STACKER_TARGET_POS = 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn published_offsets_match_plant_wiring() {
        assert_eq!(input::BASES_AT_ENTRY, InputAddr(5));
        assert_eq!(input::BASES_AT_EXIT, InputAddr(7));
        assert_eq!(input::BASES_CLAMPED, InputAddr(18));
        assert_eq!(input::BASES_ENTER, InputAddr(27));
        assert_eq!(input::LIDS_AT_ENTRY, InputAddr(2));
        assert_eq!(input::LIDS_AT_EXIT, InputAddr(6));
        assert_eq!(input::LIDS_CLAMPED, InputAddr(20));
        assert_eq!(input::LIDS_ENTER, InputAddr(28));
        assert_eq!(input::ERROR_DETECTED, InputAddr(29));
        assert_eq!(input::NORMAL_SENSOR, InputAddr(40));
        assert_eq!(input::PROD_COUNTER, InputAddr(34));
        assert_eq!(coil::CLAMP_BASES, CoilAddr(33));
        assert_eq!(coil::CLAMP_LIDS, CoilAddr(32));
        assert_eq!(coil::GRAB, CoilAddr(26));
        assert_eq!(coil::MOVE_X, CoilAddr(25));
        assert_eq!(coil::MOVE_Z, CoilAddr(24));
        assert_eq!(register::STACKER_TARGET_POS, RegisterAddr(1));
        assert_eq!(register::ERROR_STACKER_TARGET_POS, RegisterAddr(0));
    }

    #[test]
    fn names_are_unique_per_namespace() {
        let names: HashSet<_> = input::ALL.iter().map(|(n, _)| *n).collect();
        assert_eq!(names.len(), input::ALL.len());
        let names: HashSet<_> = coil::ALL.iter().map(|(n, _)| *n).collect();
        assert_eq!(names.len(), coil::ALL.len());
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(input::by_name("STACKER_MOVING_X"), Some(InputAddr(56)));
        assert_eq!(coil::by_name("STACKER_LEFT"), Some(CoilAddr(54)));
        assert_eq!(register::by_name("NOPE"), None);
    }

    #[test]
    fn offsets_valid_rejects_duplicates_and_overflow() {
        assert!(offsets_valid(&[0, 1, 2]));
        assert!(!offsets_valid(&[3, 4, 3]));
        assert!(!offsets_valid(&[IMAGE_SIZE as u16]));
    }

    #[test]
    fn display_uses_namespace_prefix() {
        assert_eq!(input::BASES_AT_ENTRY.to_string(), "I5");
        assert_eq!(coil::GRAB.to_string(), "Q26");
        assert_eq!(register::STACKER_TARGET_POS.to_string(), "R1");
    }
}

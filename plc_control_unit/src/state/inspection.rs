//! Inspection station in front of the camera.
//!
//! A product arriving on the camera sensor holds the inspection conveyor and
//! raises the inspection request coil. The vision collaborator answers by
//! setting `VISION_DEFECT` and pulsing `VISION_DONE`. Without an answer the
//! product is released as normal after the timeout.

use plc_common::io::address::{coil, input};
use plc_common::io::image::IoImage;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::signal::{RisingEdge, TickTimer};

/// Indicator lights and handshake coil as seen by the collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InspectionLights {
    pub green: bool,
    pub yellow: bool,
    pub red: bool,
    pub request: bool,
}

impl InspectionLights {
    pub fn from_image(image: &IoImage) -> Self {
        Self {
            green: image.coil(coil::NORMAL_LIGHT),
            yellow: image.coil(coil::DEFECTED_LIGHT),
            red: image.coil(coil::ERROR_LIGHT),
            request: image.coil(coil::INSPECTION_REQUEST),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InspectionStation {
    timeout_ticks: u32,
    arrival: RisingEdge,
    verdict: RisingEdge,
    timeout: TickTimer,
    inspecting: bool,
    last_result_normal: bool,
    conveyor_hold: bool,
    inspected: u64,
    defects: u64,
}

impl InspectionStation {
    pub fn new(timeout_ticks: u32) -> Self {
        Self {
            timeout_ticks,
            arrival: RisingEdge::new(),
            verdict: RisingEdge::new(),
            timeout: TickTimer::new(),
            inspecting: false,
            last_result_normal: true,
            conveyor_hold: false,
            inspected: 0,
            defects: 0,
        }
    }

    pub fn scan(&mut self, image: &mut IoImage) {
        let present = image.input(input::ERROR_DETECTED);
        if self.arrival.update(present) {
            self.inspecting = true;
            self.conveyor_hold = true;
            self.timeout.start(self.timeout_ticks);
            debug!("Product at inspection camera");
        }

        let verdict = self.verdict.update(image.input(input::VISION_DONE));
        if self.inspecting {
            if verdict {
                let normal = !image.input(input::VISION_DEFECT);
                self.finish(normal);
                info!(normal, "Inspection verdict received");
            } else if self.timeout.tick() {
                warn!(
                    timeout_ticks = self.timeout_ticks,
                    "No inspection verdict, releasing product as normal"
                );
                self.finish(true);
            }
        }

        let (yellow, green, red) = if present {
            (
                self.inspecting,
                !self.inspecting && self.last_result_normal,
                !self.inspecting && !self.last_result_normal,
            )
        } else {
            (false, false, false)
        };
        image.set_coil(coil::DEFECTED_LIGHT, yellow);
        image.set_coil(coil::NORMAL_LIGHT, green);
        image.set_coil(coil::ERROR_LIGHT, red);
        image.set_coil(coil::CONV_WITH_SENSOR, !self.conveyor_hold);
        image.set_coil(coil::INSPECTION_REQUEST, self.inspecting);
    }

    fn finish(&mut self, normal: bool) {
        self.inspecting = false;
        self.conveyor_hold = false;
        self.last_result_normal = normal;
        self.timeout.stop();
        self.inspected += 1;
        if !normal {
            self.defects += 1;
        }
    }

    #[inline]
    pub fn inspecting(&self) -> bool {
        self.inspecting
    }

    #[inline]
    pub fn last_result_normal(&self) -> bool {
        self.last_result_normal
    }

    /// Products inspected and how many of them were defective.
    #[inline]
    pub fn counts(&self) -> (u64, u64) {
        (self.inspected, self.defects)
    }
}

//! Vision collaborator bridge.
//!
//! The scan logic only knows the handshake bits: it raises the inspection
//! request coil when a product reaches the camera and waits for
//! `VISION_DONE`. This module runs the other side of that handshake for any
//! [`DefectClassifier`].

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

use crate::error::RuntimeError;
use crate::runtime::ControlHandle;

/// Default poll period for the request coil.
pub const DEFAULT_POLL: Duration = Duration::from_millis(20);

/// Decides whether the product in front of the camera is defective.
///
/// Called once per inspection request from the bridge task. Implementations
/// should return quickly; heavy models belong on their own thread.
pub trait DefectClassifier: Send + 'static {
    fn classify(&mut self) -> bool;
}

impl<F> DefectClassifier for F
where
    F: FnMut() -> bool + Send + 'static,
{
    fn classify(&mut self) -> bool {
        self()
    }
}

/// Classifier that passes every product.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassAll;

impl DefectClassifier for PassAll {
    fn classify(&mut self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    AwaitRequest,
    AwaitRelease,
}

/// Spawn the handshake loop.
///
/// The task exits when `shutdown` flips to true (or its sender drops), or
/// with `EngineGone` once the scan task is no longer reachable.
pub fn spawn_bridge<C: DefectClassifier>(
    control: ControlHandle,
    mut classifier: C,
    poll: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<Result<(), RuntimeError>> {
    tokio::spawn(async move {
        let mut ticker = interval(poll);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut phase = Phase::AwaitRequest;
        let mut verdicts: u64 = 0;

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let request = control.inspection_lights().await?.request;
                    match (phase, request) {
                        (Phase::AwaitRequest, true) => {
                            let defect = classifier.classify();
                            control.report_inspection(defect).await?;
                            verdicts += 1;
                            debug!(defect, "Inspection verdict reported");
                            phase = Phase::AwaitRelease;
                        }
                        (Phase::AwaitRelease, false) => {
                            control.clear_inspection().await?;
                            phase = Phase::AwaitRequest;
                        }
                        _ => {}
                    }
                }
            }
        }

        if phase == Phase::AwaitRelease {
            let _ = control.clear_inspection().await;
        }
        info!("Vision bridge stopped after {verdicts} verdicts");
        Ok(())
    })
}

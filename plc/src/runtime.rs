//! Runtime wiring: scan task, Modbus server, control handle.
//!
//! The scan task is the only owner of the [`ScanEngine`]. Everything else
//! reaches the image through messages that are served between ticks.

use std::net::SocketAddr;
use std::time::Duration;

use plc_common::config::PlcConfig;
use plc_common::io::address::{CoilAddr, InputAddr, RegisterAddr, coil, input};
use plc_common::io::image::{ImageOp, ImageReply};
use plc_control_unit::state::inspection::InspectionLights;
use plc_control_unit::{CycleStats, LogicSnapshot, ScanEngine};
use plc_modbus::port::DEFAULT_PORT_CAPACITY;
use plc_modbus::{ImagePort, ImageRequest, ModbusServer, SessionState};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::error::RuntimeError;

const COMMAND_CAPACITY: usize = 16;

/// Point-in-time view of the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeStatus {
    pub running: bool,
    pub client: Option<SocketAddr>,
    pub snapshot: LogicSnapshot,
    pub stats: CycleStats,
}

enum Command {
    Start(oneshot::Sender<Result<(), RuntimeError>>),
    Stop(oneshot::Sender<()>),
    Status(oneshot::Sender<RuntimeStatus>),
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Start(_) => f.write_str("Start"),
            Command::Stop(_) => f.write_str("Stop"),
            Command::Status(_) => f.write_str("Status"),
        }
    }
}

// ─── Control handle ─────────────────────────────────────────────────

/// Cloneable handle for operators and the vision collaborator.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    port: ImagePort,
    commands: mpsc::Sender<Command>,
    sessions: watch::Receiver<SessionState>,
}

impl ControlHandle {
    async fn command<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| RuntimeError::EngineGone)?;
        rx.await.map_err(|_| RuntimeError::EngineGone)
    }

    async fn image(&self, op: ImageOp) -> Result<ImageReply, RuntimeError> {
        self.port.call(op).await.map_err(|_| RuntimeError::EngineGone)
    }

    /// Start ticking. Refused with `PlantNotConnected` when a client is
    /// required and none is connected.
    pub async fn start(&self) -> Result<(), RuntimeError> {
        self.command(Command::Start).await?
    }

    /// Stop ticking and return image and logic to the cold state.
    pub async fn stop(&self) -> Result<(), RuntimeError> {
        self.command(Command::Stop).await
    }

    pub async fn status(&self) -> Result<RuntimeStatus, RuntimeError> {
        self.command(Command::Status).await
    }

    pub async fn snapshot(&self) -> Result<LogicSnapshot, RuntimeError> {
        Ok(self.status().await?.snapshot)
    }

    pub async fn write_input(&self, addr: InputAddr, value: bool) -> Result<(), RuntimeError> {
        self.image(ImageOp::WriteInputs {
            start: addr.0,
            values: vec![value],
        })
        .await?;
        Ok(())
    }

    pub async fn read_coil(&self, addr: CoilAddr) -> Result<bool, RuntimeError> {
        let reply = self
            .image(ImageOp::ReadCoils {
                start: addr.0,
                quantity: 1,
            })
            .await?;
        Ok(matches!(reply, ImageReply::Bits(bits) if bits.first() == Some(&true)))
    }

    pub async fn read_register(&self, addr: RegisterAddr) -> Result<u16, RuntimeError> {
        let reply = self
            .image(ImageOp::ReadRegisters {
                start: addr.0,
                quantity: 1,
            })
            .await?;
        match reply {
            ImageReply::Words(words) => Ok(words.first().copied().unwrap_or(0)),
            _ => Ok(0),
        }
    }

    /// Publish a verdict for the product at the camera.
    ///
    /// The defect level is written before the done flag so no tick can see
    /// the flag with a stale level.
    pub async fn report_inspection(&self, defect: bool) -> Result<(), RuntimeError> {
        self.write_input(input::VISION_DEFECT, defect).await?;
        self.write_input(input::VISION_DONE, true).await
    }

    /// Lower the done flag after the request coil dropped.
    pub async fn clear_inspection(&self) -> Result<(), RuntimeError> {
        self.write_input(input::VISION_DONE, false).await
    }

    /// Route defective products to disposal instead of rework.
    pub async fn set_defect_disposal(&self, dispose: bool) -> Result<(), RuntimeError> {
        self.write_input(input::DEFECT_DISPOSE, dispose).await
    }

    pub async fn inspection_lights(&self) -> Result<InspectionLights, RuntimeError> {
        let first = coil::ERROR_LIGHT.0;
        let last = coil::INSPECTION_REQUEST.0;
        let reply = self
            .image(ImageOp::ReadCoils {
                start: first,
                quantity: last - first + 1,
            })
            .await?;
        let bits = match reply {
            ImageReply::Bits(bits) => bits,
            _ => Vec::new(),
        };
        let at = |addr: CoilAddr| bits.get((addr.0 - first) as usize).copied().unwrap_or(false);
        Ok(InspectionLights {
            green: at(coil::NORMAL_LIGHT),
            yellow: at(coil::DEFECTED_LIGHT),
            red: at(coil::ERROR_LIGHT),
            request: at(coil::INSPECTION_REQUEST),
        })
    }

    /// Subscribe to plant-client connection changes.
    pub fn sessions(&self) -> watch::Receiver<SessionState> {
        self.sessions.clone()
    }
}

// ─── Scan task ──────────────────────────────────────────────────────

struct ScanTask {
    engine: ScanEngine,
    running: bool,
    require_client: bool,
    autostart_pending: bool,
    sessions: watch::Receiver<SessionState>,
}

impl ScanTask {
    async fn run(
        mut self,
        mut requests: mpsc::Receiver<ImageRequest>,
        mut commands: mpsc::Receiver<Command>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = interval(self.engine.budget());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                Some(command) = commands.recv() => self.handle(command, &mut ticker),
                _ = ticker.tick(), if self.running => {
                    self.engine.scan();
                }
                changed = self.sessions.changed(), if self.autostart_pending => {
                    if changed.is_err() {
                        self.autostart_pending = false;
                    } else if self.sessions.borrow_and_update().is_connected() {
                        self.autostart_pending = false;
                        self.begin(&mut ticker);
                    }
                }
                Some(request) = requests.recv() => {
                    let reply = self.engine.apply(&request.op);
                    request.respond(reply);
                }
            }
        }

        self.engine.reset();
        let stats = self.engine.stats();
        info!(
            "Scan task stopped after {} ticks (avg={}us, max={}us, overruns={}, faults={})",
            stats.cycle_count,
            stats.avg_cycle_ns() / 1000,
            stats.max_cycle_ns / 1000,
            stats.overruns,
            stats.faults
        );
    }

    fn handle(&mut self, command: Command, ticker: &mut Interval) {
        debug!(?command, "Control command");
        match command {
            Command::Start(reply) => {
                let result = if self.running {
                    Ok(())
                } else if self.require_client && !self.sessions.borrow().is_connected() {
                    warn!("Start refused: plant is not connected");
                    Err(RuntimeError::PlantNotConnected)
                } else {
                    self.begin(ticker);
                    Ok(())
                };
                let _ = reply.send(result);
            }
            Command::Stop(reply) => {
                self.autostart_pending = false;
                if self.running {
                    self.running = false;
                    info!("Scan stopped, image and logic cleared");
                }
                self.engine.reset();
                let _ = reply.send(());
            }
            Command::Status(reply) => {
                let _ = reply.send(self.status());
            }
        }
    }

    fn begin(&mut self, ticker: &mut Interval) {
        self.running = true;
        ticker.reset();
        info!(
            "Scan started ({} ms cycle)",
            self.engine.budget().as_millis()
        );
    }

    fn status(&self) -> RuntimeStatus {
        let client = match *self.sessions.borrow() {
            SessionState::Connected(peer) => Some(peer),
            SessionState::Disconnected => None,
        };
        RuntimeStatus {
            running: self.running,
            client,
            snapshot: self.engine.snapshot(),
            stats: *self.engine.stats(),
        }
    }
}

// ─── Runtime ────────────────────────────────────────────────────────

/// Owner of the spawned tasks.
pub struct RuntimeHandle {
    local_addr: SocketAddr,
    control: ControlHandle,
    shutdown: watch::Sender<bool>,
    server: JoinHandle<Result<(), plc_modbus::ModbusError>>,
    scan: JoinHandle<()>,
}

impl RuntimeHandle {
    /// Address the Modbus listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn control(&self) -> ControlHandle {
        self.control.clone()
    }

    /// Stop the listener, drop the session, clear the image, join all tasks.
    pub async fn shutdown(self) -> Result<(), RuntimeError> {
        info!("Shutting down runtime");
        let _ = self.shutdown.send(true);
        let served = self.server.await;
        self.scan.await?;
        served??;
        info!("Runtime shutdown complete");
        Ok(())
    }
}

/// Validate `config`, bind the listener and spawn every task.
///
/// Must be called inside a tokio runtime. A bind failure is returned
/// before anything is spawned.
pub async fn spawn(config: PlcConfig) -> Result<RuntimeHandle, RuntimeError> {
    config.validate()?;
    let addr = config.modbus.socket_addr()?;

    let (port, requests) = ImagePort::channel(DEFAULT_PORT_CAPACITY);
    let server = ModbusServer::bind(addr, port.clone()).await?;
    let local_addr = server.local_addr()?;
    let sessions = server.sessions();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);

    let cycle = Duration::from_millis(config.scan.cycle_time_ms);
    let require_client = config.scan.require_client;
    let autostart = config.scan.autostart;
    let task = ScanTask {
        engine: ScanEngine::new(&config.timings, cycle),
        running: false,
        require_client,
        autostart_pending: autostart && require_client,
        sessions: sessions.clone(),
    };

    info!(
        service = %config.shared.service_name,
        "Runtime starting: Modbus on {local_addr}, {} ms cycle",
        cycle.as_millis()
    );

    let scan = tokio::spawn(task.run(requests, command_rx, shutdown_rx.clone()));
    let server = tokio::spawn(server.run(shutdown_rx));

    let control = ControlHandle {
        port,
        commands: command_tx,
        sessions,
    };
    if autostart && !require_client {
        control.start().await?;
    } else if autostart {
        info!("Autostart deferred until the plant connects");
    }

    Ok(RuntimeHandle {
        local_addr,
        control,
        shutdown: shutdown_tx,
        server,
        scan,
    })
}

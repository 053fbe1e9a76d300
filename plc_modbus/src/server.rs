//! TCP listener and client session.
//!
//! Exactly one plant client is served at a time. A new connection aborts
//! the previous session. Socket errors end the session only; the listener
//! keeps accepting until shutdown.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use plc_common::consts::MIN_FRAME_LEN;

use crate::error::ModbusError;
use crate::frame::{self, FrameError};
use crate::port::ImagePort;

const READ_CHUNK: usize = 1024;

/// Who is connected right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connected(SocketAddr),
}

impl SessionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, SessionState::Connected(_))
    }
}

pub struct ModbusServer {
    listener: TcpListener,
    port: ImagePort,
    session_tx: watch::Sender<SessionState>,
}

impl ModbusServer {
    /// Bind the listener. Failure here is fatal for the caller.
    pub async fn bind(addr: SocketAddr, port: ImagePort) -> Result<Self, ModbusError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ModbusError::Bind { addr, source })?;
        let (session_tx, _) = watch::channel(SessionState::default());
        info!("Modbus server listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            port,
            session_tx,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ModbusError> {
        Ok(self.listener.local_addr()?)
    }

    /// Subscribe to session changes.
    pub fn sessions(&self) -> watch::Receiver<SessionState> {
        self.session_tx.subscribe()
    }

    /// Accept loop. Returns once `shutdown` flips to true or its sender drops.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<(), ModbusError> {
        let mut session: Option<JoinHandle<()>> = None;

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            warn!("Accept failed: {e}");
                            continue;
                        }
                    };
                    if let Some(previous) = session.take() {
                        previous.abort();
                        info!(%peer, "Plant client replaced previous session");
                    } else {
                        info!(%peer, "Plant client connected");
                    }
                    self.session_tx.send_replace(SessionState::Connected(peer));
                    session = Some(self.spawn_session(stream, peer));
                }
            }
        }

        if let Some(active) = session.take() {
            active.abort();
            let _ = active.await;
        }
        self.session_tx.send_replace(SessionState::Disconnected);
        info!("Modbus server stopped");
        Ok(())
    }

    fn spawn_session(&self, stream: TcpStream, peer: SocketAddr) -> JoinHandle<()> {
        let port = self.port.clone();
        let session_tx = self.session_tx.clone();
        tokio::spawn(async move {
            match serve_session(stream, peer, &port).await {
                Ok(()) => info!(%peer, "Plant client disconnected"),
                Err(e) => warn!(%peer, "Session ended: {e}"),
            }
            session_tx.send_if_modified(|state| {
                if *state == SessionState::Connected(peer) {
                    *state = SessionState::Disconnected;
                    true
                } else {
                    false
                }
            });
        })
    }
}

async fn serve_session(
    mut stream: TcpStream,
    peer: SocketAddr,
    port: &ImagePort,
) -> Result<(), ModbusError> {
    let _ = stream.set_nodelay(true);
    let mut buf: Vec<u8> = Vec::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);

        loop {
            match frame::split_frame(&mut buf) {
                Ok(Some(request)) => {
                    if let Some(response) = handle_frame(&request, peer, port).await? {
                        stream.write_all(&response).await?;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    debug!(%peer, "Discarding receive buffer: {e}");
                    buf.clear();
                    break;
                }
            }
        }
    }
}

/// Serve one complete frame. `Ok(None)` means no response is sent.
async fn handle_frame(
    raw: &[u8],
    peer: SocketAddr,
    port: &ImagePort,
) -> Result<Option<Vec<u8>>, ModbusError> {
    let (header, request) = match frame::decode(raw) {
        Ok(decoded) => decoded,
        Err(FrameError::UnsupportedFunction(function)) => {
            warn!(%peer, "Unsupported function code 0x{function:02X}, no response");
            return Ok(None);
        }
        Err(e) if raw.len() < MIN_FRAME_LEN => {
            trace!(%peer, "Short frame dropped: {e}");
            return Ok(None);
        }
        Err(e) => {
            debug!(%peer, "Malformed request dropped: {e}");
            return Ok(None);
        }
    };

    debug!(
        %peer,
        transaction = header.transaction_id,
        function = request.function_code(),
        "Request"
    );

    let reply = port.call(request.image_op()).await?;
    Ok(frame::encode_response(raw, &header, &request, &reply))
}

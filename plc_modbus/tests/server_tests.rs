//! End-to-end tests: real TCP client against the server and a fake image owner.

use std::net::SocketAddr;
use std::time::Duration;

use plc_common::io::address::input;
use plc_common::io::image::IoImage;
use plc_modbus::{ImagePort, ModbusServer, SessionState};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;

struct Harness {
    addr: SocketAddr,
    sessions: watch::Receiver<SessionState>,
    shutdown: watch::Sender<bool>,
    server: JoinHandle<Result<(), plc_modbus::ModbusError>>,
    owner: JoinHandle<IoImage>,
}

async fn start() -> Harness {
    let (port, mut rx) = ImagePort::channel(16);
    let owner = tokio::spawn(async move {
        let mut image = IoImage::new();
        while let Some(req) = rx.recv().await {
            let reply = image.apply(&req.op);
            req.respond(reply);
        }
        image
    });
    let server = ModbusServer::bind("127.0.0.1:0".parse().unwrap(), port)
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();
    let sessions = server.sessions();
    let (shutdown, shutdown_rx) = watch::channel(false);
    let server = tokio::spawn(server.run(shutdown_rx));
    Harness {
        addr,
        sessions,
        shutdown,
        server,
        owner,
    }
}

fn request(tid: u16, function: u8, a: u16, b: u16) -> Vec<u8> {
    let mut f = tid.to_be_bytes().to_vec();
    f.extend_from_slice(&[0x00, 0x00, 0x00, 0x06, 0x01, function]);
    f.extend_from_slice(&a.to_be_bytes());
    f.extend_from_slice(&b.to_be_bytes());
    f
}

async fn exchange(stream: &mut TcpStream, frame: &[u8], expect: usize) -> Vec<u8> {
    stream.write_all(frame).await.unwrap();
    let mut buf = vec![0u8; expect];
    timeout(Duration::from_secs(2), stream.read_exact(&mut buf))
        .await
        .expect("response timed out")
        .unwrap();
    buf
}

async fn wait_for(sessions: &mut watch::Receiver<SessionState>, want: impl Fn(&SessionState) -> bool) {
    timeout(Duration::from_secs(2), sessions.wait_for(|s| want(s)))
        .await
        .expect("session state timed out")
        .unwrap();
}

#[tokio::test]
async fn write_single_coil_lands_in_inputs_and_reads_serve_coils() {
    let h = start().await;
    let mut client = TcpStream::connect(h.addr).await.unwrap();

    let write = request(1, 0x05, input::BASES_AT_ENTRY.0, 0xFF00);
    let echo = exchange(&mut client, &write, 12).await;
    assert_eq!(echo, write);

    // Discrete inputs are served from the coil array, untouched without a scan.
    let read = exchange(&mut client, &request(2, 0x02, input::BASES_AT_ENTRY.0, 1), 10).await;
    assert_eq!(read, [0x00, 0x02, 0x00, 0x00, 0x00, 0x04, 0x01, 0x02, 0x01, 0x00]);

    drop(client);
    h.shutdown.send(true).unwrap();
    h.server.await.unwrap().unwrap();
    let image = h.owner.await.unwrap();
    assert!(image.input(input::BASES_AT_ENTRY));
}

#[tokio::test]
async fn write_multiple_coils_and_read_registers() {
    let h = start().await;
    let mut client = TcpStream::connect(h.addr).await.unwrap();

    let write = [
        0x00, 0x09, 0x00, 0x00, 0x00, 0x08, 0x01, 0x0F, 0x00, 0x1B, 0x00, 0x02, 0x01, 0x03,
    ];
    let resp = exchange(&mut client, &write, 12).await;
    assert_eq!(
        resp,
        [0x00, 0x09, 0x00, 0x00, 0x00, 0x06, 0x01, 0x0F, 0x00, 0x1B, 0x00, 0x02]
    );

    let regs = exchange(&mut client, &request(10, 0x03, 0, 2), 13).await;
    assert_eq!(&regs[..9], &[0x00, 0x0A, 0x00, 0x00, 0x00, 0x07, 0x01, 0x03, 0x04]);
    assert_eq!(&regs[9..], &[0, 0, 0, 0]);

    drop(client);
    h.shutdown.send(true).unwrap();
    h.server.await.unwrap().unwrap();
    let image = h.owner.await.unwrap();
    assert!(image.input(input::BASES_ENTER));
    assert!(image.input(input::LIDS_ENTER));
}

#[tokio::test]
async fn unsupported_and_corrupt_frames_keep_connection_open() {
    let h = start().await;
    let mut client = TcpStream::connect(h.addr).await.unwrap();

    // Function 0x06 gets no response.
    client.write_all(&request(3, 0x06, 0, 1)).await.unwrap();
    // Length field 0 discards whatever is buffered.
    client.write_all(&[0, 4, 0, 0, 0, 0, 1, 1]).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let read = exchange(&mut client, &request(5, 0x01, 0, 8), 10).await;
    assert_eq!(&read[..2], &[0x00, 0x05]);

    h.shutdown.send(true).unwrap();
    h.server.await.unwrap().unwrap();
}

#[tokio::test]
async fn new_client_replaces_previous_session() {
    let mut h = start().await;

    let mut first = TcpStream::connect(h.addr).await.unwrap();
    let first_addr = first.local_addr().unwrap();
    wait_for(&mut h.sessions, |s| *s == SessionState::Connected(first_addr)).await;

    let mut second = TcpStream::connect(h.addr).await.unwrap();
    let second_addr = second.local_addr().unwrap();
    wait_for(&mut h.sessions, |s| *s == SessionState::Connected(second_addr)).await;

    // The first socket is closed by the server.
    let mut buf = [0u8; 1];
    let n = timeout(Duration::from_secs(2), first.read(&mut buf))
        .await
        .expect("first session still open")
        .unwrap_or(0);
    assert_eq!(n, 0);

    let read = exchange(&mut second, &request(7, 0x01, 0, 1), 10).await;
    assert_eq!(&read[..2], &[0x00, 0x07]);

    drop(second);
    wait_for(&mut h.sessions, |s| !s.is_connected()).await;

    h.shutdown.send(true).unwrap();
    h.server.await.unwrap().unwrap();
}

#[tokio::test]
async fn bind_failure_is_reported() {
    let h = start().await;
    let (port, _rx) = ImagePort::channel(1);
    let err = ModbusServer::bind(h.addr, port).await.err().unwrap();
    assert!(matches!(err, plc_modbus::ModbusError::Bind { .. }));
    h.shutdown.send(true).unwrap();
    h.server.await.unwrap().unwrap();
}

#[tokio::test]
async fn server_ends_when_shutdown_sender_drops() {
    let h = start().await;
    drop(h.shutdown);
    timeout(Duration::from_secs(2), h.server)
        .await
        .expect("server did not stop")
        .unwrap()
        .unwrap();
}

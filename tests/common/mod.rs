//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use agent_gateway::config::ConnectionSettings;
use agent_gateway::net::{Acceptor, ConnectionHandle, ConnectionId, ConnectionTracker, Listener};
use agent_gateway::protocol::encode_frame;
use agent_gateway::resilience::backpressure::FrameReceiver;
use agent_gateway::security::BanFilter;
use agent_gateway::{Consumer, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// What a test agent observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    Started(ConnectionId),
    Frame(ConnectionId, Vec<u8>),
    Finished(ConnectionId),
}

/// Records every frame, in order.
pub struct RecordingAgent {
    events: mpsc::UnboundedSender<AgentEvent>,
}

impl RecordingAgent {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AgentEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (Self { events }, rx)
    }
}

impl Consumer for RecordingAgent {
    async fn consume(&self, mut frames: FrameReceiver, conn: ConnectionHandle) {
        let _ = self.events.send(AgentEvent::Started(conn.id()));
        while let Some(frame) = frames.recv().await {
            let _ = self.events.send(AgentEvent::Frame(conn.id(), frame.payload().to_vec()));
        }
        let _ = self.events.send(AgentEvent::Finished(conn.id()));
    }
}

/// Records frames until it sees `b"stall"`, then stops reading until the
/// connection is torn down.
pub struct StallingAgent {
    events: mpsc::UnboundedSender<AgentEvent>,
}

impl StallingAgent {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AgentEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (Self { events }, rx)
    }
}

impl Consumer for StallingAgent {
    async fn consume(&self, mut frames: FrameReceiver, conn: ConnectionHandle) {
        let _ = self.events.send(AgentEvent::Started(conn.id()));
        while let Some(frame) = frames.recv().await {
            if frame.payload() == b"stall" {
                conn.closed().await;
                break;
            }
            let _ = self.events.send(AgentEvent::Frame(conn.id(), frame.payload().to_vec()));
        }
        let _ = self.events.send(AgentEvent::Finished(conn.id()));
    }
}

/// Writes every frame back to the peer.
pub struct EchoAgent;

impl Consumer for EchoAgent {
    async fn consume(&self, mut frames: FrameReceiver, conn: ConnectionHandle) {
        while let Some(frame) = frames.recv().await {
            if conn.send_frame(frame.payload()).await.is_err() {
                break;
            }
        }
    }
}

pub struct TestGateway {
    pub addr: SocketAddr,
    pub tracker: ConnectionTracker,
    pub shutdown: Shutdown,
    pub task: JoinHandle<()>,
}

impl TestGateway {
    pub async fn stop(self) {
        self.shutdown.trigger();
        let _ = self.task.await;
    }
}

/// Start an acceptor on an ephemeral local port.
pub async fn start_gateway<B, C>(ban_filter: Arc<B>, consumer: C, settings: ConnectionSettings) -> TestGateway
where
    B: BanFilter,
    C: Consumer,
{
    let listener = Listener::from_tcp(TcpListener::bind("127.0.0.1:0").await.unwrap());
    let acceptor = Acceptor::new(listener, ban_filter, Arc::new(consumer), settings);
    let addr = acceptor.local_addr().unwrap();
    let tracker = acceptor.tracker();
    let shutdown = Shutdown::new();
    let task = tokio::spawn(acceptor.run(shutdown.subscribe(), Duration::from_secs(2)));

    TestGateway {
        addr,
        tracker,
        shutdown,
        task,
    }
}

/// Short timeouts so tests finish quickly.
pub fn fast_settings() -> ConnectionSettings {
    ConnectionSettings {
        idle_timeout: Duration::from_millis(400),
        backpressure_delay: Duration::from_millis(300),
        queue_capacity: 10,
    }
}

pub async fn write_frame(stream: &mut TcpStream, payload: &[u8]) {
    stream.write_all(&encode_frame(payload).unwrap()).await.unwrap();
}

pub async fn read_frame(stream: &mut TcpStream) -> Vec<u8> {
    let mut header = [0u8; 2];
    stream.read_exact(&mut header).await.unwrap();
    let mut payload = vec![0u8; u16::from_be_bytes(header) as usize];
    stream.read_exact(&mut payload).await.unwrap();
    payload
}

/// True once the server has closed its side.
pub async fn server_closed(stream: &mut TcpStream) -> bool {
    let mut buf = [0u8; 64];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => return true,
            Ok(_) => continue,
        }
    }
}

/// Next event, failing the test if none arrives in time.
pub async fn next_event(rx: &mut mpsc::UnboundedReceiver<AgentEvent>) -> AgentEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for agent")
        .expect("agent channel closed")
}

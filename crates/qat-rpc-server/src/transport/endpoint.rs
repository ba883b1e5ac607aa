//! ZeroMQ endpoint with non-blocking receive and bounded send retry.
//!
//! - `try_recv` never blocks: a frame or `None`.
//! - `send` retries while the socket is not ready and gives up with
//!   `RpcError::Timeout` once the send timeout has elapsed.
//! - `close` releases socket then context exactly once; `Drop` calls it.

use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use qat_rpc_core::error::{Result, RpcError};

pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(1);

/// Longest message preview included in a timeout error.
const PREVIEW_CHARS: usize = 64;

/// `scheme://host-or-wildcard:port`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

impl Address {
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme: "tcp".into(),
            host: host.into(),
            port,
        }
    }

    /// Bind address on every interface.
    pub fn wildcard(port: u16) -> Self {
        Self::tcp("*", port)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketKind {
    /// Client side (REQ).
    Request,
    /// Server side (REP).
    Reply,
}

impl SocketKind {
    fn zmq_type(self) -> zmq::SocketType {
        match self {
            SocketKind::Request => zmq::REQ,
            SocketKind::Reply => zmq::REP,
        }
    }
}

pub struct Endpoint {
    socket: Option<zmq::Socket>,
    context: Option<zmq::Context>,
    kind: SocketKind,
    address: Address,
    send_timeout: Duration,
    retry_interval: Duration,
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("kind", &self.kind)
            .field("address", &self.address)
            .field("closed", &self.is_closed())
            .field("send_timeout", &self.send_timeout)
            .finish()
    }
}

impl Endpoint {
    /// Create a socket with its own context. Nothing is bound or connected yet.
    pub fn open(kind: SocketKind, address: Address) -> Result<Self> {
        let context = zmq::Context::new();
        let socket = context
            .socket(kind.zmq_type())
            .map_err(|e| transport_err("create socket", &e))?;
        // never block close on unsent frames
        socket.set_linger(0).map_err(|e| transport_err("set linger", &e))?;
        Ok(Self {
            socket: Some(socket),
            context: Some(context),
            kind,
            address,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        })
    }

    /// Open a reply socket bound on all interfaces.
    pub fn bind_reply(port: u16) -> Result<Self> {
        let ep = Self::open(SocketKind::Reply, Address::wildcard(port))?;
        ep.bind()?;
        Ok(ep)
    }

    /// Open a request socket connected to `host:port`.
    pub fn connect_request(host: &str, port: u16) -> Result<Self> {
        let ep = Self::open(SocketKind::Request, Address::tcp(host, port))?;
        ep.connect()?;
        Ok(ep)
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    pub fn bind(&self) -> Result<()> {
        let addr = self.address.to_string();
        self.socket()?
            .bind(&addr)
            .map_err(|e| RpcError::Transport(format!("bind {addr}: {e}")))?;
        tracing::info!(address = %addr, "endpoint bound");
        Ok(())
    }

    pub fn connect(&self) -> Result<()> {
        let addr = self.address.to_string();
        self.socket()?
            .connect(&addr)
            .map_err(|e| RpcError::Transport(format!("connect {addr}: {e}")))?;
        tracing::debug!(address = %addr, "endpoint connected");
        Ok(())
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn kind(&self) -> SocketKind {
        self.kind
    }

    pub fn send_timeout(&self) -> Duration {
        self.send_timeout
    }

    pub fn is_closed(&self) -> bool {
        self.socket.is_none()
    }

    /// Next queued frame, or `None` if nothing is waiting.
    pub fn try_recv(&self) -> Result<Option<Vec<u8>>> {
        match self.socket()?.recv_bytes(zmq::DONTWAIT) {
            Ok(frame) => Ok(Some(frame)),
            Err(e) if is_not_ready(e) => Ok(None),
            Err(e) => Err(transport_err("receive", &e)),
        }
    }

    /// Send one frame, retrying until it is queued or the send timeout elapses.
    pub fn send(&self, frame: &[u8]) -> Result<()> {
        let socket = self.socket()?;
        let started = Instant::now();
        loop {
            match socket.send(frame, zmq::DONTWAIT) {
                Ok(()) => return Ok(()),
                Err(e) if is_not_ready(e) => {
                    if started.elapsed() > self.send_timeout {
                        return Err(RpcError::Timeout {
                            message: preview(frame),
                            address: self.address.to_string(),
                        });
                    }
                    thread::sleep(self.retry_interval);
                }
                Err(e) => return Err(transport_err("send", &e)),
            }
        }
    }

    /// Release socket then context. Closing twice is a no-op.
    pub fn close(&mut self) {
        let Some(socket) = self.socket.take() else {
            return;
        };
        drop(socket);
        drop(self.context.take());
        tracing::debug!(address = %self.address, "endpoint closed");
    }

    /// Close, but give already queued frames up to `linger` to leave first.
    pub fn close_draining(&mut self, linger: Duration) {
        if let Some(socket) = self.socket.as_ref() {
            let ms = i32::try_from(linger.as_millis()).unwrap_or(i32::MAX);
            if let Err(e) = socket.set_linger(ms) {
                tracing::debug!(address = %self.address, error = %e, "set linger before close");
            }
        }
        self.close();
    }

    fn socket(&self) -> Result<&zmq::Socket> {
        self.socket
            .as_ref()
            .ok_or_else(|| RpcError::Transport(format!("endpoint {} is closed", self.address)))
    }
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        self.close();
    }
}

/// Only these are retried. EFSM (wrong REQ/REP turn) is a caller bug and fails
/// immediately as a transport error.
fn is_not_ready(e: zmq::Error) -> bool {
    matches!(e, zmq::Error::EAGAIN | zmq::Error::EINTR)
}

fn transport_err(op: &str, e: &zmq::Error) -> RpcError {
    RpcError::Transport(format!("{op} failed: {e}"))
}

fn preview(frame: &[u8]) -> String {
    let text = String::from_utf8_lossy(frame);
    let mut out: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use qat_rpc_core::ErrorKind;

    #[test]
    fn address_formats() {
        assert_eq!(Address::tcp("127.0.0.1", 5556).to_string(), "tcp://127.0.0.1:5556");
        assert_eq!(Address::wildcard(5556).to_string(), "tcp://*:5556");
    }

    #[test]
    fn try_recv_without_traffic_returns_none() {
        // a request socket would refuse recv before send, so use the server side
        let ep = Endpoint::open(SocketKind::Reply, Address::tcp("127.0.0.1", 15590)).unwrap();
        assert!(ep.try_recv().unwrap().is_none());
    }

    #[test]
    fn send_on_unready_socket_times_out() {
        // never connected, so the request socket has no pipe to queue on
        let ep = Endpoint::open(SocketKind::Request, Address::tcp("127.0.0.1", 15591))
            .unwrap()
            .with_send_timeout(Duration::from_millis(200));

        let started = Instant::now();
        let err = ep.send(br#"["version"]"#).expect_err("must time out");
        let elapsed = started.elapsed();

        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.to_string().contains("tcp://127.0.0.1:15591"), "{err}");
        assert!(err.to_string().contains("version"), "{err}");
        assert!(elapsed >= Duration::from_millis(200), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(3), "{elapsed:?}");
    }

    #[test]
    fn out_of_turn_receive_is_a_transport_error() {
        // a request socket must send before it may receive
        let ep = Endpoint::open(SocketKind::Request, Address::tcp("127.0.0.1", 15594)).unwrap();
        let err = ep.try_recv().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[test]
    fn close_draining_is_idempotent_too() {
        let mut ep = Endpoint::open(SocketKind::Reply, Address::tcp("127.0.0.1", 15595)).unwrap();
        ep.close_draining(Duration::from_millis(50));
        assert!(ep.is_closed());
        ep.close_draining(Duration::from_millis(50));
        ep.close();
        assert!(ep.is_closed());
    }

    #[test]
    fn close_is_idempotent() {
        let mut ep = Endpoint::open(SocketKind::Reply, Address::tcp("127.0.0.1", 15592)).unwrap();
        ep.close();
        assert!(ep.is_closed());
        ep.close();
        assert!(ep.is_closed());
        assert_eq!(ep.try_recv().unwrap_err().kind(), ErrorKind::Transport);
    }

    #[test]
    fn preview_truncates_long_frames() {
        let long = vec![b'a'; 200];
        let p = preview(&long);
        assert_eq!(p.len(), PREVIEW_CHARS + 3);
        assert!(p.ends_with("..."));
    }
}

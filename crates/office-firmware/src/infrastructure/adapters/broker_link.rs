//! TCP link handing the MQTT client one whole packet per read
//!
//! The socket lives behind a mutex shared with [`MqttTransport`], which
//! reopens it for every session while the client keeps its own handle.
//!
//! [`MqttTransport`]: super::MqttTransport

use core::fmt;

use embassy_net::tcp::{self, TcpSocket};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::{Duration, Instant};
use embedded_io_async::Write;
use myrtio_mqtt::transport::{MqttTransport, TransportError};
use office_core::{FrameError, PacketFramer};

pub(crate) const MQTT_BUF_SIZE: usize = 512;

const SOCKET_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) type SharedLink = Mutex<NoopRawMutex, Link>;

pub(crate) struct Link {
    socket: TcpSocket<'static>,
    framer: PacketFramer<MQTT_BUF_SIZE>,
    /// Last time a whole packet came in from the broker
    last_received: Instant,
}

impl Link {
    pub(crate) fn new(mut socket: TcpSocket<'static>) -> Self {
        socket.set_timeout(Some(SOCKET_TIMEOUT));
        Self {
            socket,
            framer: PacketFramer::new(),
            last_received: Instant::now(),
        }
    }

    /// Drop the current connection and everything buffered for it
    pub(crate) fn close(&mut self) {
        self.socket.abort();
        self.framer.reset();
    }

    pub(crate) fn socket_mut(&mut self) -> &mut TcpSocket<'static> {
        &mut self.socket
    }

    pub(crate) fn mark_received(&mut self) {
        self.last_received = Instant::now();
    }

    pub(crate) fn last_received(&self) -> Instant {
        self.last_received
    }
}

#[derive(Debug)]
pub(crate) enum LinkError {
    Tcp(tcp::Error),
    Frame(FrameError),
    /// Broker closed the connection
    Closed,
    BufferTooSmall,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::Tcp(e) => write!(f, "TCP error: {:?}", e),
            LinkError::Frame(e) => write!(f, "{}", e),
            LinkError::Closed => write!(f, "Connection closed by broker"),
            LinkError::BufferTooSmall => write!(f, "Receive buffer too small"),
        }
    }
}

impl TransportError for LinkError {}

/// Client side handle on the shared link
pub(crate) struct BrokerLink(&'static SharedLink);

impl BrokerLink {
    pub(crate) fn new(link: &'static SharedLink) -> Self {
        Self(link)
    }
}

impl MqttTransport for BrokerLink {
    type Error = LinkError;

    async fn send(&mut self, buf: &[u8]) -> Result<(), LinkError> {
        let mut link = self.0.lock().await;
        link.socket.write_all(buf).await.map_err(LinkError::Tcp)?;
        link.socket.flush().await.map_err(LinkError::Tcp)
    }

    async fn recv(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        let mut guard = self.0.lock().await;
        let Link {
            socket,
            framer,
            last_received,
        } = &mut *guard;

        loop {
            if let Some(packet) = framer.take() {
                let len = packet.len();
                buf.get_mut(..len)
                    .ok_or(LinkError::BufferTooSmall)?
                    .copy_from_slice(packet);
                *last_received = Instant::now();
                return Ok(len);
            }

            // Bytes are consumed inside the closure, so a cancelled read
            // loses nothing
            socket
                .read_with(|data| {
                    if data.is_empty() {
                        return (0, Err(LinkError::Closed));
                    }
                    match framer.feed(data) {
                        Ok(used) => (used, Ok(())),
                        Err(e) => (data.len(), Err(LinkError::Frame(e))),
                    }
                })
                .await
                .map_err(LinkError::Tcp)??;
        }
    }
}

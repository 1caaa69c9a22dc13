//! Broker session on top of `myrtio-mqtt`
//!
//! One socket is allocated at boot and reopened for every session, and a
//! fresh [`MqttClient`] is built on it each time. The client sends PINGREQ by
//! itself once a keep-alive interval passes without traffic; the adapter gives
//! up on the session when the broker stays silent for one and a half.

use core::fmt;

use embassy_net::Stack;
use embassy_net::tcp::ConnectError;
use embassy_time::{Duration, with_timeout};
use myrtio_mqtt::error::MqttError;
use myrtio_mqtt::{MqttClient, MqttEvent, MqttOptions, QoS};
use office_core::{Inbound, MqttConfig, Transport};

use super::broker_link::{BrokerLink, LinkError, MQTT_BUF_SIZE, SharedLink};
use crate::infrastructure::drivers::resolve_host;

const MQTT_MAX_TOPICS: usize = 4;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const SUBSCRIBE_TIMEOUT: Duration = Duration::from_secs(10);
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);
/// How long one poll may wait for inbound data
const POLL_WINDOW: Duration = Duration::from_millis(5);
/// The client's ping timer has no off switch, so keep-alive off gets the
/// longest interval CONNECT can carry
const KEEP_ALIVE_OFF: Duration = Duration::from_secs(65_535);

type Client = MqttClient<'static, BrokerLink, MQTT_MAX_TOPICS, MQTT_BUF_SIZE>;

#[derive(Debug)]
pub(crate) enum TransportError {
    /// Broker host did not resolve
    Dns,
    Connect(ConnectError),
    Timeout,
    NotConnected,
    Mqtt(MqttError<LinkError>),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Dns => write!(f, "DNS lookup failed"),
            TransportError::Connect(e) => write!(f, "TCP connect failed: {:?}", e),
            TransportError::Timeout => write!(f, "Timed out"),
            TransportError::NotConnected => write!(f, "Not connected"),
            TransportError::Mqtt(e) => write!(f, "MQTT error: {:?}", e),
        }
    }
}

impl From<MqttError<LinkError>> for TransportError {
    fn from(e: MqttError<LinkError>) -> Self {
        TransportError::Mqtt(e)
    }
}

pub(crate) struct MqttTransport {
    stack: Stack<'static>,
    link: &'static SharedLink,
    /// `Some` while a session is up
    client: Option<Client>,
    silence_limit: Option<Duration>,
}

impl MqttTransport {
    pub(crate) fn new(stack: Stack<'static>, link: &'static SharedLink) -> Self {
        Self {
            stack,
            link,
            client: None,
            silence_limit: None,
        }
    }

    async fn open_socket(&mut self, config: &MqttConfig) -> Result<(), TransportError> {
        let address = resolve_host(self.stack, config.host)
            .await
            .map_err(|()| TransportError::Dns)?;
        log::info!("mqtt: connecting to broker {}:{}...", address, config.port);

        let mut link = self.link.lock().await;
        link.close();
        let socket = link.socket_mut();
        let _ = with_timeout(CLOSE_TIMEOUT, socket.flush()).await;
        with_timeout(CONNECT_TIMEOUT, socket.connect((address, config.port)))
            .await
            .map_err(|_| TransportError::Timeout)?
            .map_err(TransportError::Connect)?;
        link.mark_received();
        log::info!("mqtt: TCP socket connected");
        Ok(())
    }

    fn session(&mut self) -> Result<&mut Client, TransportError> {
        self.client.as_mut().ok_or(TransportError::NotConnected)
    }

    /// Any error ends the session
    fn track<T>(&mut self, result: Result<T, TransportError>) -> Result<T, TransportError> {
        if result.is_err() {
            self.client = None;
        }
        result
    }

    async fn check_silence(&self) -> Result<(), TransportError> {
        let Some(limit) = self.silence_limit else {
            return Ok(());
        };
        let last_received = self.link.lock().await.last_received();
        if last_received.elapsed() > limit {
            log::warn!("mqtt: broker silent for too long");
            return Err(TransportError::Timeout);
        }
        Ok(())
    }

    async fn poll_session(&mut self) -> Result<Option<Inbound>, TransportError> {
        self.check_silence().await?;
        let client = self.session()?;
        match with_timeout(POLL_WINDOW, client.poll()).await {
            Err(_) | Ok(Ok(None)) => Ok(None),
            Ok(Ok(Some(MqttEvent::Publish(publish)))) => {
                Ok(Inbound::new(publish.topic, publish.payload))
            }
            Ok(Err(e)) => Err(e.into()),
        }
    }
}

impl Transport for MqttTransport {
    type Error = TransportError;

    fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    async fn connect(&mut self, config: &MqttConfig) -> Result<(), TransportError> {
        self.client = None;
        self.open_socket(config).await?;

        let options = MqttOptions::new(config.client_id)
            .with_credentials(config.username, config.password)
            .with_keep_alive(config.keep_alive().unwrap_or(KEEP_ALIVE_OFF));
        let mut client: Client = MqttClient::new(BrokerLink::new(self.link), options);
        with_timeout(CONNECT_TIMEOUT, client.connect())
            .await
            .map_err(|_| TransportError::Timeout)??;

        self.silence_limit = config.silence_limit();
        self.client = Some(client);
        Ok(())
    }

    async fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        retain: bool,
    ) -> Result<(), TransportError> {
        let result = match self.session() {
            Ok(client) => client
                .publish_with_retain(topic, payload, QoS::AtMostOnce, retain)
                .await
                .map_err(TransportError::from),
            Err(e) => Err(e),
        };
        self.track(result)
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        let result = match self.session() {
            Ok(client) => with_timeout(SUBSCRIBE_TIMEOUT, client.subscribe(topic, QoS::AtMostOnce))
                .await
                .map_err(|_| TransportError::Timeout)
                .and_then(|result| result.map_err(TransportError::from)),
            Err(e) => Err(e),
        };
        if result.is_ok() {
            log::debug!("mqtt: subscribed to {}", topic);
        }
        self.track(result)
    }

    async fn poll(&mut self) -> Result<Option<Inbound>, TransportError> {
        let result = self.poll_session().await;
        self.track(result)
    }
}

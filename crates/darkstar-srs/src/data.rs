//! TCP data plane: registry sync, radio heartbeats and peer bookkeeping.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use dashmap::DashMap;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::time::{interval, timeout};

use crate::config::ClientConfig;
use crate::error::SrsError;
use crate::guid::Guid;
use crate::messages::{msg_type, ClientInfo, NetworkMessage, Radio, RadioInfo};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const RADIO_UPDATE_INTERVAL: Duration = Duration::from_secs(15);

/// Data-plane session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Synced,
    Running,
    Errored,
}

/// Client for the SRS data protocol: owns the peer registry and our own
/// advertisement. One writer (the TCP reader task), many readers (queries).
pub(crate) struct DataClient {
    guid: Guid,
    config: Arc<ClientConfig>,
    radios: Arc<Vec<Radio>>,
    peers: DashMap<Guid, ClientInfo>,
    server_settings: DashMap<String, String>,
    state: RwLock<ConnectionState>,
}

impl DataClient {
    pub fn new(guid: Guid, config: Arc<ClientConfig>, radios: Arc<Vec<Radio>>) -> Self {
        Self {
            guid,
            config,
            radios,
            peers: DashMap::new(),
            server_settings: DashMap::new(),
            state: RwLock::new(ConnectionState::Disconnected),
        }
    }

    /// Our own entry as advertised to the server.
    pub fn info(&self) -> ClientInfo {
        ClientInfo {
            guid: self.guid.clone(),
            name: self.config.name.clone(),
            coalition: crate::messages::srs_coalition(self.config.coalition),
            radio_info: Some(RadioInfo {
                radios: self.radios.as_ref().clone(),
                unit_id: self.config.unit_id,
            }),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read().expect("state lock poisoned")
    }

    fn set_state(&self, next: ConnectionState) {
        let mut state = self.state.write().expect("state lock poisoned");
        if *state != next {
            tracing::debug!("data client {:?} -> {next:?}", *state);
            *state = next;
        }
    }

    /// Open the data connection and perform the sync handshake.
    pub async fn connect(&self) -> Result<(OwnedReadHalf, OwnedWriteHalf), SrsError> {
        self.set_state(ConnectionState::Connecting);
        let stream = timeout(CONNECT_TIMEOUT, TcpStream::connect(&self.config.address))
            .await
            .map_err(|_| {
                SrsError::Transport(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("connecting to {} timed out", self.config.address),
                ))
            })??;
        stream.set_nodelay(true)?;
        let (reader, mut writer) = stream.into_split();

        send_message(&mut writer, &NetworkMessage::sync(self.info())).await?;
        self.set_state(ConnectionState::Synced);
        tracing::info!("synced with SRS server at {}", self.config.address);
        Ok((reader, writer))
    }

    /// Consume server pushes until cancellation or a transport error.
    pub async fn read_loop(
        &self,
        reader: OwnedReadHalf,
        mut cancel: broadcast::Receiver<()>,
    ) -> Result<(), SrsError> {
        self.set_state(ConnectionState::Running);
        let mut lines = BufReader::new(reader).lines();
        loop {
            tokio::select! {
                _ = cancel.recv() => {
                    self.set_state(ConnectionState::Disconnected);
                    return Ok(());
                }
                line = lines.next_line() => match line {
                    Ok(Some(line)) => self.handle_line(&line),
                    Ok(None) => {
                        return Err(self.fail(std::io::Error::new(
                            std::io::ErrorKind::UnexpectedEof,
                            "server closed the data connection",
                        )));
                    }
                    Err(err) => return Err(self.fail(err)),
                }
            }
        }
    }

    /// Emit the radio-update heartbeat carrying current tuning.
    pub async fn heartbeat_loop(
        &self,
        mut writer: OwnedWriteHalf,
        mut cancel: broadcast::Receiver<()>,
    ) -> Result<(), SrsError> {
        let mut ticker = interval(RADIO_UPDATE_INTERVAL);
        loop {
            tokio::select! {
                _ = cancel.recv() => return Ok(()),
                _ = ticker.tick() => {
                    if let Err(err) = send_message(&mut writer, &NetworkMessage::radio_update(self.info())).await {
                        self.set_state(ConnectionState::Errored);
                        self.peers.clear();
                        return Err(err);
                    }
                }
            }
        }
    }

    /// A TCP failure ends the session; the registry is stale from here on.
    fn fail(&self, err: std::io::Error) -> SrsError {
        self.set_state(ConnectionState::Errored);
        self.peers.clear();
        SrsError::Transport(err)
    }

    /// Apply one server push to the registry. Malformed lines and unknown
    /// kinds are logged and dropped.
    pub(crate) fn handle_line(&self, line: &str) {
        let message: NetworkMessage = match serde_json::from_str(line) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!("dropping malformed data message: {err}");
                return;
            }
        };

        match message.msg_type {
            msg_type::UPDATE | msg_type::RADIO_UPDATE => {
                if let Some(client) = message.client {
                    tracing::debug!("peer update: {} ({})", client.name, client.guid);
                    self.peers.insert(client.guid.clone(), client);
                }
            }
            msg_type::SYNC => {
                tracing::debug!("registry sync with {} clients", message.clients.len());
                self.peers.clear();
                for client in message.clients {
                    self.peers.insert(client.guid.clone(), client);
                }
            }
            msg_type::SERVER_SETTINGS => {
                if let Some(settings) = message.server_settings {
                    for (key, value) in settings {
                        self.server_settings.insert(key, value);
                    }
                }
            }
            msg_type::CLIENT_DISCONNECT => {
                if let Some(client) = message.client {
                    tracing::debug!("peer left: {} ({})", client.name, client.guid);
                    self.peers.remove(&client.guid);
                }
            }
            msg_type::VERSION_MISMATCH => {
                tracing::warn!(
                    "server reports a protocol version mismatch (ours {})",
                    crate::messages::PROTOCOL_VERSION
                );
            }
            msg_type::PING => {}
            other => tracing::warn!("dropping message of unknown kind {other}"),
        }
    }

    /// Whether the named unit is tuned to any of our radios.
    pub fn is_on_frequency(&self, unit_name: &str) -> bool {
        self.peers
            .iter()
            .filter(|peer| *peer.key() != self.guid)
            .any(|peer| {
                peer.value().name.eq_ignore_ascii_case(unit_name)
                    && peer.value().shares_frequency_with(&self.radios)
            })
    }

    /// Number of distinct peers (excluding ourselves) sharing a radio.
    pub fn clients_on_frequency(&self) -> usize {
        self.peers
            .iter()
            .filter(|peer| *peer.key() != self.guid)
            .filter(|peer| peer.value().shares_frequency_with(&self.radios))
            .count()
    }
}

async fn send_message(
    writer: &mut OwnedWriteHalf,
    message: &NetworkMessage,
) -> Result<(), SrsError> {
    let mut line = serde_json::to_string(message)
        .map_err(|err| SrsError::Protocol(format!("could not serialize message: {err}")))?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Modulation;
    use darkstar_core::Coalition;

    fn client() -> DataClient {
        let config = Arc::new(ClientConfig::default());
        let radios = Arc::new(config.radios.clone());
        DataClient::new(Guid::random(), config, radios)
    }

    fn peer_json(guid: &Guid, name: &str, msg_type: u8, freq_hz: f64) -> String {
        serde_json::json!({
            "MsgType": msg_type,
            "Client": {
                "ClientGuid": guid.as_str(),
                "Name": name,
                "Coalition": 2,
                "RadioInfo": {
                    "radios": [{"freq": freq_hz, "modulation": 0}],
                    "unitId": 100_000_001u32,
                }
            },
            "Version": "2.1.0.10",
        })
        .to_string()
    }

    #[test]
    fn update_then_disconnect_maintains_registry() {
        let data = client();
        let guid = Guid::random();

        data.handle_line(&peer_json(&guid, "Eagle 1-1", msg_type::UPDATE, 251.0e6));
        assert_eq!(data.clients_on_frequency(), 1);
        assert!(data.is_on_frequency("eagle 1-1"));

        data.handle_line(&peer_json(&guid, "Eagle 1-1", msg_type::CLIENT_DISCONNECT, 251.0e6));
        assert_eq!(data.clients_on_frequency(), 0);
        assert!(!data.is_on_frequency("Eagle 1-1"));
    }

    #[test]
    fn sync_replaces_the_registry() {
        let data = client();
        data.handle_line(&peer_json(&Guid::random(), "Stale", msg_type::UPDATE, 251.0e6));

        let fresh = Guid::random();
        let sync = serde_json::json!({
            "MsgType": msg_type::SYNC,
            "Clients": [{
                "ClientGuid": fresh.as_str(),
                "Name": "Viper 2-1",
                "Coalition": 2,
                "RadioInfo": {"radios": [{"freq": 251.0e6, "modulation": 0}], "unitId": 0},
            }],
            "Version": "2.1.0.10",
        })
        .to_string();
        data.handle_line(&sync);

        assert_eq!(data.clients_on_frequency(), 1);
        assert!(!data.is_on_frequency("Stale"));
        assert!(data.is_on_frequency("Viper 2-1"));
    }

    #[test]
    fn off_frequency_peer_is_not_counted() {
        let data = client();
        data.handle_line(&peer_json(&Guid::random(), "Hog 1-1", msg_type::UPDATE, 30.0e6));
        assert_eq!(data.clients_on_frequency(), 0);
        assert!(!data.is_on_frequency("Hog 1-1"));
    }

    #[test]
    fn own_guid_is_excluded_from_peer_count() {
        let data = client();
        let line = peer_json(&data.guid.clone(), "Darkstar", msg_type::UPDATE, 251.0e6);
        data.handle_line(&line);
        assert_eq!(data.clients_on_frequency(), 0);
    }

    #[test]
    fn malformed_and_unknown_messages_are_dropped() {
        let data = client();
        data.handle_line("not json at all");
        data.handle_line("{\"MsgType\": 99, \"Version\": \"x\"}");
        assert_eq!(data.clients_on_frequency(), 0);
    }

    #[test]
    fn info_carries_configured_identity() {
        let config = Arc::new(ClientConfig {
            name: "Overlord".into(),
            coalition: Coalition::Red,
            ..ClientConfig::default()
        });
        let radios = Arc::new(vec![Radio {
            frequency_hz: 133.0e6,
            modulation: Modulation::Am,
        }]);
        let data = DataClient::new(Guid::random(), config, radios);

        let info = data.info();
        assert_eq!(info.name, "Overlord");
        assert_eq!(info.coalition, 1);
        assert_eq!(info.radio_info.unwrap().radios.len(), 1);
    }
}

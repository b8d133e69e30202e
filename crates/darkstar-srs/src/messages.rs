//! Control-plane message types.
//!
//! The data protocol is line-oriented JSON: one `NetworkMessage` per
//! newline-terminated line, field names matching the SRS server. Unknown
//! message kinds and unknown modulations are tolerated so a server upgrade
//! does not take the client down.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use darkstar_core::Coalition;

use crate::guid::Guid;

/// Protocol version advertised in every message.
pub const PROTOCOL_VERSION: &str = "2.1.0.10";

/// Two radios are tuned together when their frequencies agree this closely.
pub const FREQUENCY_TOLERANCE_HZ: f64 = 100.0;

/// Message kinds pushed over the data socket.
pub mod msg_type {
    pub const UPDATE: u8 = 1;
    pub const PING: u8 = 2;
    pub const SYNC: u8 = 3;
    pub const RADIO_UPDATE: u8 = 4;
    pub const SERVER_SETTINGS: u8 = 5;
    pub const CLIENT_DISCONNECT: u8 = 6;
    pub const VERSION_MISMATCH: u8 = 7;
}

/// Radio modulation modes, wire-encoded as small integers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", from = "u8")]
pub enum Modulation {
    Am,
    Fm,
    #[default]
    Disabled,
    HaveQuick,
}

impl From<Modulation> for u8 {
    fn from(modulation: Modulation) -> u8 {
        match modulation {
            Modulation::Am => 0,
            Modulation::Fm => 1,
            Modulation::Disabled => 3,
            Modulation::HaveQuick => 4,
        }
    }
}

impl From<u8> for Modulation {
    fn from(value: u8) -> Modulation {
        match value {
            0 => Modulation::Am,
            1 => Modulation::Fm,
            4 => Modulation::HaveQuick,
            // Intercom and friends: tuned to nothing we decode
            _ => Modulation::Disabled,
        }
    }
}

/// One tuned radio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Radio {
    #[serde(rename = "freq")]
    pub frequency_hz: f64,
    #[serde(rename = "modulation")]
    pub modulation: Modulation,
}

impl Radio {
    /// Whether another radio is close enough to hear this one.
    pub fn matches(&self, other: &Radio) -> bool {
        self.modulation == other.modulation
            && (self.frequency_hz - other.frequency_hz).abs() <= FREQUENCY_TOLERANCE_HZ
    }

    /// Whether a voice frame on the given tuning would be audible here.
    pub fn hears(&self, frequency_hz: f64, modulation: Modulation) -> bool {
        self.matches(&Radio {
            frequency_hz,
            modulation,
        })
    }
}

/// Radio stack advertised by a client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RadioInfo {
    #[serde(rename = "radios", default)]
    pub radios: Vec<Radio>,
    #[serde(rename = "unitId", default)]
    pub unit_id: u32,
}

/// A client as it appears in the server registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientInfo {
    #[serde(rename = "ClientGuid")]
    pub guid: Guid,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Coalition")]
    pub coalition: u8,
    #[serde(rename = "RadioInfo", default, skip_serializing_if = "Option::is_none")]
    pub radio_info: Option<RadioInfo>,
}

impl ClientInfo {
    /// Whether this peer shares at least one radio with the given stack.
    pub fn shares_frequency_with(&self, radios: &[Radio]) -> bool {
        let Some(info) = &self.radio_info else {
            return false;
        };
        info.radios
            .iter()
            .any(|theirs| radios.iter().any(|ours| ours.matches(theirs)))
    }
}

/// Coalition identifiers on the SRS wire: spectators are 0.
pub fn srs_coalition(coalition: Coalition) -> u8 {
    match coalition {
        Coalition::Red => 1,
        Coalition::Blue => 2,
        Coalition::Neutral => 0,
    }
}

/// One line of the data protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkMessage {
    #[serde(rename = "MsgType")]
    pub msg_type: u8,
    #[serde(rename = "Client", default, skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientInfo>,
    #[serde(rename = "Clients", default, skip_serializing_if = "Vec::is_empty")]
    pub clients: Vec<ClientInfo>,
    #[serde(
        rename = "ServerSettings",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub server_settings: Option<HashMap<String, String>>,
    #[serde(rename = "Version", default)]
    pub version: String,
}

impl NetworkMessage {
    fn with_client(msg_type: u8, client: ClientInfo) -> Self {
        Self {
            msg_type,
            client: Some(client),
            clients: Vec::new(),
            server_settings: None,
            version: PROTOCOL_VERSION.to_owned(),
        }
    }

    /// The handshake sent once after connecting.
    pub fn sync(client: ClientInfo) -> Self {
        Self::with_client(msg_type::SYNC, client)
    }

    /// The periodic heartbeat carrying current tuning.
    pub fn radio_update(client: ClientInfo) -> Self {
        Self::with_client(msg_type::RADIO_UPDATE, client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn radio(mhz: f64) -> Radio {
        Radio {
            frequency_hz: mhz * 1e6,
            modulation: Modulation::Am,
        }
    }

    #[test]
    fn frequency_match_tolerance() {
        let tuned = radio(251.0);
        assert!(tuned.hears(251.000_09e6, Modulation::Am));
        assert!(!tuned.hears(251.001e6, Modulation::Am));
        assert!(!tuned.hears(251.0e6, Modulation::Fm));
    }

    #[test]
    fn modulation_wire_values_roundtrip() {
        for m in [
            Modulation::Am,
            Modulation::Fm,
            Modulation::Disabled,
            Modulation::HaveQuick,
        ] {
            assert_eq!(Modulation::from(u8::from(m)), m);
        }
        // Unknown modes degrade to Disabled instead of failing the message
        assert_eq!(Modulation::from(2), Modulation::Disabled);
    }

    #[test]
    fn sync_message_roundtrips() {
        let msg = NetworkMessage::sync(ClientInfo {
            guid: Guid::random(),
            name: "Darkstar".into(),
            coalition: srs_coalition(Coalition::Blue),
            radio_info: Some(RadioInfo {
                radios: vec![radio(251.0)],
                unit_id: 0,
            }),
        });
        let line = serde_json::to_string(&msg).unwrap();
        assert!(line.contains("\"MsgType\":3"));
        assert!(line.contains("\"Coalition\":2"));

        let parsed: NetworkMessage = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed.msg_type, msg_type::SYNC);
        assert_eq!(parsed.client, msg.client);
        assert_eq!(parsed.version, PROTOCOL_VERSION);
    }

    #[test]
    fn peer_without_radio_info_shares_nothing() {
        let peer = ClientInfo {
            guid: Guid::random(),
            name: "Silent".into(),
            coalition: 1,
            radio_info: None,
        };
        assert!(!peer.shares_frequency_with(&[radio(251.0)]));
    }
}

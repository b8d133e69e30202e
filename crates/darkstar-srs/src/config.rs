//! Client configuration.

use std::time::Duration;

use darkstar_core::Coalition;

use crate::error::SrsError;
use crate::messages::{Modulation, Radio};

/// Everything the client needs to join an SRS server. Checked once by
/// [`crate::SrsClient::new`]; a bad entry is fatal at construction.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// `host:port` of the SRS server. The same port serves the TCP data
    /// protocol and the UDP voice protocol.
    pub address: String,
    /// Display name shown in the server client list.
    pub name: String,
    pub coalition: Coalition,
    /// Radios to advertise and listen on.
    pub radios: Vec<Radio>,
    /// In-game unit this client speaks for; zero for an external client.
    pub unit_id: u32,
    /// PCM sample rate of transmitted and received audio.
    pub sample_rate: u32,
    /// How often to ping the voice socket.
    pub ping_interval: Duration,
    /// How long without a ping acknowledgement before the client declares
    /// the server gone.
    pub ping_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: "localhost:5002".into(),
            name: "Darkstar".into(),
            coalition: Coalition::Blue,
            radios: vec![Radio {
                frequency_hz: 251.0e6,
                modulation: Modulation::Am,
            }],
            unit_id: 0,
            sample_rate: 16_000,
            ping_interval: Duration::from_secs(5),
            ping_timeout: Duration::from_secs(60),
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<(), SrsError> {
        let (host, port) = self
            .address
            .rsplit_once(':')
            .ok_or_else(|| SrsError::Config(format!("address {:?} is not host:port", self.address)))?;
        if host.is_empty() {
            return Err(SrsError::Config("address has an empty host".into()));
        }
        if port.parse::<u16>().is_err() {
            return Err(SrsError::Config(format!("address port {port:?} is not a number")));
        }
        if self.name.trim().is_empty() {
            return Err(SrsError::Config("client name is empty".into()));
        }
        if self.radios.is_empty() {
            return Err(SrsError::Config("no radios configured".into()));
        }
        for radio in &self.radios {
            if !radio.frequency_hz.is_finite() || radio.frequency_hz <= 0.0 {
                return Err(SrsError::Config(format!(
                    "radio frequency {} Hz is not usable",
                    radio.frequency_hz
                )));
            }
        }
        if self.sample_rate == 0 {
            return Err(SrsError::Config("sample rate is zero".into()));
        }
        if self.ping_timeout < self.ping_interval {
            return Err(SrsError::Config(
                "ping timeout shorter than ping interval".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(ClientConfig::default().validate().is_ok());
    }

    #[test]
    fn bad_entries_are_fatal() {
        let mut config = ClientConfig {
            address: "no-port".into(),
            ..ClientConfig::default()
        };
        assert!(matches!(config.validate(), Err(SrsError::Config(_))));

        config.address = "srs.example.com:5002".into();
        config.radios.clear();
        assert!(matches!(config.validate(), Err(SrsError::Config(_))));

        config.radios = vec![Radio {
            frequency_hz: -1.0,
            modulation: Modulation::Am,
        }];
        assert!(matches!(config.validate(), Err(SrsError::Config(_))));
    }
}

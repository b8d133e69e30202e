//! Darkstar SRS - a bespoke SimpleRadio-Standalone client.
//!
//! Two sockets operate in tandem under one GUID: a TCP data session for the
//! client registry and radio tuning, and a UDP voice session for keepalive
//! pings and PCM voice frames. [`SrsClient::run`] supervises both until it
//! is cancelled or a transport or liveness error ends the session.

pub mod audio;
pub mod config;
pub mod data;
pub mod error;
pub mod guid;
pub mod messages;
pub mod packet;

use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinSet;
use tokio::time::interval;

use crate::audio::AudioClient;
use crate::data::DataClient;

pub use crate::audio::Transmission;
pub use crate::config::ClientConfig;
pub use crate::data::ConnectionState;
pub use crate::error::SrsError;
pub use crate::guid::Guid;
pub use crate::messages::{Modulation, Radio};
pub use crate::packet::{VoiceFrequency, VoicePacket};

/// A SimpleRadio-Standalone client.
pub struct SrsClient {
    guid: Guid,
    config: Arc<ClientConfig>,
    data: Arc<DataClient>,
    audio: Arc<AudioClient>,
    receiver: Mutex<Option<mpsc::Receiver<Transmission>>>,
}

impl SrsClient {
    /// Validate the configuration and assemble both protocol clients under
    /// a freshly generated GUID.
    pub fn new(config: ClientConfig) -> Result<Self, SrsError> {
        config.validate()?;
        let config = Arc::new(config);
        let guid = Guid::random();
        let radios = Arc::new(config.radios.clone());

        let data = Arc::new(DataClient::new(guid.clone(), config.clone(), radios.clone()));
        let (audio, receiver) = AudioClient::new(guid.clone(), config.clone(), radios);

        Ok(Self {
            guid,
            config,
            data,
            audio: Arc::new(audio),
            receiver: Mutex::new(Some(receiver)),
        })
    }

    /// The name of the client as it appears in the SRS client list.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn guid(&self) -> &Guid {
        &self.guid
    }

    /// The radios the client is listening on.
    pub fn frequencies(&self) -> Vec<Radio> {
        self.config.radios.clone()
    }

    /// The channel of received transmissions: F32LE PCM audio labeled with
    /// the sender's GUID. Yields the receiver once; later calls get `None`.
    pub fn take_receiver(&self) -> Option<mpsc::Receiver<Transmission>> {
        self.receiver.lock().expect("receiver lock poisoned").take()
    }

    /// Queue F32LE PCM audio for transmission on every tuned radio.
    pub fn transmit(&self, audio: Vec<u8>) {
        self.audio.transmit(audio);
    }

    /// Whether the named unit is on any of the client's frequencies.
    pub fn is_on_frequency(&self, unit_name: &str) -> bool {
        self.data.is_on_frequency(unit_name)
    }

    /// Number of peers sharing at least one of the client's frequencies.
    pub fn clients_on_frequency(&self) -> usize {
        self.data.clients_on_frequency()
    }

    /// Wall-clock instant of the last ping acknowledgement from the server.
    pub fn last_ping(&self) -> Instant {
        self.audio.last_ping()
    }

    pub fn state(&self) -> ConnectionState {
        self.data.state()
    }

    /// Connect both planes and supervise the worker tasks. Should be called
    /// exactly once. Returns on the first transport or liveness error, or
    /// with [`SrsError::Cancelled`] once the shutdown signal fires; either
    /// way every worker has drained by the time this returns.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> Result<(), SrsError> {
        let (reader, writer) = self.data.connect().await?;
        let socket = self.audio.connect().await?;

        let (cancel_tx, _) = broadcast::channel(1);
        let mut workers: JoinSet<Result<(), SrsError>> = JoinSet::new();

        let data = self.data.clone();
        let cancel = cancel_tx.subscribe();
        workers.spawn(async move { data.read_loop(reader, cancel).await });

        let data = self.data.clone();
        let cancel = cancel_tx.subscribe();
        workers.spawn(async move { data.heartbeat_loop(writer, cancel).await });

        let audio = self.audio.clone();
        let udp = socket.clone();
        let cancel = cancel_tx.subscribe();
        workers.spawn(async move { audio.recv_loop(udp, cancel).await });

        let audio = self.audio.clone();
        let udp = socket.clone();
        let cancel = cancel_tx.subscribe();
        workers.spawn(async move { audio.ping_loop(udp, cancel).await });

        let audio = self.audio.clone();
        let cancel = cancel_tx.subscribe();
        workers.spawn(async move { audio.transmit_loop(socket, cancel).await });

        let mut watchdog = interval(self.config.ping_interval);
        let result = loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("stopping SRS client due to shutdown signal");
                    break Err(SrsError::Cancelled);
                }
                Some(finished) = workers.join_next() => {
                    match finished {
                        Ok(Ok(())) => continue,
                        Ok(Err(err)) => {
                            tracing::error!("SRS worker failed: {err}");
                            break Err(err);
                        }
                        Err(join_err) => {
                            break Err(SrsError::Protocol(format!("SRS worker panicked: {join_err}")));
                        }
                    }
                }
                _ = watchdog.tick() => {
                    if self.audio.last_ping().elapsed() > self.config.ping_timeout {
                        tracing::warn!("stopped receiving pings from the SRS server");
                        break Err(SrsError::Liveness);
                    }
                }
            }
        };

        // Tear down every worker and wait for each to drain
        let _ = cancel_tx.send(());
        while let Some(finished) = workers.join_next().await {
            if let Ok(Err(err)) = finished {
                tracing::debug!("SRS worker exited during teardown: {err}");
            }
        }

        result
    }
}

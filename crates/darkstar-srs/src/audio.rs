//! UDP voice plane: keepalive pings, frame ingestion with per-origin
//! reassembly, and the paced transmit writer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use tokio::net::UdpSocket;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, sleep};

use crate::config::ClientConfig;
use crate::error::SrsError;
use crate::guid::{Guid, GUID_LENGTH};
use crate::messages::Radio;
use crate::packet::{VoiceFrequency, VoicePacket};

/// Largest audio payload per voice packet. Keeps the whole datagram with
/// headers under a 1500-byte MTU.
pub const MAX_AUDIO_CHUNK: usize = 1_024;

/// Spacing between consecutive outbound voice packets.
const FRAME_INTERVAL: Duration = Duration::from_millis(20);

/// A receive session stays open while packets from its origin arrive at
/// most this far apart; past the gap the buffered audio is one transmission.
const RECEIVE_GAP: Duration = Duration::from_millis(200);

/// How often idle receive sessions are checked for the gap.
const FLUSH_INTERVAL: Duration = Duration::from_millis(50);

/// Capacity of the inbound transmission channel. Voice is real-time: when
/// the consumer falls behind, transmissions are dropped, not queued forever.
const RECEIVE_CAPACITY: usize = 64;

/// One completed radio transmission: F32LE PCM audio and who sent it.
#[derive(Debug, Clone, PartialEq)]
pub struct Transmission {
    pub origin: Guid,
    pub audio: Vec<u8>,
}

struct RxSession {
    audio: Vec<u8>,
    last_packet: Instant,
}

/// Client for the SRS voice protocol.
pub(crate) struct AudioClient {
    guid: Guid,
    config: Arc<ClientConfig>,
    radios: Arc<Vec<Radio>>,
    last_ping: RwLock<Instant>,
    packet_id: AtomicU64,
    rx_tx: mpsc::Sender<Transmission>,
    tx_tx: mpsc::UnboundedSender<Vec<u8>>,
    tx_rx: Mutex<Option<mpsc::UnboundedReceiver<Vec<u8>>>>,
}

impl AudioClient {
    pub fn new(
        guid: Guid,
        config: Arc<ClientConfig>,
        radios: Arc<Vec<Radio>>,
    ) -> (Self, mpsc::Receiver<Transmission>) {
        let (rx_tx, rx_rx) = mpsc::channel(RECEIVE_CAPACITY);
        let (tx_tx, tx_rx) = mpsc::unbounded_channel();
        let client = Self {
            guid,
            config,
            radios,
            last_ping: RwLock::new(Instant::now()),
            packet_id: AtomicU64::new(1),
            rx_tx,
            tx_tx,
            tx_rx: Mutex::new(Some(tx_rx)),
        };
        (client, rx_rx)
    }

    /// Bind the voice socket and aim it at the server.
    pub async fn connect(&self) -> Result<Arc<UdpSocket>, SrsError> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(&self.config.address).await?;
        *self.last_ping.write().expect("ping lock poisoned") = Instant::now();
        Ok(Arc::new(socket))
    }

    /// Wall-clock instant of the most recent ping acknowledgement.
    pub fn last_ping(&self) -> Instant {
        *self.last_ping.read().expect("ping lock poisoned")
    }

    /// Queue audio for transmission on every tuned radio.
    pub fn transmit(&self, audio: Vec<u8>) {
        if self.tx_tx.send(audio).is_err() {
            tracing::warn!("dropping transmission: voice writer is gone");
        }
    }

    /// Keep NAT open and let the server confirm our presence.
    pub async fn ping_loop(
        &self,
        socket: Arc<UdpSocket>,
        mut cancel: broadcast::Receiver<()>,
    ) -> Result<(), SrsError> {
        let mut ticker = interval(self.config.ping_interval);
        loop {
            tokio::select! {
                _ = cancel.recv() => return Ok(()),
                _ = ticker.tick() => {
                    socket.send(self.guid.as_bytes()).await?;
                }
            }
        }
    }

    /// Ingest voice datagrams and reassemble them into transmissions.
    pub async fn recv_loop(
        &self,
        socket: Arc<UdpSocket>,
        mut cancel: broadcast::Receiver<()>,
    ) -> Result<(), SrsError> {
        let mut buf = vec![0u8; 64 * 1024];
        let mut sessions: HashMap<Guid, RxSession> = HashMap::new();
        let mut flush_ticker = interval(FLUSH_INTERVAL);

        loop {
            tokio::select! {
                _ = cancel.recv() => {
                    // Hand over whatever was mid-air when we were stopped
                    for (origin, session) in sessions.drain() {
                        self.emit(origin, session.audio);
                    }
                    return Ok(());
                }
                _ = flush_ticker.tick() => self.flush_idle(&mut sessions),
                received = socket.recv(&mut buf) => {
                    let length = received?;
                    self.handle_datagram(&buf[..length], &mut sessions);
                }
            }
        }
    }

    fn handle_datagram(&self, datagram: &[u8], sessions: &mut HashMap<Guid, RxSession>) {
        // Anything no longer than a GUID is the server acknowledging a ping
        if datagram.len() <= GUID_LENGTH {
            *self.last_ping.write().expect("ping lock poisoned") = Instant::now();
            return;
        }

        let packet = match VoicePacket::decode(datagram) {
            Ok(packet) => packet,
            Err(err) => {
                tracing::warn!("dropping voice frame: {err}");
                return;
            }
        };

        if packet.origin == self.guid {
            // Our own transmission reflected back
            return;
        }
        let audible = packet
            .frequencies
            .iter()
            .any(|f| self.radios.iter().any(|r| r.hears(f.frequency_hz, f.modulation)));
        if !audible {
            tracing::trace!("voice frame from {} on no tuned radio", packet.origin);
            return;
        }

        let session = sessions.entry(packet.origin).or_insert_with(|| RxSession {
            audio: Vec::new(),
            last_packet: Instant::now(),
        });
        session.audio.extend_from_slice(&packet.audio);
        session.last_packet = Instant::now();
    }

    /// Close every session whose origin has gone quiet for the receive gap.
    fn flush_idle(&self, sessions: &mut HashMap<Guid, RxSession>) {
        let expired: Vec<Guid> = sessions
            .iter()
            .filter(|(_, s)| s.last_packet.elapsed() >= RECEIVE_GAP)
            .map(|(origin, _)| origin.clone())
            .collect();
        for origin in expired {
            if let Some(session) = sessions.remove(&origin) {
                self.emit(origin, session.audio);
            }
        }
    }

    fn emit(&self, origin: Guid, audio: Vec<u8>) {
        if audio.is_empty() {
            return;
        }
        tracing::debug!("transmission from {origin}: {} bytes", audio.len());
        if self.rx_tx.try_send(Transmission { origin, audio }).is_err() {
            tracing::warn!("dropping transmission: receive channel is full or closed");
        }
    }

    /// Drain the transmit queue, segmenting each payload into MTU-sized
    /// packets sent with real-time spacing.
    pub async fn transmit_loop(
        &self,
        socket: Arc<UdpSocket>,
        mut cancel: broadcast::Receiver<()>,
    ) -> Result<(), SrsError> {
        let mut queue = self
            .tx_rx
            .lock()
            .expect("transmit queue lock poisoned")
            .take()
            .ok_or_else(|| SrsError::Protocol("transmit loop started twice".into()))?;

        loop {
            tokio::select! {
                _ = cancel.recv() => return Ok(()),
                queued = queue.recv() => {
                    let Some(audio) = queued else {
                        return Ok(());
                    };
                    for chunk in audio.chunks(MAX_AUDIO_CHUNK) {
                        let packet = VoicePacket::outbound(
                            chunk.to_vec(),
                            self.frequencies(),
                            self.config.unit_id,
                            self.packet_id.fetch_add(1, Ordering::Relaxed),
                            self.guid.clone(),
                        );
                        socket.send(&packet.encode()).await?;
                        tokio::select! {
                            _ = cancel.recv() => return Ok(()),
                            _ = sleep(FRAME_INTERVAL) => {}
                        }
                    }
                }
            }
        }
    }

    /// Current tuning as voice packet frequency entries.
    fn frequencies(&self) -> Vec<VoiceFrequency> {
        self.radios
            .iter()
            .map(|radio| VoiceFrequency {
                frequency_hz: radio.frequency_hz,
                modulation: radio.modulation,
                encryption: 0,
            })
            .collect()
    }
}

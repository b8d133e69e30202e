//! Voice packet codec.
//!
//! Layout on the UDP socket, all integers little-endian:
//!
//! ```text
//! [2B total-len][2B audio-len][2B freq-count]
//! [audio bytes: audio-len]
//! [per frequency: 8B f64 freq-hz | 1B modulation | 4B encryption]
//! [4B unit-id][8B packet-id][1B hop-count]
//! [22B origin GUID][freq-count x 22B relay GUIDs]
//! ```
//!
//! Interoperating with the SRS server depends on this byte layout exactly;
//! do not reorder fields.

use crate::error::SrsError;
use crate::guid::{Guid, GUID_LENGTH};
use crate::messages::Modulation;

const HEADER_LENGTH: usize = 6;
const FREQUENCY_LENGTH: usize = 8 + 1 + 4;
const TAIL_LENGTH: usize = 4 + 8 + 1;

/// A tuning entry carried by a voice packet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceFrequency {
    pub frequency_hz: f64,
    pub modulation: Modulation,
    pub encryption: u32,
}

/// One voice datagram.
#[derive(Debug, Clone, PartialEq)]
pub struct VoicePacket {
    pub audio: Vec<u8>,
    pub frequencies: Vec<VoiceFrequency>,
    pub unit_id: u32,
    pub packet_id: u64,
    pub hops: u8,
    pub origin: Guid,
    pub relays: Vec<Guid>,
}

impl VoicePacket {
    /// A fresh outbound packet: hop count zero and the origin repeated as
    /// the relay entry for every carried frequency.
    pub fn outbound(
        audio: Vec<u8>,
        frequencies: Vec<VoiceFrequency>,
        unit_id: u32,
        packet_id: u64,
        origin: Guid,
    ) -> Self {
        let relays = vec![origin.clone(); frequencies.len()];
        Self {
            audio,
            frequencies,
            unit_id,
            packet_id,
            hops: 0,
            origin,
            relays,
        }
    }

    pub fn encoded_length(&self) -> usize {
        HEADER_LENGTH
            + self.audio.len()
            + self.frequencies.len() * FREQUENCY_LENGTH
            + TAIL_LENGTH
            + GUID_LENGTH
            + self.relays.len() * GUID_LENGTH
    }

    pub fn encode(&self) -> Vec<u8> {
        let total = self.encoded_length();
        let mut buf = Vec::with_capacity(total);

        buf.extend_from_slice(&(total as u16).to_le_bytes());
        buf.extend_from_slice(&(self.audio.len() as u16).to_le_bytes());
        buf.extend_from_slice(&(self.frequencies.len() as u16).to_le_bytes());

        buf.extend_from_slice(&self.audio);

        for freq in &self.frequencies {
            buf.extend_from_slice(&freq.frequency_hz.to_le_bytes());
            buf.push(u8::from(freq.modulation));
            buf.extend_from_slice(&freq.encryption.to_le_bytes());
        }

        buf.extend_from_slice(&self.unit_id.to_le_bytes());
        buf.extend_from_slice(&self.packet_id.to_le_bytes());
        buf.push(self.hops);

        buf.extend_from_slice(self.origin.as_bytes());
        for relay in &self.relays {
            buf.extend_from_slice(relay.as_bytes());
        }

        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self, SrsError> {
        let mut cursor = Cursor::new(buf);

        let total_len = cursor.u16()? as usize;
        if total_len > buf.len() {
            return Err(SrsError::Protocol(format!(
                "voice frame claims {total_len} bytes but only {} arrived",
                buf.len()
            )));
        }
        let audio_len = cursor.u16()? as usize;
        let freq_count = cursor.u16()? as usize;

        let audio = cursor.take(audio_len)?.to_vec();

        let mut frequencies = Vec::with_capacity(freq_count);
        for _ in 0..freq_count {
            let frequency_hz = f64::from_le_bytes(cursor.array()?);
            let modulation = Modulation::from(cursor.u8()?);
            let encryption = u32::from_le_bytes(cursor.array()?);
            frequencies.push(VoiceFrequency {
                frequency_hz,
                modulation,
                encryption,
            });
        }

        let unit_id = u32::from_le_bytes(cursor.array()?);
        let packet_id = u64::from_le_bytes(cursor.array()?);
        let hops = cursor.u8()?;

        let origin = Guid::from_wire(cursor.take(GUID_LENGTH)?)?;
        let mut relays = Vec::with_capacity(freq_count);
        for _ in 0..freq_count {
            relays.push(Guid::from_wire(cursor.take(GUID_LENGTH)?)?);
        }

        Ok(Self {
            audio,
            frequencies,
            unit_id,
            packet_id,
            hops,
            origin,
            relays,
        })
    }
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], SrsError> {
        let end = self.pos.checked_add(len).filter(|&e| e <= self.buf.len());
        let Some(end) = end else {
            return Err(SrsError::Protocol(format!(
                "voice frame truncated at byte {} (wanted {len} more)",
                self.pos
            )));
        };
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, SrsError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, SrsError> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], SrsError> {
        let slice = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet() -> VoicePacket {
        VoicePacket::outbound(
            vec![0x01, 0x02, 0x03, 0x04],
            vec![
                VoiceFrequency {
                    frequency_hz: 251.0e6,
                    modulation: Modulation::Am,
                    encryption: 0,
                },
                VoiceFrequency {
                    frequency_hz: 30.0e6,
                    modulation: Modulation::Fm,
                    encryption: 0,
                },
            ],
            0,
            42,
            Guid::random(),
        )
    }

    #[test]
    fn encode_decode_roundtrip() {
        let original = packet();
        let decoded = VoicePacket::decode(&original.encode()).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(decoded.audio, vec![0x01, 0x02, 0x03, 0x04]);
        assert_eq!(decoded.origin, original.origin);
        assert_eq!(decoded.frequencies, original.frequencies);
    }

    #[test]
    fn header_layout_is_little_endian() {
        let p = packet();
        let bytes = p.encode();
        assert_eq!(
            u16::from_le_bytes([bytes[0], bytes[1]]) as usize,
            bytes.len()
        );
        assert_eq!(u16::from_le_bytes([bytes[2], bytes[3]]), 4);
        assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), 2);
        // Audio payload sits immediately after the header
        assert_eq!(&bytes[6..10], &[0x01, 0x02, 0x03, 0x04]);
        // First frequency follows the audio
        let freq = f64::from_le_bytes(bytes[10..18].try_into().unwrap());
        assert_eq!(freq, 251.0e6);
        assert_eq!(bytes[18], u8::from(Modulation::Am));
    }

    #[test]
    fn truncated_frame_is_rejected() {
        let bytes = packet().encode();
        for cut in [3, 8, bytes.len() - 1] {
            let err = VoicePacket::decode(&bytes[..cut]);
            assert!(matches!(err, Err(SrsError::Protocol(_))), "cut at {cut}");
        }
    }

    #[test]
    fn outbound_packets_start_unhopped() {
        let p = packet();
        assert_eq!(p.hops, 0);
        assert_eq!(p.relays.len(), p.frequencies.len());
    }
}

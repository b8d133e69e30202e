//! SRS peer identifiers.
//!
//! The protocol names every client with a 22-character string: 16 random
//! bytes in URL-safe base64 without padding. The GUID travels both as a JSON
//! string on the control plane and as a fixed-width field in voice packets.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::SrsError;

pub const GUID_LENGTH: usize = 22;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Guid(String);

impl Guid {
    /// A fresh random GUID for this client process.
    pub fn random() -> Self {
        Guid(URL_SAFE_NO_PAD.encode(uuid::Uuid::new_v4().as_bytes()))
    }

    /// Parse the fixed-width GUID field of a voice packet.
    pub fn from_wire(bytes: &[u8]) -> Result<Self, SrsError> {
        if bytes.len() != GUID_LENGTH {
            return Err(SrsError::Protocol(format!(
                "GUID field is {} bytes, want {GUID_LENGTH}",
                bytes.len()
            )));
        }
        let s = std::str::from_utf8(bytes)
            .map_err(|_| SrsError::Protocol("GUID is not valid UTF-8".into()))?;
        Ok(Guid(s.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 22 wire bytes of this GUID.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

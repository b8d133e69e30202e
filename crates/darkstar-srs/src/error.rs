//! Error kinds for the SRS client.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SrsError {
    /// Invalid address, coalition or radio entry. Fatal at construction.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Socket connect, read or write failure. Fatal to the client.
    #[error("transport failure: {0}")]
    Transport(#[from] std::io::Error),
    /// Malformed control message or truncated voice frame. Callers log and
    /// drop the offending datagram; never fatal on its own.
    #[error("protocol violation: {0}")]
    Protocol(String),
    /// No UDP pings from the server for longer than the ping timeout.
    #[error("stopped receiving pings from the server")]
    Liveness,
    /// The supervising task asked the client to stop.
    #[error("client cancelled")]
    Cancelled,
}

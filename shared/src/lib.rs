pub mod events;
pub mod model;
pub mod socket;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("empty frame")]
    Empty,
    #[error("unknown frame type `{0}`")]
    UnknownFrame(char),
    #[error("unknown packet type `{0}`")]
    UnknownPacket(char),
    #[error("malformed packet: {0}")]
    Malformed(String),
    #[error("{0} are not supported")]
    Unsupported(&'static str),
    #[error("invalid payload: {0}")]
    Json(#[from] serde_json::Error),
}

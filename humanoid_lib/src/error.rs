//! Error taxonomy for the command pipeline.
//!
//! Only [`PipelineError`] is fatal. Everything else is recovered where it is
//! raised: the datagram or cycle is dropped and the loop carries on.

use std::io;

/// Raised by the pose codec for payloads that cannot be turned into a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Payload is not valid UTF-8 text
    #[error("payload is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    /// Payload text is not a well-formed JSON object
    #[error("payload is not a well-formed record: {0}")]
    Malformed(String),
}

/// Raised by the limb solver for limbs it cannot turn into angles.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum SolveError {
    #[error("limb segment {segment} has zero length")]
    DegenerateSegment { segment: Segment },

    /// Coordinates too large for the segment lengths or angles to be finite
    #[error("limb geometry is not finite")]
    NonFinite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Upper,
    Lower,
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Segment::Upper => write!(f, "upper"),
            Segment::Lower => write!(f, "lower"),
        }
    }
}

/// Failures reported by an actuation gateway.
#[derive(Debug, thiserror::Error)]
pub enum ActuationError {
    /// The device handle is gone; nothing more can be sent
    #[error("actuation gateway is not connected")]
    NotConnected,

    /// Board did not acknowledge
    #[error("actuation gateway is not ready")]
    NotReady,

    /// Board refused or failed a single request
    #[error("actuation request rejected: {0}")]
    Rejected(String),

    #[error("actuation I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ActuationError {
    /// Whether the error means the device handle itself was lost.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ActuationError::NotConnected | ActuationError::Io(_))
    }
}

/// The datagram socket failed or was closed underneath the receiver.
#[derive(Debug, thiserror::Error)]
#[error("network transport failed: {0}")]
pub struct TransportError(#[from] pub io::Error);

/// Board answered a motion status query with a negative code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("motion {motion_id} status query failed with code {code}")]
pub struct MotionStatusError {
    pub motion_id: u8,
    pub code: i32,
}

/// Errors that end a pipeline thread and trigger orderly shutdown.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("actuation device lost: {0}")]
    Actuation(#[from] ActuationError),

    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{0} thread panicked")]
    Panicked(&'static str),
}

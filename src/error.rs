//! Crate-wide error types
//!
//! Errors are grouped by the subsystem that produces them. Per-packet
//! faults (malformed RTP, full destination queue) are deliberately *not*
//! represented here: the relay loops log and continue on those, so they
//! never cross an API boundary as an `Error`.

use std::io;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// I/O error (socket bind, pipe access, ...)
    Io(io::Error),
    /// Failed to spawn the transcoding process
    TranscoderSpawn(io::Error),
    /// The transcoding process exposed no stdin/stderr pipe
    TranscoderPipe(&'static str),
    /// The relay port pool has no free endpoint pair
    PortsExhausted,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::TranscoderSpawn(e) => write!(f, "Failed to spawn transcoder: {}", e),
            Error::TranscoderPipe(which) => {
                write!(f, "Transcoder process has no {} pipe", which)
            }
            Error::PortsExhausted => write!(f, "Relay port pool exhausted"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) | Error::TranscoderSpawn(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

/// Error parsing a real-time-transport packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RtpError {
    /// Datagram shorter than the fixed header plus declared CSRC list
    TooShort(usize),
    /// Unsupported protocol version field
    BadVersion(u8),
    /// Header extension length exceeds the datagram
    BadExtension,
    /// Padding length field exceeds the payload
    BadPadding,
}

impl std::fmt::Display for RtpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RtpError::TooShort(len) => write!(f, "Packet too short: {} bytes", len),
            RtpError::BadVersion(v) => write!(f, "Unsupported RTP version: {}", v),
            RtpError::BadExtension => write!(f, "Header extension overruns packet"),
            RtpError::BadPadding => write!(f, "Padding length overruns payload"),
        }
    }
}

impl std::error::Error for RtpError {}

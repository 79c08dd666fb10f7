use thiserror::Error;

/// Errors surfaced by the browser backend.
///
/// Driver failures never cross into the host framework as panics; they are
/// converted into one of these variants at the device-binding boundary and
/// kept as the binding's last error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("configuration failed: {0}")]
    Configuration(String),

    #[error("driver error: {0}")]
    Driver(String),

    #[error("resource unavailable: {0}")]
    Resource(String),

    #[error("device is not open")]
    DeviceNotOpen,

    #[error("MIDI device not found: {0}")]
    MidiDeviceNotFound(String),

    #[error("window peer not found: {0}")]
    PeerNotFound(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("timeout")]
    Timeout,

    #[error("unknown error: {0}")]
    Unknown(String),
}

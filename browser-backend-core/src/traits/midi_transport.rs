use std::sync::Arc;

use crate::models::error::BackendError;
use crate::models::midi_models::MidiMessage;

/// Receives messages from an open MIDI input.
///
/// Called from whatever thread the transport delivers on.
pub trait MidiInputCallback: Send + Sync {
    fn handle_incoming(&self, message: &MidiMessage);

    /// SysEx data, possibly split across several deliveries.
    fn handle_partial_sysex(&self, data: &[u8], timestamp: f64);
}

/// Sink for messages delivered by the transport to an input port.
pub type MidiInputSink = Arc<dyn Fn(MidiMessage) + Send + Sync + 'static>;

/// An opened output endpoint.
pub trait MidiOutputPort: Send {
    fn send(&mut self, bytes: &[u8]) -> Result<(), BackendError>;
}

/// Platform MIDI layer that opens endpoints listed by the device directory.
pub trait MidiTransport: Send + Sync {
    /// Open the input at `index` (named `name`), delivering into `sink`.
    fn open_input(&self, index: usize, name: &str, sink: MidiInputSink) -> Result<(), BackendError>;

    fn close_input(&self, index: usize);

    fn open_output(&self, index: usize, name: &str) -> Result<Box<dyn MidiOutputPort>, BackendError>;
}

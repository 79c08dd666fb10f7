use serde::{Deserialize, Serialize};

/// A MIDI endpoint as listed by the device directory.
///
/// The identifier is the endpoint's index in its list, as a decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MidiDeviceInfo {
    pub name: String,
    pub identifier: String,
}

/// Raw MIDI bytes plus a timestamp in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct MidiMessage {
    pub bytes: Vec<u8>,
    pub timestamp: f64,
}

impl MidiMessage {
    pub const SYSEX_START: u8 = 0xF0;

    pub fn new(bytes: Vec<u8>, timestamp: f64) -> Self {
        Self { bytes, timestamp }
    }

    pub fn is_sysex(&self) -> bool {
        self.bytes.first() == Some(&Self::SYSEX_START)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_sysex() {
        assert!(MidiMessage::new(vec![0xF0, 0x7E, 0xF7], 0.0).is_sysex());
        assert!(!MidiMessage::new(vec![0x90, 60, 100], 0.0).is_sysex());
        assert!(!MidiMessage::new(Vec::new(), 0.0).is_sysex());
    }
}

use parking_lot::RwLock;

use crate::models::midi_models::MidiDeviceInfo;

/// Live list of MIDI endpoints, kept current by the transport's hot-plug
/// notifications.
///
/// Identifiers are the index the transport reported on connection. Removal
/// goes by name, so two endpoints sharing a name disappear together.
#[derive(Default)]
pub struct MidiDeviceDirectory {
    inputs: RwLock<Vec<MidiDeviceInfo>>,
    outputs: RwLock<Vec<MidiDeviceInfo>>,
}

impl MidiDeviceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input_added(&self, index: usize, name: &str) {
        log::info!("MIDI input connected: {} - {}", index, name);
        self.inputs.write().push(Self::info(index, name));
    }

    pub fn input_removed(&self, name: &str) {
        log::info!("MIDI input disconnected: {}", name);
        self.inputs.write().retain(|d| d.name != name);
    }

    pub fn output_added(&self, index: usize, name: &str) {
        log::info!("MIDI output connected: {} - {}", index, name);
        self.outputs.write().push(Self::info(index, name));
    }

    pub fn output_removed(&self, name: &str) {
        log::info!("MIDI output disconnected: {}", name);
        self.outputs.write().retain(|d| d.name != name);
    }

    pub fn inputs(&self) -> Vec<MidiDeviceInfo> {
        self.inputs.read().clone()
    }

    pub fn outputs(&self) -> Vec<MidiDeviceInfo> {
        self.outputs.read().clone()
    }

    pub fn input_names(&self) -> Vec<String> {
        self.inputs.read().iter().map(|d| d.name.clone()).collect()
    }

    pub fn output_names(&self) -> Vec<String> {
        self.outputs.read().iter().map(|d| d.name.clone()).collect()
    }

    pub fn default_input(&self) -> Option<MidiDeviceInfo> {
        self.inputs.read().first().cloned()
    }

    pub fn default_output(&self) -> Option<MidiDeviceInfo> {
        self.outputs.read().first().cloned()
    }

    pub(crate) fn find_input(&self, identifier: &str) -> Option<MidiDeviceInfo> {
        self.inputs.read().iter().find(|d| d.identifier == identifier).cloned()
    }

    pub(crate) fn find_output(&self, identifier: &str) -> Option<MidiDeviceInfo> {
        self.outputs.read().iter().find(|d| d.identifier == identifier).cloned()
    }

    fn info(index: usize, name: &str) -> MidiDeviceInfo {
        MidiDeviceInfo {
            name: name.to_string(),
            identifier: index.to_string(),
        }
    }
}

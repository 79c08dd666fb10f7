use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::error::BackendError;
use crate::models::midi_models::MidiMessage;
use crate::traits::midi_transport::{MidiInputSink, MidiOutputPort, MidiTransport};

#[derive(Default)]
struct LoopbackState {
    inputs: HashMap<usize, MidiInputSink>,
    sent: HashMap<usize, Vec<Vec<u8>>>,
}

/// In-process `MidiTransport`: outputs record what they send, inputs receive
/// whatever is pushed through `deliver`.
#[derive(Clone, Default)]
pub struct LoopbackMidiTransport {
    state: Arc<Mutex<LoopbackState>>,
}

impl LoopbackMidiTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand `message` to the input open at `index`. Returns false if none is.
    pub fn deliver(&self, index: usize, message: MidiMessage) -> bool {
        let sink = self.state.lock().inputs.get(&index).cloned();
        match sink {
            Some(sink) => {
                sink(message);
                true
            }
            None => false,
        }
    }

    pub fn is_input_open(&self, index: usize) -> bool {
        self.state.lock().inputs.contains_key(&index)
    }

    pub fn sent(&self, index: usize) -> Vec<Vec<u8>> {
        self.state.lock().sent.get(&index).cloned().unwrap_or_default()
    }
}

impl MidiTransport for LoopbackMidiTransport {
    fn open_input(&self, index: usize, name: &str, sink: MidiInputSink) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        if state.inputs.contains_key(&index) {
            return Err(BackendError::Resource(format!("MIDI input {} ({}) is already open", index, name)));
        }
        state.inputs.insert(index, sink);
        Ok(())
    }

    fn close_input(&self, index: usize) {
        self.state.lock().inputs.remove(&index);
    }

    fn open_output(&self, index: usize, _name: &str) -> Result<Box<dyn MidiOutputPort>, BackendError> {
        Ok(Box::new(LoopbackOutput {
            index,
            state: Arc::clone(&self.state),
        }))
    }
}

struct LoopbackOutput {
    index: usize,
    state: Arc<Mutex<LoopbackState>>,
}

impl MidiOutputPort for LoopbackOutput {
    fn send(&mut self, bytes: &[u8]) -> Result<(), BackendError> {
        self.state.lock().sent.entry(self.index).or_default().push(bytes.to_vec());
        Ok(())
    }
}

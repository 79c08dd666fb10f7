use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::midi::directory::MidiDeviceDirectory;
use crate::models::error::BackendError;
use crate::models::midi_models::{MidiDeviceInfo, MidiMessage};
use crate::traits::midi_transport::{MidiInputCallback, MidiInputSink, MidiOutputPort, MidiTransport};

/// Smallest timestamp handed to callbacks; transports may report zero.
const MIN_TIMESTAMP: f64 = 1e-8;

fn transport_index(info: &MidiDeviceInfo) -> Result<usize, BackendError> {
    info.identifier
        .parse()
        .map_err(|_| BackendError::MidiDeviceNotFound(info.identifier.clone()))
}

/// An open MIDI input. Messages reach the callback only between `start` and
/// `stop`.
pub struct MidiInput {
    info: MidiDeviceInfo,
    index: usize,
    transport: Arc<dyn MidiTransport>,
    running: Arc<AtomicBool>,
}

impl MidiInput {
    pub fn open(
        directory: &MidiDeviceDirectory,
        transport: Arc<dyn MidiTransport>,
        identifier: &str,
        callback: Arc<dyn MidiInputCallback>,
    ) -> Result<Self, BackendError> {
        let info = directory
            .find_input(identifier)
            .ok_or_else(|| BackendError::MidiDeviceNotFound(identifier.to_string()))?;
        let index = transport_index(&info)?;
        let running = Arc::new(AtomicBool::new(false));

        let gate = Arc::clone(&running);
        let sink: MidiInputSink = Arc::new(move |message: MidiMessage| {
            if !gate.load(Ordering::Acquire) {
                return;
            }
            if message.is_sysex() {
                callback.handle_partial_sysex(&message.bytes, message.timestamp);
            } else {
                let timestamp = if message.timestamp > 0.0 {
                    message.timestamp
                } else {
                    MIN_TIMESTAMP
                };
                callback.handle_incoming(&MidiMessage::new(message.bytes, timestamp));
            }
        });

        transport.open_input(index, &info.name, sink)?;
        log::info!("Opened MIDI input {} ({})", info.name, info.identifier);

        Ok(Self {
            info,
            index,
            transport,
            running,
        })
    }

    /// Open the input at `position` in the directory's current list.
    pub fn open_by_index(
        directory: &MidiDeviceDirectory,
        transport: Arc<dyn MidiTransport>,
        position: usize,
        callback: Arc<dyn MidiInputCallback>,
    ) -> Result<Self, BackendError> {
        let info = directory
            .inputs()
            .get(position)
            .cloned()
            .ok_or_else(|| BackendError::MidiDeviceNotFound(format!("input #{}", position)))?;
        Self::open(directory, transport, &info.identifier, callback)
    }

    pub fn info(&self) -> &MidiDeviceInfo {
        &self.info
    }

    pub fn start(&self) {
        self.running.store(true, Ordering::Release);
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl Drop for MidiInput {
    fn drop(&mut self) {
        self.stop();
        self.transport.close_input(self.index);
    }
}

pub struct MidiOutput {
    info: MidiDeviceInfo,
    port: Box<dyn MidiOutputPort>,
}

impl MidiOutput {
    pub fn open(
        directory: &MidiDeviceDirectory,
        transport: &dyn MidiTransport,
        identifier: &str,
    ) -> Result<Self, BackendError> {
        let info = directory
            .find_output(identifier)
            .ok_or_else(|| BackendError::MidiDeviceNotFound(identifier.to_string()))?;
        let port = transport.open_output(transport_index(&info)?, &info.name)?;
        log::info!("Opened MIDI output {} ({})", info.name, info.identifier);
        Ok(Self { info, port })
    }

    pub fn open_by_index(
        directory: &MidiDeviceDirectory,
        transport: &dyn MidiTransport,
        position: usize,
    ) -> Result<Self, BackendError> {
        let info = directory
            .outputs()
            .get(position)
            .cloned()
            .ok_or_else(|| BackendError::MidiDeviceNotFound(format!("output #{}", position)))?;
        Self::open(directory, transport, &info.identifier)
    }

    pub fn info(&self) -> &MidiDeviceInfo {
        &self.info
    }

    pub fn send_now(&mut self, message: &MidiMessage) -> Result<(), BackendError> {
        self.port.send(&message.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::loopback_midi::LoopbackMidiTransport;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Collector {
        incoming: Mutex<Vec<MidiMessage>>,
        sysex: Mutex<Vec<Vec<u8>>>,
    }

    impl MidiInputCallback for Collector {
        fn handle_incoming(&self, message: &MidiMessage) {
            self.incoming.lock().push(message.clone());
        }

        fn handle_partial_sysex(&self, data: &[u8], _timestamp: f64) {
            self.sysex.lock().push(data.to_vec());
        }
    }

    fn directory() -> MidiDeviceDirectory {
        let dir = MidiDeviceDirectory::new();
        dir.input_added(2, "Keys");
        dir.output_added(5, "Synth");
        dir
    }

    #[test]
    fn delivery_is_gated_by_start_and_stop() {
        let dir = directory();
        let transport = LoopbackMidiTransport::new();
        let collector = Arc::new(Collector::default());

        let input = MidiInput::open(&dir, Arc::new(transport.clone()), "2", collector.clone()).unwrap();
        assert!(transport.is_input_open(2));

        transport.deliver(2, MidiMessage::new(vec![0x90, 60, 100], 1.0));
        assert!(collector.incoming.lock().is_empty());

        input.start();
        transport.deliver(2, MidiMessage::new(vec![0x90, 60, 100], 0.0));
        transport.deliver(2, MidiMessage::new(vec![0xF0, 0x7E, 0xF7], 0.5));
        input.stop();
        transport.deliver(2, MidiMessage::new(vec![0x80, 60, 0], 2.0));

        let incoming = collector.incoming.lock();
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].timestamp, MIN_TIMESTAMP);
        assert_eq!(*collector.sysex.lock(), vec![vec![0xF0, 0x7E, 0xF7]]);
    }

    #[test]
    fn dropping_input_closes_it() {
        let dir = directory();
        let transport = LoopbackMidiTransport::new();
        let input =
            MidiInput::open_by_index(&dir, Arc::new(transport.clone()), 0, Arc::new(Collector::default())).unwrap();
        assert_eq!(input.info().name, "Keys");

        drop(input);
        assert!(!transport.is_input_open(2));
    }

    #[test]
    fn output_sends_raw_bytes() {
        let dir = directory();
        let transport = LoopbackMidiTransport::new();
        let mut output = MidiOutput::open_by_index(&dir, &transport, 0).unwrap();

        output.send_now(&MidiMessage::new(vec![0xB0, 7, 127], 0.0)).unwrap();
        assert_eq!(transport.sent(5), vec![vec![0xB0, 7, 127]]);
    }

    #[test]
    fn unknown_devices_are_reported() {
        let dir = directory();
        let transport = LoopbackMidiTransport::new();

        let err = MidiOutput::open(&dir, &transport, "9").err().unwrap();
        assert_eq!(err, BackendError::MidiDeviceNotFound("9".into()));

        let err = MidiInput::open_by_index(&dir, Arc::new(transport), 3, Arc::new(Collector::default()))
            .err()
            .unwrap();
        assert!(matches!(err, BackendError::MidiDeviceNotFound(_)));
    }
}

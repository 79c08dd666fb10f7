use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::audio_models::SampleFormat;
use crate::models::error::BackendError;
use crate::traits::buffer_queue_driver::{BufferQueueDriver, SlotId};

/// Driver operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverOp {
    OpenOutput,
    OpenCapture,
    CreateVoice,
    QueueSlots,
    UnqueueProcessed,
    FillSlot,
    Play,
    ProcessedSlots,
    StartCapture,
    CapturedFrames,
}

/// Lifecycle calls recorded in order, for checking open/close sequencing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverCall {
    OpenOutput,
    CloseOutput,
    OpenCapture,
    CloseCapture,
    CreateVoice,
    DestroyVoice,
    StartCapture,
    StopCapture,
}

#[derive(Default)]
struct Voice {
    queue: VecDeque<SlotId>,
    /// Slots at the front of `queue` that have finished playing.
    processed: usize,
    playing: bool,
}

#[derive(Default)]
struct SimState {
    output_open: bool,
    capture_format: Option<SampleFormat>,
    capturing: bool,
    voice: Option<Voice>,
    next_slot: SlotId,
    slot_data: HashMap<SlotId, Vec<i16>>,
    captured: VecDeque<i16>,
    played: Vec<Vec<i16>>,
    failing: HashSet<DriverOp>,
    calls: Vec<DriverCall>,
    play_count: usize,
    advance_delay: Option<Duration>,
}

impl SimState {
    fn check(&self, op: DriverOp) -> Result<(), BackendError> {
        if self.failing.contains(&op) {
            return Err(BackendError::Driver(format!("simulated failure in {:?}", op)));
        }
        Ok(())
    }

    fn voice_mut(&mut self) -> Result<&mut Voice, BackendError> {
        self.voice.as_mut().ok_or_else(|| BackendError::Driver("no voice".into()))
    }
}

/// In-memory buffer-queue driver.
///
/// Nothing is played on its own: slots only become processed when the test or
/// host calls [`SimulatedQueueControl::consume`]. Clone the control handle
/// before handing the driver to a device.
pub struct SimulatedQueueDriver {
    state: Arc<Mutex<SimState>>,
}

/// Shared handle for steering a [`SimulatedQueueDriver`] from outside.
#[derive(Clone)]
pub struct SimulatedQueueControl {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedQueueDriver {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                next_slot: 1,
                ..SimState::default()
            })),
        }
    }

    pub fn control(&self) -> SimulatedQueueControl {
        SimulatedQueueControl {
            state: Arc::clone(&self.state),
        }
    }
}

impl Default for SimulatedQueueDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedQueueControl {
    /// Mark up to `n` queued slots as played.
    pub fn consume(&self, n: usize) {
        let mut s = self.state.lock();
        let SimState {
            voice, slot_data, played, ..
        } = &mut *s;
        let Some(voice) = voice.as_mut() else {
            return;
        };
        let target = (voice.processed + n).min(voice.queue.len());
        for idx in voice.processed..target {
            let slot = voice.queue[idx];
            played.push(slot_data.get(&slot).cloned().unwrap_or_default());
        }
        voice.processed = target;
    }

    /// Mark every queued slot as played.
    pub fn consume_all(&self) {
        self.consume(usize::MAX / 2);
    }

    /// Append interleaved samples to the capture device.
    pub fn inject_capture(&self, samples: &[i16]) {
        self.state.lock().captured.extend(samples.iter().copied());
    }

    /// Stop the voice as if the underlying output stalled.
    pub fn stall(&self) {
        if let Some(voice) = self.state.lock().voice.as_mut() {
            voice.playing = false;
        }
    }

    pub fn fail_on(&self, op: DriverOp) {
        self.state.lock().failing.insert(op);
    }

    pub fn clear_failures(&self) {
        self.state.lock().failing.clear();
    }

    /// Sleep inside every processed-slot query, to emulate a slow driver.
    pub fn set_advance_delay(&self, delay: Option<Duration>) {
        self.state.lock().advance_delay = delay;
    }

    pub fn is_output_open(&self) -> bool {
        self.state.lock().output_open
    }

    pub fn is_capture_open(&self) -> bool {
        self.state.lock().capture_format.is_some()
    }

    pub fn is_capturing(&self) -> bool {
        self.state.lock().capturing
    }

    pub fn has_voice(&self) -> bool {
        self.state.lock().voice.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().voice.as_ref().map(|v| v.playing).unwrap_or(false)
    }

    pub fn queued_len(&self) -> usize {
        self.state.lock().voice.as_ref().map(|v| v.queue.len()).unwrap_or(0)
    }

    pub fn play_count(&self) -> usize {
        self.state.lock().play_count
    }

    /// Contents of every slot consumed so far, in playback order.
    pub fn played_blocks(&self) -> Vec<Vec<i16>> {
        self.state.lock().played.clone()
    }

    pub fn calls(&self) -> Vec<DriverCall> {
        self.state.lock().calls.clone()
    }
}

impl BufferQueueDriver for SimulatedQueueDriver {
    fn open_output(&mut self) -> Result<(), BackendError> {
        let mut s = self.state.lock();
        s.calls.push(DriverCall::OpenOutput);
        s.check(DriverOp::OpenOutput)
            .map_err(|e| BackendError::Resource(format!("failed to open output device - {}", e)))?;
        s.output_open = true;
        Ok(())
    }

    fn close_output(&mut self) {
        let mut s = self.state.lock();
        s.calls.push(DriverCall::CloseOutput);
        s.output_open = false;
    }

    fn open_capture(&mut self, _frequency: u32, format: SampleFormat, _buffer_frames: usize) -> Result<(), BackendError> {
        let mut s = self.state.lock();
        s.calls.push(DriverCall::OpenCapture);
        s.check(DriverOp::OpenCapture)
            .map_err(|e| BackendError::Resource(format!("failed to open capture device - {}", e)))?;
        s.capture_format = Some(format);
        Ok(())
    }

    fn close_capture(&mut self) {
        let mut s = self.state.lock();
        s.calls.push(DriverCall::CloseCapture);
        s.capture_format = None;
        s.capturing = false;
        s.captured.clear();
    }

    fn create_voice(&mut self, slot_count: usize) -> Result<Vec<SlotId>, BackendError> {
        let mut s = self.state.lock();
        s.calls.push(DriverCall::CreateVoice);
        s.check(DriverOp::CreateVoice)?;
        if !s.output_open {
            return Err(BackendError::Driver("no current context".into()));
        }

        let first = s.next_slot;
        let ids: Vec<SlotId> = (first..first + slot_count as SlotId).collect();
        s.next_slot = first + slot_count as SlotId;
        for id in &ids {
            s.slot_data.insert(*id, Vec::new());
        }
        s.voice = Some(Voice::default());
        Ok(ids)
    }

    fn destroy_voice(&mut self) {
        let mut s = self.state.lock();
        s.calls.push(DriverCall::DestroyVoice);
        s.voice = None;
        s.slot_data.clear();
    }

    fn queue_slots(&mut self, slots: &[SlotId]) -> Result<(), BackendError> {
        let mut s = self.state.lock();
        s.check(DriverOp::QueueSlots)?;
        if let Some(unknown) = slots.iter().find(|id| !s.slot_data.contains_key(id)) {
            return Err(BackendError::Driver(format!("invalid slot {}", unknown)));
        }
        let voice = s.voice_mut()?;
        voice.queue.extend(slots.iter().copied());
        Ok(())
    }

    fn unqueue_processed(&mut self) -> Result<SlotId, BackendError> {
        let mut s = self.state.lock();
        s.check(DriverOp::UnqueueProcessed)?;
        let voice = s.voice_mut()?;
        if voice.processed == 0 {
            return Err(BackendError::Driver("no processed slot to unqueue".into()));
        }
        voice.processed -= 1;
        voice
            .queue
            .pop_front()
            .ok_or_else(|| BackendError::Driver("voice queue is empty".into()))
    }

    fn fill_slot(&mut self, slot: SlotId, _format: SampleFormat, samples: &[i16], _frequency: u32) -> Result<(), BackendError> {
        let mut s = self.state.lock();
        s.check(DriverOp::FillSlot)?;
        let data = s
            .slot_data
            .get_mut(&slot)
            .ok_or_else(|| BackendError::Driver(format!("invalid slot {}", slot)))?;
        data.clear();
        data.extend_from_slice(samples);
        Ok(())
    }

    fn play(&mut self) -> Result<(), BackendError> {
        let mut s = self.state.lock();
        s.check(DriverOp::Play)?;
        s.voice_mut()?.playing = true;
        s.play_count += 1;
        Ok(())
    }

    fn is_playing(&mut self) -> Result<bool, BackendError> {
        let s = self.state.lock();
        Ok(s.voice.as_ref().map(|v| v.playing).unwrap_or(false))
    }

    fn processed_slots(&mut self) -> Result<usize, BackendError> {
        let delay = self.state.lock().advance_delay;
        if let Some(delay) = delay {
            thread::sleep(delay);
        }
        let mut s = self.state.lock();
        s.check(DriverOp::ProcessedSlots)?;
        Ok(s.voice_mut()?.processed)
    }

    fn start_capture(&mut self) -> Result<(), BackendError> {
        let mut s = self.state.lock();
        s.calls.push(DriverCall::StartCapture);
        s.check(DriverOp::StartCapture)?;
        if s.capture_format.is_none() {
            return Err(BackendError::Driver("capture device is not open".into()));
        }
        s.capturing = true;
        Ok(())
    }

    fn stop_capture(&mut self) {
        let mut s = self.state.lock();
        s.calls.push(DriverCall::StopCapture);
        s.capturing = false;
    }

    fn captured_frames(&mut self) -> Result<usize, BackendError> {
        let s = self.state.lock();
        s.check(DriverOp::CapturedFrames)?;
        match (s.capture_format, s.capturing) {
            (Some(format), true) => Ok(s.captured.len() / format.channels()),
            _ => Ok(0),
        }
    }

    fn read_captured(&mut self, dst: &mut [i16], frames: usize) -> Result<(), BackendError> {
        let mut s = self.state.lock();
        let channels = s
            .capture_format
            .map(|f| f.channels())
            .ok_or_else(|| BackendError::Driver("capture device is not open".into()))?;
        let wanted = (frames * channels).min(dst.len());
        if wanted > s.captured.len() {
            return Err(BackendError::Driver("not enough captured samples".into()));
        }
        for (slot, sample) in dst.iter_mut().zip(s.captured.drain(..wanted)) {
            *slot = sample;
        }
        Ok(())
    }
}

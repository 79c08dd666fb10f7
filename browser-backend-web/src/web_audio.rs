use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

use browser_backend_core::{BackendError, BufferQueueDriver, SampleFormat, SlotId};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{AudioBuffer, AudioBufferSourceNode, AudioContext, AudioContextState, MediaStream};

use crate::microphone::{request_microphone, stop_tracks, MicrophoneCapture};

const SCALE: f32 = 32767.0;

struct ScheduledSource {
    node: AudioBufferSourceNode,
    _on_ended: Closure<dyn FnMut()>,
}

impl ScheduledSource {
    fn cancel(self) {
        self.node.set_onended(None);
        if let Err(e) = self.node.stop() {
            log::debug!("Stopping audio source failed: {:?}", e);
        }
    }
}

struct VoiceState {
    slots: HashMap<SlotId, Option<AudioBuffer>>,
    queued: VecDeque<SlotId>,
    /// Slots whose source has ended, oldest first. Written by `onended`.
    finished: Rc<RefCell<VecDeque<SlotId>>>,
    sources: HashMap<SlotId, ScheduledSource>,
    /// Context time at which the next queued slot starts.
    next_start: f64,
    playing: bool,
}

impl VoiceState {
    fn new(slots: &[SlotId]) -> Self {
        Self {
            slots: slots.iter().map(|&id| (id, None)).collect(),
            queued: VecDeque::new(),
            finished: Rc::new(RefCell::new(VecDeque::new())),
            sources: HashMap::new(),
            next_start: 0.0,
            playing: false,
        }
    }

    /// Schedule `buffer` right after whatever is already queued.
    fn schedule(&mut self, context: &AudioContext, slot: SlotId, buffer: &AudioBuffer) -> Result<(), BackendError> {
        let node = context
            .create_buffer_source()
            .map_err(|e| js_error("failed to create buffer source", e))?;
        node.set_buffer(Some(buffer));
        node.connect_with_audio_node(&context.destination())
            .map_err(|e| js_error("failed to connect buffer source", e))?;

        let finished = Rc::clone(&self.finished);
        let on_ended = Closure::wrap(Box::new(move || finished.borrow_mut().push_back(slot)) as Box<dyn FnMut()>);
        node.set_onended(Some(on_ended.as_ref().unchecked_ref()));

        let start = self.next_start.max(context.current_time());
        node.start_with_when(start)
            .map_err(|e| js_error("failed to start buffer source", e))?;
        self.next_start = start + buffer.duration();

        self.sources.insert(
            slot,
            ScheduledSource {
                node,
                _on_ended: on_ended,
            },
        );
        Ok(())
    }

    fn cancel_all(&mut self) {
        for (_, source) in self.sources.drain() {
            source.cancel();
        }
        self.queued.clear();
        self.finished.borrow_mut().clear();
    }
}

#[derive(Default)]
struct WebAudioState {
    context: Option<AudioContext>,
    voice: Option<VoiceState>,
    capture: Option<MicrophoneCapture>,
    /// Set while a `resume()` promise is outstanding.
    resuming: Rc<Cell<bool>>,
}

impl WebAudioState {
    fn context(&self) -> Result<AudioContext, BackendError> {
        self.context
            .clone()
            .ok_or_else(|| BackendError::Driver("no current audio context".into()))
    }

    fn voice(&mut self) -> Result<&mut VoiceState, BackendError> {
        self.voice
            .as_mut()
            .ok_or_else(|| BackendError::Driver("no playback voice".into()))
    }

    fn capture(&mut self) -> Result<&mut MicrophoneCapture, BackendError> {
        self.capture
            .as_mut()
            .ok_or_else(|| BackendError::Driver("capture device is not open".into()))
    }

    fn teardown(&mut self) {
        if let Some(mut voice) = self.voice.take() {
            voice.cancel_all();
        }
        if let Some(context) = self.context.take() {
            if let Err(e) = context.close() {
                log::warn!("Closing audio context failed: {:?}", e);
            }
        }
        self.capture = None;
    }
}

thread_local! {
    static STATES: RefCell<HashMap<u32, WebAudioState>> = RefCell::new(HashMap::new());
}

static NEXT_DRIVER_ID: AtomicU32 = AtomicU32::new(1);

fn js_error(what: &str, e: JsValue) -> BackendError {
    BackendError::Driver(format!("{}: {:?}", what, e))
}

/// Completion of the microphone permission request for driver `id`.
fn attach_microphone(id: u32, result: Result<JsValue, JsValue>) {
    STATES.with(|states| {
        let Ok(mut states) = states.try_borrow_mut() else {
            log::warn!("Microphone stream arrived while the driver was busy; dropping it");
            if let Ok(stream) = result {
                stop_tracks(&stream.unchecked_into::<MediaStream>());
            }
            return;
        };
        let capture = states.get_mut(&id).and_then(|state| state.capture.as_mut());
        match (capture, result) {
            (Some(capture), Ok(stream)) => match capture.attach(stream.unchecked_into()) {
                Ok(()) => log::info!("Microphone attached"),
                Err(e) => log::error!("Failed to build the capture graph: {:?}", e),
            },
            (Some(capture), Err(e)) => {
                capture.request_failed();
                log::warn!("Microphone access denied: {:?}", e);
            }
            // Capture was closed while the prompt was open.
            (None, Ok(stream)) => stop_tracks(&stream.unchecked_into::<MediaStream>()),
            (None, Err(_)) => {}
        }
    });
}

/// `BufferQueueDriver` over WebAudio.
///
/// Every slot is an `AudioBuffer`; queued slots are played back-to-back by
/// one-shot `AudioBufferSourceNode`s and count as processed once their
/// `ended` event fires. Slots that were never filled count as processed as
/// soon as they are queued. Capture pulls microphone input through
/// `getUserMedia` once the user grants access.
///
/// The JS objects live in a main-thread table; the handle itself carries only
/// a key, so it is `Send` but only usable from the browser main thread.
pub struct WebAudioQueueDriver {
    id: u32,
}

impl WebAudioQueueDriver {
    pub fn new() -> Self {
        let id = NEXT_DRIVER_ID.fetch_add(1, Ordering::Relaxed);
        STATES.with(|states| states.borrow_mut().insert(id, WebAudioState::default()));
        Self { id }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut WebAudioState) -> Result<R, BackendError>) -> Result<R, BackendError> {
        STATES.with(|states| {
            let mut states = states.borrow_mut();
            let state = states
                .get_mut(&self.id)
                .ok_or_else(|| BackendError::Driver("WebAudio driver used off the browser main thread".into()))?;
            f(state)
        })
    }

    fn with_state_or_log(&self, what: &str, f: impl FnOnce(&mut WebAudioState)) {
        let result = self.with_state(|state| {
            f(state);
            Ok(())
        });
        if let Err(e) = result {
            log::warn!("{} skipped: {}", what, e);
        }
    }
}

impl Default for WebAudioQueueDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for WebAudioQueueDriver {
    fn drop(&mut self) {
        let _ = STATES.try_with(|states| {
            if let Ok(mut states) = states.try_borrow_mut() {
                if let Some(mut state) = states.remove(&self.id) {
                    state.teardown();
                }
            }
        });
    }
}

impl BufferQueueDriver for WebAudioQueueDriver {
    fn open_output(&mut self) -> Result<(), BackendError> {
        self.with_state(|state| {
            if state.context.is_none() {
                let context = AudioContext::new()
                    .map_err(|e| BackendError::Resource(format!("failed to open output device - {:?}", e)))?;
                log::info!("Created audio context at {} Hz", context.sample_rate());
                state.context = Some(context);
            }
            Ok(())
        })
    }

    fn close_output(&mut self) {
        self.with_state_or_log("close_output", |state| {
            if let Some(mut voice) = state.voice.take() {
                voice.cancel_all();
            }
            if let Some(context) = state.context.take() {
                if let Err(e) = context.close() {
                    log::warn!("Closing audio context failed: {:?}", e);
                }
            }
        });
    }

    fn open_capture(&mut self, frequency: u32, format: SampleFormat, buffer_frames: usize) -> Result<(), BackendError> {
        self.with_state(|state| {
            log::info!("Capture opened: {} Hz, {:?}, {} frames", frequency, format, buffer_frames);
            state.capture = Some(MicrophoneCapture::new(frequency, format, buffer_frames));
            Ok(())
        })
    }

    fn close_capture(&mut self) {
        self.with_state_or_log("close_capture", |state| state.capture = None);
    }

    fn create_voice(&mut self, slot_count: usize) -> Result<Vec<SlotId>, BackendError> {
        self.with_state(|state| {
            state.context()?;
            let slots: Vec<SlotId> = (1..=slot_count as SlotId).collect();
            state.voice = Some(VoiceState::new(&slots));
            Ok(slots)
        })
    }

    fn destroy_voice(&mut self) {
        self.with_state_or_log("destroy_voice", |state| {
            if let Some(mut voice) = state.voice.take() {
                voice.cancel_all();
            }
        });
    }

    fn queue_slots(&mut self, slots: &[SlotId]) -> Result<(), BackendError> {
        self.with_state(|state| {
            let context = state.context()?;
            let voice = state.voice()?;
            for &slot in slots {
                let buffer = voice
                    .slots
                    .get(&slot)
                    .cloned()
                    .ok_or_else(|| BackendError::Driver(format!("invalid slot {}", slot)))?;
                voice.queued.push_back(slot);
                match buffer {
                    Some(buffer) => voice.schedule(&context, slot, &buffer)?,
                    None => voice.finished.borrow_mut().push_back(slot),
                }
            }
            Ok(())
        })
    }

    fn unqueue_processed(&mut self) -> Result<SlotId, BackendError> {
        self.with_state(|state| {
            let voice = state.voice()?;
            let next = voice.finished.borrow_mut().pop_front();
            let slot = next.ok_or_else(|| BackendError::Driver("no processed slot to unqueue".into()))?;
            if let Some(pos) = voice.queued.iter().position(|&s| s == slot) {
                voice.queued.remove(pos);
            }
            voice.sources.remove(&slot);
            Ok(slot)
        })
    }

    fn fill_slot(&mut self, slot: SlotId, format: SampleFormat, samples: &[i16], frequency: u32) -> Result<(), BackendError> {
        self.with_state(|state| {
            let context = state.context()?;
            let voice = state.voice()?;
            let entry = voice
                .slots
                .get_mut(&slot)
                .ok_or_else(|| BackendError::Driver(format!("invalid slot {}", slot)))?;

            let channels = format.channels();
            let frames = samples.len() / channels;
            if frames == 0 {
                *entry = None;
                return Ok(());
            }

            let buffer = context
                .create_buffer(channels as u32, frames as u32, frequency as f32)
                .map_err(|e| js_error("failed to create audio buffer", e))?;
            let mut plane = vec![0.0f32; frames];
            for c in 0..channels {
                for (frame, value) in plane.iter_mut().enumerate() {
                    *value = samples[frame * channels + c] as f32 / SCALE;
                }
                buffer
                    .copy_to_channel(&plane, c as i32)
                    .map_err(|e| js_error("failed to copy samples", e))?;
            }
            *entry = Some(buffer);
            Ok(())
        })
    }

    /// Resume the context. Browsers keep it suspended until a user gesture,
    /// so the first calls may not produce sound yet.
    fn play(&mut self) -> Result<(), BackendError> {
        self.with_state(|state| {
            let context = state.context()?;
            state.voice()?.playing = true;

            if context.state() != AudioContextState::Running && !state.resuming.get() {
                let promise = context.resume().map_err(|e| js_error("failed to resume audio context", e))?;
                let resuming = Rc::clone(&state.resuming);
                resuming.set(true);
                wasm_bindgen_futures::spawn_local(async move {
                    if let Err(e) = JsFuture::from(promise).await {
                        log::debug!("Audio context resume rejected: {:?}", e);
                    }
                    resuming.set(false);
                });
            }
            Ok(())
        })
    }

    /// False while the browser keeps the context suspended or interrupted,
    /// so the feed calls `play` again to resume it.
    fn is_playing(&mut self) -> Result<bool, BackendError> {
        self.with_state(|state| {
            let running = state.context()?.state() == AudioContextState::Running;
            Ok(running && state.voice()?.playing)
        })
    }

    fn processed_slots(&mut self) -> Result<usize, BackendError> {
        self.with_state(|state| Ok(state.voice()?.finished.borrow().len()))
    }

    /// Starts delivery; the first call also asks for microphone access.
    fn start_capture(&mut self) -> Result<(), BackendError> {
        let request = self.with_state(|state| {
            let capture = state.capture()?;
            capture.start();
            if !capture.needs_stream() {
                return Ok(None);
            }
            let promise =
                request_microphone().map_err(|e| BackendError::Resource(format!("microphone unavailable - {:?}", e)))?;
            capture.mark_requested();
            Ok(Some(promise))
        })?;

        if let Some(promise) = request {
            let id = self.id;
            wasm_bindgen_futures::spawn_local(async move {
                let result = JsFuture::from(promise).await;
                attach_microphone(id, result);
            });
        }
        Ok(())
    }

    fn stop_capture(&mut self) {
        self.with_state_or_log("stop_capture", |state| {
            if let Some(capture) = state.capture.as_mut() {
                capture.stop();
            }
        });
    }

    fn captured_frames(&mut self) -> Result<usize, BackendError> {
        self.with_state(|state| Ok(state.capture()?.available()))
    }

    fn read_captured(&mut self, dst: &mut [i16], frames: usize) -> Result<(), BackendError> {
        self.with_state(|state| {
            let capture = state.capture()?;
            let channels = capture.format().channels();
            let read = capture.read(dst, frames);
            let end = (frames * channels).min(dst.len());
            if read * channels < end {
                dst[read * channels..end].fill(0);
            }
            Ok(())
        })
    }
}

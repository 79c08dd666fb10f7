use std::cell::{Cell, RefCell};
use std::rc::Rc;

use browser_backend_core::{CaptureRing, SampleFormat};
use js_sys::Promise;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    AudioContext, AudioContextOptions, AudioProcessingEvent, MediaStream, MediaStreamAudioSourceNode,
    MediaStreamConstraints, MediaStreamTrack, ScriptProcessorNode,
};

/// Frames per `audioprocess` callback.
const PROCESSOR_BLOCK_FRAMES: u32 = 1024;

/// Ask the browser for a microphone stream. Resolves to a `MediaStream`.
pub(crate) fn request_microphone() -> Result<Promise, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let devices = window.navigator().media_devices()?;
    let constraints = MediaStreamConstraints::new();
    constraints.set_audio(&JsValue::TRUE);
    devices.get_user_media_with_constraints(&constraints)
}

pub(crate) fn stop_tracks(stream: &MediaStream) {
    for track in stream.get_tracks().iter() {
        if let Ok(track) = track.dyn_into::<MediaStreamTrack>() {
            track.stop();
        }
    }
}

/// Microphone stream -> script processor -> capture ring.
struct CaptureGraph {
    context: AudioContext,
    stream: MediaStream,
    source: MediaStreamAudioSourceNode,
    processor: ScriptProcessorNode,
    _on_process: Closure<dyn FnMut(AudioProcessingEvent)>,
}

impl CaptureGraph {
    fn build(
        stream: MediaStream,
        frequency: u32,
        channels: usize,
        ring: Rc<RefCell<CaptureRing>>,
        active: Rc<Cell<bool>>,
    ) -> Result<Self, JsValue> {
        // Run the capture context at the requested rate so no resampling is
        // needed on our side.
        let options = AudioContextOptions::new();
        options.set_sample_rate(frequency as f32);
        let context = AudioContext::new_with_context_options(&options)?;
        let source = context.create_media_stream_source(&stream)?;
        let processor = context
            .create_script_processor_with_buffer_size_and_number_of_input_channels_and_number_of_output_channels(
                PROCESSOR_BLOCK_FRAMES,
                channels as u32,
                channels as u32,
            )?;

        let on_process = Closure::wrap(Box::new(move |event: AudioProcessingEvent| {
            if !active.get() {
                return;
            }
            let Ok(input) = event.input_buffer() else {
                return;
            };
            let planes: Vec<Vec<f32>> = (0..input.number_of_channels().min(channels as u32))
                .filter_map(|c| input.get_channel_data(c).ok())
                .collect();
            ring.borrow_mut().push_planar(&planes);
        }) as Box<dyn FnMut(AudioProcessingEvent)>);
        processor.set_onaudioprocess(Some(on_process.as_ref().unchecked_ref()));

        // A script processor only runs while connected to the destination;
        // its output buffer is left silent.
        source.connect_with_audio_node(&processor)?;
        processor.connect_with_audio_node(&context.destination())?;

        Ok(Self {
            context,
            stream,
            source,
            processor,
            _on_process: on_process,
        })
    }

    fn shutdown(self) {
        self.processor.set_onaudioprocess(None);
        if let Err(e) = self.source.disconnect() {
            log::debug!("Disconnecting microphone source failed: {:?}", e);
        }
        if let Err(e) = self.processor.disconnect() {
            log::debug!("Disconnecting capture processor failed: {:?}", e);
        }
        stop_tracks(&self.stream);
        if let Err(e) = self.context.close() {
            log::warn!("Closing capture context failed: {:?}", e);
        }
    }
}

/// Capture device state for one driver.
///
/// The microphone stream arrives asynchronously after the permission prompt;
/// until then the ring stays empty and the feed reads no input frames.
pub(crate) struct MicrophoneCapture {
    format: SampleFormat,
    frequency: u32,
    ring: Rc<RefCell<CaptureRing>>,
    active: Rc<Cell<bool>>,
    graph: Option<CaptureGraph>,
    requested: bool,
}

impl MicrophoneCapture {
    pub(crate) fn new(frequency: u32, format: SampleFormat, buffer_frames: usize) -> Self {
        let capacity = buffer_frames.max(PROCESSOR_BLOCK_FRAMES as usize) * 2;
        Self {
            format,
            frequency,
            ring: Rc::new(RefCell::new(CaptureRing::new(format.channels(), capacity))),
            active: Rc::new(Cell::new(false)),
            graph: None,
            requested: false,
        }
    }

    pub(crate) fn format(&self) -> SampleFormat {
        self.format
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Whether a microphone stream still has to be requested.
    pub(crate) fn needs_stream(&self) -> bool {
        self.graph.is_none() && !self.requested
    }

    pub(crate) fn mark_requested(&mut self) {
        self.requested = true;
    }

    pub(crate) fn request_failed(&mut self) {
        self.requested = false;
    }

    pub(crate) fn start(&mut self) {
        self.ring.borrow_mut().clear();
        self.active.set(true);
    }

    pub(crate) fn stop(&mut self) {
        self.active.set(false);
        self.ring.borrow_mut().clear();
    }

    pub(crate) fn attach(&mut self, stream: MediaStream) -> Result<(), JsValue> {
        self.requested = false;
        if self.graph.is_some() {
            stop_tracks(&stream);
            return Ok(());
        }
        let graph = CaptureGraph::build(
            stream.clone(),
            self.frequency,
            self.format.channels(),
            Rc::clone(&self.ring),
            Rc::clone(&self.active),
        );
        match graph {
            Ok(graph) => {
                self.graph = Some(graph);
                Ok(())
            }
            Err(e) => {
                stop_tracks(&stream);
                Err(e)
            }
        }
    }

    pub(crate) fn available(&self) -> usize {
        if self.is_active() {
            self.ring.borrow().available()
        } else {
            0
        }
    }

    pub(crate) fn read(&mut self, dst: &mut [i16], frames: usize) -> usize {
        self.ring.borrow_mut().read(dst, frames)
    }
}

impl Drop for MicrophoneCapture {
    fn drop(&mut self) {
        if let Some(graph) = self.graph.take() {
            graph.shutdown();
        }
        let dropped = self.ring.borrow().dropped_frames();
        if dropped > 0 {
            log::debug!("Capture dropped {} frames on overflow", dropped);
        }
    }
}

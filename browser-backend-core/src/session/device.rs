use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::audio_models::{
    ChannelMask, FeedDiagnostics, StreamLayout, AVAILABLE_BUFFER_SIZES, AVAILABLE_SAMPLE_RATES, BIT_DEPTH,
    DEFAULT_BUFFER_SIZE, DEVICE_TYPE_NAME, INPUT_CHANNEL_NAMES, OUTPUT_CHANNEL_NAMES,
};
use crate::models::config::{BackendConfiguration, ThreadingMode};
use crate::models::error::BackendError;
use crate::session::audio_thread::AudioThread;
use crate::session::feed::{AudioFeedStateMachine, DeviceShared};
use crate::session::registry::{CooperativeFeed, CooperativeSession, SessionRegistry};
use crate::traits::audio_callback::AudioIoCallback;
use crate::traits::buffer_queue_driver::{BufferQueueDriver, SlotId};

/// How the running feed is being advanced.
enum FeedDispatch<D: BufferQueueDriver> {
    Cooperative(Arc<CooperativeFeed<D>>),
    Dedicated(AudioThread),
}

/// Lifecycle state, protected by the binding-wide lock.
struct Lifecycle<D: BufferQueueDriver> {
    layout: Option<StreamLayout>,
    slots: Vec<SlotId>,
    output_open: bool,
    voice_created: bool,
    capture_open: bool,
    dispatch: Option<FeedDispatch<D>>,
}

impl<D: BufferQueueDriver> Lifecycle<D> {
    fn new() -> Self {
        Self {
            layout: None,
            slots: Vec::new(),
            output_open: false,
            voice_created: false,
            capture_open: false,
            dispatch: None,
        }
    }
}

/// Audio device over a buffer-queue driver.
///
/// `open`, `start`, `stop` and `close` serialise on one lifecycle lock. Feeds
/// never take that lock; they only touch the driver lock and their own.
/// Lock order: lifecycle, then registry, then feed, then driver.
pub struct BufferQueueAudioDevice<D: BufferQueueDriver + 'static> {
    config: BackendConfiguration,
    registry: Arc<SessionRegistry>,
    shared: Arc<DeviceShared<D>>,
    lifecycle: Mutex<Lifecycle<D>>,
}

impl<D: BufferQueueDriver + 'static> BufferQueueAudioDevice<D> {
    pub fn new(driver: D, config: BackendConfiguration, registry: Arc<SessionRegistry>) -> Self {
        Self {
            config,
            registry,
            shared: Arc::new(DeviceShared::new(driver)),
            lifecycle: Mutex::new(Lifecycle::new()),
        }
    }

    /// Open with the given channel masks. Any previous session is closed first.
    ///
    /// On failure the binding is left closed and the error is kept as
    /// [`last_error`](Self::last_error).
    pub fn open(
        &self,
        input_channels: ChannelMask,
        output_channels: ChannelMask,
        sample_rate: f64,
        buffer_size: usize,
    ) -> Result<(), BackendError> {
        let mut lc = self.lifecycle.lock();
        self.close_locked(&mut lc);
        self.shared.clear_error();

        let result = StreamLayout::from_masks(input_channels, output_channels, sample_rate, buffer_size)
            .and_then(|layout| self.open_locked(&mut lc, layout));

        if let Err(e) = &result {
            self.close_locked(&mut lc);
            self.shared.record_error(e);
        }
        result
    }

    fn open_locked(&self, lc: &mut Lifecycle<D>, layout: StreamLayout) -> Result<(), BackendError> {
        let mut driver = self.shared.driver.lock();

        // Voice creation needs a current context, so output goes first.
        driver.open_output()?;
        lc.output_open = true;

        lc.slots = driver.create_voice(layout.slot_count())?;
        lc.voice_created = true;

        if let Some(format) = layout.input_format {
            driver.open_capture(layout.frequency(), format, layout.buffer_size)?;
            lc.capture_open = true;
        }
        drop(driver);

        log::info!(
            "Opened buffer-queue device: {} in, {} out, {} Hz, {} frames",
            layout.input_channels,
            layout.output_channels,
            layout.sample_rate,
            layout.buffer_size
        );
        lc.layout = Some(layout);
        Ok(())
    }

    /// Idempotent; safe on a binding that was never opened.
    pub fn close(&self) {
        let mut lc = self.lifecycle.lock();
        self.close_locked(&mut lc);
    }

    fn close_locked(&self, lc: &mut Lifecycle<D>) {
        self.stop_locked(lc);

        if !(lc.voice_created || lc.output_open || lc.capture_open) {
            lc.layout = None;
            return;
        }

        let mut driver = self.shared.driver.lock();
        if lc.voice_created {
            driver.destroy_voice();
        }
        if lc.output_open {
            driver.close_output();
        }
        if lc.capture_open {
            driver.close_capture();
        }
        drop(driver);

        if lc.layout.is_some() {
            log::info!("Closed buffer-queue device");
        }
        *lc = Lifecycle::new();
    }

    pub fn is_open(&self) -> bool {
        self.lifecycle.lock().layout.is_some()
    }

    /// Start feeding `callback`. No-op if a feed is already running.
    pub fn start(&self, callback: Box<dyn AudioIoCallback>) -> Result<(), BackendError> {
        let mut lc = self.lifecycle.lock();
        let layout = lc.layout.clone().ok_or(BackendError::DeviceNotOpen)?;
        if lc.dispatch.is_some() {
            return Ok(());
        }

        self.shared.reset_counters();

        if lc.capture_open {
            if let Err(e) = self.shared.driver.lock().start_capture() {
                self.shared.record_error(&e);
                return Err(e);
            }
        }

        let machine = AudioFeedStateMachine::new(Arc::clone(&self.shared), layout, lc.slots.clone(), callback);

        let dispatch = match self.config.threading {
            ThreadingMode::Cooperative => {
                let feed = Arc::new(CooperativeFeed::new(machine));
                self.registry.add(feed.clone());
                FeedDispatch::Cooperative(feed)
            }
            ThreadingMode::DedicatedThread => match AudioThread::spawn(machine, self.config.starvation_sleep()) {
                Ok(thread) => FeedDispatch::Dedicated(thread),
                Err(e) => {
                    if lc.capture_open {
                        self.shared.driver.lock().stop_capture();
                    }
                    self.shared.record_error(&e);
                    return Err(e);
                }
            },
        };

        lc.dispatch = Some(dispatch);
        log::info!("Started audio feed ({:?})", self.config.threading);
        Ok(())
    }

    /// No-op unless a feed is running.
    pub fn stop(&self) {
        let mut lc = self.lifecycle.lock();
        self.stop_locked(&mut lc);
    }

    fn stop_locked(&self, lc: &mut Lifecycle<D>) {
        let Some(dispatch) = lc.dispatch.take() else {
            return;
        };

        match dispatch {
            FeedDispatch::Cooperative(feed) => {
                let session: Arc<dyn CooperativeSession> = feed.clone();
                self.registry.remove_all(&session);
                drop(session);
                feed.stop();
            }
            FeedDispatch::Dedicated(thread) => {
                if let Err(e) = thread.stop(self.config.stop_timeout()) {
                    self.shared.set_last_error(&e);
                }
            }
        }

        if lc.capture_open {
            self.shared.driver.lock().stop_capture();
        }
        log::info!("Stopped audio feed");
    }

    pub fn is_playing(&self) -> bool {
        self.lifecycle.lock().dispatch.is_some()
    }

    /// Under-runs since the last `start()`.
    pub fn xrun_count(&self) -> u64 {
        self.shared.under_runs()
    }

    pub fn last_error(&self) -> Option<String> {
        self.shared.last_error()
    }

    pub fn diagnostics(&self) -> FeedDiagnostics {
        self.shared.diagnostics()
    }

    pub fn threading(&self) -> ThreadingMode {
        self.config.threading
    }

    // --- Capability surface ---

    pub fn name(&self) -> &'static str {
        DEVICE_TYPE_NAME
    }

    pub fn type_name(&self) -> &'static str {
        DEVICE_TYPE_NAME
    }

    pub fn output_channel_names(&self) -> Vec<String> {
        OUTPUT_CHANNEL_NAMES.iter().map(|s| s.to_string()).collect()
    }

    pub fn input_channel_names(&self) -> Vec<String> {
        INPUT_CHANNEL_NAMES.iter().map(|s| s.to_string()).collect()
    }

    pub fn available_sample_rates(&self) -> Vec<f64> {
        AVAILABLE_SAMPLE_RATES.to_vec()
    }

    pub fn available_buffer_sizes(&self) -> Vec<usize> {
        AVAILABLE_BUFFER_SIZES.to_vec()
    }

    pub fn default_buffer_size(&self) -> usize {
        DEFAULT_BUFFER_SIZE
    }

    pub fn current_bit_depth(&self) -> u16 {
        BIT_DEPTH
    }

    pub fn current_sample_rate(&self) -> Option<f64> {
        self.lifecycle.lock().layout.as_ref().map(|l| l.sample_rate)
    }

    pub fn current_buffer_size(&self) -> Option<usize> {
        self.lifecycle.lock().layout.as_ref().map(|l| l.buffer_size)
    }

    pub fn active_input_channels(&self) -> ChannelMask {
        self.lifecycle
            .lock()
            .layout
            .as_ref()
            .map(|l| ChannelMask::with_count(l.input_channels))
            .unwrap_or(ChannelMask::NONE)
    }

    pub fn active_output_channels(&self) -> ChannelMask {
        self.lifecycle
            .lock()
            .layout
            .as_ref()
            .map(|l| ChannelMask::with_count(l.output_channels))
            .unwrap_or(ChannelMask::NONE)
    }

    /// Queued slot count times buffer size.
    pub fn output_latency_samples(&self) -> usize {
        self.lifecycle.lock().layout.as_ref().map(|l| l.latency_samples()).unwrap_or(0)
    }

    pub fn input_latency_samples(&self) -> usize {
        self.output_latency_samples()
    }
}

impl<D: BufferQueueDriver + 'static> Drop for BufferQueueAudioDevice<D> {
    fn drop(&mut self) {
        self.close();
    }
}

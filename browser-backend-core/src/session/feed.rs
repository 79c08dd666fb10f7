use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::audio_models::{FeedDiagnostics, StreamLayout, MAX_BUFFER_SIZE};
use crate::models::error::BackendError;
use crate::models::state::{FeedState, FeedStatus};
use crate::processing::planar_buffer::PlanarBuffer;
use crate::processing::sample_converter::{fixed_to_float, float_to_fixed};
use crate::traits::audio_callback::AudioIoCallback;
use crate::traits::buffer_queue_driver::{BufferQueueDriver, SlotId};

/// State shared between a device binding and the feeds it starts.
pub struct DeviceShared<D> {
    pub(crate) driver: Mutex<D>,
    under_runs: AtomicU64,
    last_error: Mutex<Option<String>>,
    diagnostics: Mutex<FeedDiagnostics>,
}

impl<D: BufferQueueDriver> DeviceShared<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver: Mutex::new(driver),
            under_runs: AtomicU64::new(0),
            last_error: Mutex::new(None),
            diagnostics: Mutex::new(FeedDiagnostics::default()),
        }
    }

    pub fn under_runs(&self) -> u64 {
        self.under_runs.load(Ordering::Relaxed)
    }

    pub(crate) fn reset_counters(&self) {
        self.under_runs.store(0, Ordering::Relaxed);
        *self.diagnostics.lock() = FeedDiagnostics::default();
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    pub(crate) fn clear_error(&self) {
        *self.last_error.lock() = None;
    }

    pub(crate) fn record_error(&self, error: &BackendError) {
        log::error!("Audio driver error: {}", error);
        self.set_last_error(error);
        self.diagnostics.lock().driver_errors += 1;
    }

    pub(crate) fn set_last_error(&self, error: &BackendError) {
        *self.last_error.lock() = Some(error.to_string());
    }

    pub fn diagnostics(&self) -> FeedDiagnostics {
        self.diagnostics.lock().clone()
    }
}

/// Counters gathered during one advance, published under a single lock.
#[derive(Default)]
struct StepCounters {
    callbacks: u64,
    captured: u64,
    restarted: bool,
}

/// Bridges the pull-style buffer queue to a push-style audio callback.
///
/// One machine is created per `start()`. It walks
/// `WaitingForInteraction -> Playing -> Stopped` and never leaves `Stopped`.
/// Working buffers are sized once, on entering `Playing`, and live as long as
/// the machine.
pub struct AudioFeedStateMachine<D: BufferQueueDriver> {
    shared: Arc<DeviceShared<D>>,
    layout: StreamLayout,
    slots: Vec<SlotId>,
    callback: Box<dyn AudioIoCallback>,
    state: FeedState,
    announced: bool,
    stopped_sent: bool,
    input: PlanarBuffer,
    output: PlanarBuffer,
    output_scratch: Vec<i16>,
    capture_scratch: Vec<i16>,
}

impl<D: BufferQueueDriver> AudioFeedStateMachine<D> {
    pub fn new(
        shared: Arc<DeviceShared<D>>,
        layout: StreamLayout,
        slots: Vec<SlotId>,
        callback: Box<dyn AudioIoCallback>,
    ) -> Self {
        Self {
            shared,
            layout,
            slots,
            callback,
            state: FeedState::WaitingForInteraction,
            announced: false,
            stopped_sent: false,
            input: PlanarBuffer::default(),
            output: PlanarBuffer::default(),
            output_scratch: Vec::new(),
            capture_scratch: Vec::new(),
        }
    }

    pub fn state(&self) -> FeedState {
        self.state
    }

    /// Run one step. Never blocks beyond the driver calls themselves.
    pub fn advance(&mut self, stop_requested: bool) -> FeedStatus {
        match self.state {
            FeedState::WaitingForInteraction => {
                if stop_requested {
                    self.state = FeedState::Stopped;
                    return FeedStatus::Good;
                }
                self.begin_playback()
            }
            FeedState::Playing => {
                if stop_requested {
                    self.state = FeedState::Stopped;
                    self.send_stopped();
                    return FeedStatus::Good;
                }
                let shared = Arc::clone(&self.shared);
                let result = {
                    let mut driver = shared.driver.lock();
                    self.pump(&mut driver)
                };
                match result {
                    Ok(status) => status,
                    Err(e) => {
                        // Stays in Playing; the owner decides whether to stop.
                        self.shared.record_error(&e);
                        FeedStatus::Error
                    }
                }
            }
            FeedState::Stopped => FeedStatus::Good,
        }
    }

    fn begin_playback(&mut self) -> FeedStatus {
        self.callback.about_to_start(&self.layout);
        self.announced = true;
        self.state = FeedState::Playing;

        let frames = self.layout.buffer_size;
        self.input = PlanarBuffer::new(self.layout.input_channels, frames);
        self.output = PlanarBuffer::new(self.layout.output_channels, frames);
        self.output_scratch = vec![0; frames * self.layout.output_channels];
        self.capture_scratch = vec![0; MAX_BUFFER_SIZE * self.layout.input_channels];

        let result = {
            let mut driver = self.shared.driver.lock();
            driver.queue_slots(&self.slots).and_then(|_| driver.play())
        };
        match result {
            Ok(()) => {
                log::debug!("Audio feed playing with {} slots", self.slots.len());
                FeedStatus::Good
            }
            Err(e) => {
                self.shared.record_error(&e);
                FeedStatus::Error
            }
        }
    }

    fn pump(&mut self, driver: &mut D) -> Result<FeedStatus, BackendError> {
        let mut counters = StepCounters::default();

        if !driver.is_playing()? {
            driver.play()?;
            counters.restarted = true;
            log::debug!("Audio voice was not playing, restarted");
        }

        let processed = driver.processed_slots()?;
        if processed == 0 {
            if counters.restarted {
                self.shared.diagnostics.lock().playback_restarts += 1;
            }
            return Ok(FeedStatus::NeedToWait);
        }

        if processed >= self.slots.len() {
            self.shared.under_runs.fetch_add(1, Ordering::Relaxed);
            log::debug!("Audio under-run: all {} slots drained", processed);
        }

        self.input.clear();
        self.output.clear();

        let channels = self.layout.input_channels;
        if channels > 0 {
            let frames = driver
                .captured_frames()?
                .min(self.capture_scratch.len() / channels)
                .min(self.layout.buffer_size);
            if frames > 0 {
                driver.read_captured(&mut self.capture_scratch, frames)?;
                fixed_to_float(&self.capture_scratch, &mut self.input, frames);
                counters.captured = frames as u64;
            }
        }

        let result = self.refill(driver, processed, &mut counters);

        let mut diagnostics = self.shared.diagnostics.lock();
        diagnostics.callback_count += counters.callbacks;
        diagnostics.slots_refilled += counters.callbacks;
        diagnostics.captured_frames_total += counters.captured;
        if counters.restarted {
            diagnostics.playback_restarts += 1;
        }
        drop(diagnostics);

        result.map(|_| FeedStatus::Good)
    }

    fn refill(&mut self, driver: &mut D, processed: usize, counters: &mut StepCounters) -> Result<(), BackendError> {
        let format = self.layout.output_format;
        let frequency = self.layout.frequency();

        for _ in 0..processed {
            self.callback.process_block(&self.input, &mut self.output);
            counters.callbacks += 1;
            float_to_fixed(&self.output, &mut self.output_scratch);

            let slot = driver.unqueue_processed()?;
            driver.fill_slot(slot, format, &self.output_scratch, frequency)?;
            driver.queue_slots(&[slot])?;
        }
        Ok(())
    }

    fn send_stopped(&mut self) {
        if self.announced && !self.stopped_sent {
            self.stopped_sent = true;
            self.callback.stopped();
        }
    }
}

impl<D: BufferQueueDriver> Drop for AudioFeedStateMachine<D> {
    fn drop(&mut self) {
        self.send_stopped();
    }
}

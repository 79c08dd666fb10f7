use crate::models::audio_models::SampleFormat;
use crate::models::error::BackendError;

/// Handle of one queue slot (a fixed-size buffer cycled through the voice).
pub type SlotId = u32;

/// A buffer-queue audio API used for PCM streaming.
///
/// One output device and context, one playback voice with a queue of slots,
/// and an optional capture device. Slots are filled with interleaved 16-bit
/// PCM and cycled: once the voice has played a slot it counts as processed
/// and can be unqueued, refilled and queued again.
///
/// Implemented by:
/// - `SimulatedQueueDriver` (in-memory, native hosts and tests)
/// - `WebAudioQueueDriver` (browser, in `browser-backend-web`)
pub trait BufferQueueDriver: Send {
    /// Open the output device and make its context current.
    fn open_output(&mut self) -> Result<(), BackendError>;

    fn close_output(&mut self);

    fn open_capture(&mut self, frequency: u32, format: SampleFormat, buffer_frames: usize) -> Result<(), BackendError>;

    fn close_capture(&mut self);

    /// Create the playback voice with `slot_count` empty slots.
    fn create_voice(&mut self, slot_count: usize) -> Result<Vec<SlotId>, BackendError>;

    fn destroy_voice(&mut self);

    fn queue_slots(&mut self, slots: &[SlotId]) -> Result<(), BackendError>;

    /// Remove the oldest processed slot from the voice queue.
    fn unqueue_processed(&mut self) -> Result<SlotId, BackendError>;

    fn fill_slot(&mut self, slot: SlotId, format: SampleFormat, samples: &[i16], frequency: u32) -> Result<(), BackendError>;

    fn play(&mut self) -> Result<(), BackendError>;

    fn is_playing(&mut self) -> Result<bool, BackendError>;

    /// Number of queued slots the voice has finished playing.
    fn processed_slots(&mut self) -> Result<usize, BackendError>;

    fn start_capture(&mut self) -> Result<(), BackendError>;

    fn stop_capture(&mut self);

    /// Frames available from the capture device. Stays at zero until the user
    /// grants microphone access.
    fn captured_frames(&mut self) -> Result<usize, BackendError>;

    /// Move `frames` captured frames into `dst`, interleaved.
    fn read_captured(&mut self, dst: &mut [i16], frames: usize) -> Result<(), BackendError>;
}

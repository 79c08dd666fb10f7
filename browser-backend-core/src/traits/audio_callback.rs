use crate::models::audio_models::StreamLayout;
use crate::processing::planar_buffer::PlanarBuffer;

/// Push-style audio callback driven by a feed state machine.
///
/// `about_to_start` fires exactly once before any `stopped`, and `stopped`
/// fires at most once per feed. `process_block` runs once per refilled queue
/// slot, on whichever thread advances the feed.
pub trait AudioIoCallback: Send {
    fn about_to_start(&mut self, layout: &StreamLayout);

    /// Render `output.frames()` frames. `input` holds captured samples, or
    /// silence when nothing has been captured.
    fn process_block(&mut self, input: &PlanarBuffer, output: &mut PlanarBuffer);

    fn stopped(&mut self);
}

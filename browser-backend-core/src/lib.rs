//! # browser-backend-core
//!
//! Platform-agnostic core for running the application framework inside a
//! browser tab.
//!
//! Provides the audio feed state machine over a buffer-queue audio API, the
//! cooperative session registry, device binding, sample conversion, the
//! message queue and animation-frame loop, window peers, the input event
//! proxy, MIDI ports, a polled clipboard, web input streams and special
//! file-system locations.
//! Browser glue (`browser-backend-web`) implements the driver and surface
//! traits and plugs into these types.
//!
//! ## Architecture
//!
//! ```text
//! browser-backend-core (this crate)
//! ├── traits/       ← BufferQueueDriver, AudioIoCallback, PeerSurface, PeerHandler, MidiTransport, ClipboardBackend
//! ├── models/       ← BackendError, FeedState, BackendConfiguration, StreamLayout, input and MIDI records
//! ├── processing/   ← PlanarBuffer, CaptureRing, float/fixed sample conversion
//! ├── session/      ← AudioFeedStateMachine, SessionRegistry, AudioThread, BufferQueueAudioDevice
//! ├── messaging/    ← MessageQueue, FrameLoop, Clock
//! ├── windowing/    ← WindowPeer, PeerStack (z-order, focus, budgeted repaints)
//! ├── input/        ← EventSender (producer), EventProxy (message-thread consumer)
//! ├── midi/         ← MidiDeviceDirectory, MidiInput, MidiOutput
//! ├── network/      ← WebRequest, WebResponse, WebInputStream
//! ├── platform/     ← PolledClipboard, SpecialLocations
//! └── drivers/      ← SimulatedQueueDriver, HeadlessSurface, LoopbackMidiTransport
//! ```

pub mod drivers;
pub mod input;
pub mod messaging;
pub mod midi;
pub mod models;
pub mod network;
pub mod platform;
pub mod processing;
pub mod session;
pub mod traits;
pub mod windowing;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export key types at crate root for convenience.
pub use drivers::headless_surface::HeadlessSurface;
pub use drivers::loopback_midi::LoopbackMidiTransport;
pub use drivers::simulated::{SimulatedQueueControl, SimulatedQueueDriver};
pub use input::event_proxy::EventProxy;
pub use input::event_sender::EventSender;
pub use messaging::clock::{system_clock, Clock, ManualClock};
pub use messaging::frame_loop::FrameLoop;
pub use messaging::message_queue::MessageQueue;
pub use messaging::window_message::WindowMessage;
pub use midi::directory::MidiDeviceDirectory;
pub use midi::ports::{MidiInput, MidiOutput};
pub use models::audio_models::{ChannelMask, FeedDiagnostics, SampleFormat, StreamLayout};
pub use models::config::{BackendConfiguration, ThreadingMode};
pub use models::error::BackendError;
pub use models::geometry::{Point, PointF, Rect};
pub use models::input_models::{InputEvent, KeyPress, ModifierKeys, PeerId, StandardCursor, WheelDetails};
pub use models::midi_models::{MidiDeviceInfo, MidiMessage};
pub use models::state::{FeedState, FeedStatus};
pub use network::web_stream::{parse_http_headers, WebInputStream, WebRequest, WebResponse};
pub use platform::clipboard::{ClipboardCache, PolledClipboard};
pub use platform::special_locations::{SpecialLocation, SpecialLocations};
pub use processing::capture_ring::CaptureRing;
pub use processing::planar_buffer::PlanarBuffer;
pub use session::device::BufferQueueAudioDevice;
pub use session::device_type::BufferQueueDeviceType;
pub use session::registry::SessionRegistry;
pub use traits::audio_callback::AudioIoCallback;
pub use traits::buffer_queue_driver::{BufferQueueDriver, SlotId};
pub use traits::clipboard::ClipboardBackend;
pub use traits::midi_transport::{MidiInputCallback, MidiOutputPort, MidiTransport};
pub use traits::peer::{PeerHandler, PeerSurface, RgbaImage, TextInputTarget};
pub use windowing::peer_stack::PeerStack;

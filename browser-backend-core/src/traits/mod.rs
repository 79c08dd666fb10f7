pub mod audio_callback;
pub mod buffer_queue_driver;
pub mod clipboard;
pub mod midi_transport;
pub mod peer;

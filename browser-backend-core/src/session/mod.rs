pub mod audio_thread;
pub mod device;
pub mod device_type;
pub mod feed;
pub mod registry;

pub mod audio_models;
pub mod config;
pub mod error;
pub mod geometry;
pub mod input_models;
pub mod midi_models;
pub mod state;

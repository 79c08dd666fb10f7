pub mod headless_surface;
pub mod loopback_midi;
pub mod simulated;

pub mod directory;
pub mod ports;

pub mod capture_ring;
pub mod planar_buffer;
pub mod sample_converter;

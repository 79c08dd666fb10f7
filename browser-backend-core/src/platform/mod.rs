pub mod clipboard;
pub mod special_locations;

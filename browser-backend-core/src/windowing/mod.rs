pub mod peer;
pub mod peer_stack;

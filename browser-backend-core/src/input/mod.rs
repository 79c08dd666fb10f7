pub mod event_proxy;
pub mod event_sender;

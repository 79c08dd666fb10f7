pub mod clock;
pub mod frame_loop;
pub mod message_queue;
pub mod window_message;

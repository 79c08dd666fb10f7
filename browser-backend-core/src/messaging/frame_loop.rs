use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

/// Callback run once per animation frame on the browser main thread.
pub type FrameCallback = Box<dyn FnMut() + Send + 'static>;

/// Per-frame callback list driven by the browser's animation-frame tick.
///
/// Audio feeds in cooperative mode must be advanced on the browser main
/// thread, which may differ from the application's message thread.
pub struct FrameLoop {
    callbacks: Mutex<Vec<FrameCallback>>,
    message_thread: ThreadId,
    main_thread: Mutex<Option<ThreadId>>,
    frames: AtomicU64,
}

impl FrameLoop {
    /// Must be created on the message thread.
    pub fn new() -> Self {
        Self {
            callbacks: Mutex::new(Vec::new()),
            message_thread: thread::current().id(),
            main_thread: Mutex::new(None),
            frames: AtomicU64::new(0),
        }
    }

    pub fn register(&self, callback: FrameCallback) {
        self.callbacks.lock().push(callback);
    }

    pub fn callback_count(&self) -> usize {
        self.callbacks.lock().len()
    }

    /// Record the calling thread as the browser main thread.
    /// Returns whether the message thread is proxied onto another thread.
    pub fn register_main_thread(&self) -> bool {
        let current = thread::current().id();
        *self.main_thread.lock() = Some(current);
        let proxied = current != self.message_thread;
        log::info!("Main thread registered, message thread proxied: {}", proxied);
        proxied
    }

    /// Unknown until the main thread has been registered; treated as not proxied.
    pub fn is_message_thread_proxied(&self) -> bool {
        matches!(*self.main_thread.lock(), Some(main) if main != self.message_thread)
    }

    pub fn is_message_thread(&self) -> bool {
        thread::current().id() == self.message_thread
    }

    /// Run every registered callback once, in registration order.
    ///
    /// Callbacks may register further callbacks; those first run on the next
    /// frame.
    pub fn on_animation_frame(&self) {
        let mut running = std::mem::take(&mut *self.callbacks.lock());
        for callback in running.iter_mut() {
            callback();
        }

        let mut callbacks = self.callbacks.lock();
        running.append(&mut callbacks);
        *callbacks = running;
        drop(callbacks);

        self.frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frame_count(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }
}

impl Default for FrameLoop {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn callbacks_run_in_registration_order() {
        let frame_loop = FrameLoop::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let log = Arc::clone(&log);
            frame_loop.register(Box::new(move || log.lock().push(i)));
        }

        frame_loop.on_animation_frame();
        frame_loop.on_animation_frame();

        assert_eq!(*log.lock(), vec![0, 1, 2, 0, 1, 2]);
        assert_eq!(frame_loop.frame_count(), 2);
    }

    #[test]
    fn registering_from_another_thread_marks_proxied() {
        let frame_loop = Arc::new(FrameLoop::new());
        assert!(!frame_loop.is_message_thread_proxied());

        let registered = {
            let frame_loop = Arc::clone(&frame_loop);
            thread::spawn(move || frame_loop.register_main_thread())
        };
        assert!(registered.join().unwrap());
        assert!(frame_loop.is_message_thread_proxied());
        assert!(!frame_loop.register_main_thread());
    }
}

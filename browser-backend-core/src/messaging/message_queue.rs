use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

/// Mutex-protected FIFO between event producers and the message thread.
///
/// Producers on any thread `post`; only the message thread drains. The lock
/// is released while a message is handled, so handlers may post again.
pub struct MessageQueue<M> {
    queue: Mutex<VecDeque<M>>,
    quit: AtomicBool,
}

impl<M> MessageQueue<M> {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            quit: AtomicBool::new(false),
        }
    }

    pub fn post(&self, message: M) {
        self.queue.lock().push_back(message);
    }

    /// Handle every message present or posted while draining, in order.
    /// Returns the number handled.
    pub fn dispatch_pending(&self, mut handler: impl FnMut(M)) -> usize {
        let mut handled = 0;
        loop {
            let next = self.queue.lock().pop_front();
            match next {
                Some(message) => {
                    handler(message);
                    handled += 1;
                }
                None => return handled,
            }
        }
    }

    /// Handle at most the messages queued right now; later posts wait for the
    /// next cycle.
    pub fn dispatch_batch(&self, mut handler: impl FnMut(M)) -> usize {
        let batch: Vec<M> = self.queue.lock().drain(..).collect();
        let count = batch.len();
        for message in batch {
            handler(message);
        }
        count
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    pub fn request_quit(&self) {
        log::info!("Message loop quit requested");
        self.quit.store(true, Ordering::SeqCst);
    }

    pub fn quit_requested(&self) -> bool {
        self.quit.load(Ordering::SeqCst)
    }
}

impl<M> Default for MessageQueue<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn preserves_fifo_order() {
        let queue = MessageQueue::new();
        for i in 0..5 {
            queue.post(i);
        }

        let mut seen = Vec::new();
        assert_eq!(queue.dispatch_pending(|m| seen.push(m)), 5);
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn handlers_may_post() {
        let queue = MessageQueue::new();
        queue.post(3u32);

        let mut seen = Vec::new();
        queue.dispatch_pending(|m| {
            seen.push(m);
            if m > 0 {
                queue.post(m - 1);
            }
        });
        assert_eq!(seen, vec![3, 2, 1, 0]);
    }

    #[test]
    fn batch_defers_reposted_messages() {
        let queue = MessageQueue::new();
        queue.post(1u32);

        assert_eq!(queue.dispatch_batch(|m| queue.post(m + 1)), 1);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn producers_on_other_threads() {
        let queue = Arc::new(MessageQueue::new());
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..100 {
                    queue.post(i);
                }
            })
        };
        producer.join().unwrap();

        let mut seen = Vec::new();
        queue.dispatch_pending(|m| seen.push(m));
        assert_eq!(seen, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn quit_flag() {
        let queue: MessageQueue<()> = MessageQueue::new();
        assert!(!queue.quit_requested());
        queue.request_quit();
        assert!(queue.quit_requested());
    }
}

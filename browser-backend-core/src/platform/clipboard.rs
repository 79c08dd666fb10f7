use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::error::BackendError;
use crate::traits::clipboard::ClipboardBackend;

/// Last known clipboard text, shared with backends that refresh it
/// asynchronously.
#[derive(Clone, Default)]
pub struct ClipboardCache {
    text: Arc<Mutex<Option<String>>>,
}

impl ClipboardCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, text: impl Into<String>) {
        *self.text.lock() = Some(text.into());
    }

    pub fn get(&self) -> Option<String> {
        self.text.lock().clone()
    }
}

/// Clipboard whose reads are served from a cache refreshed in the
/// background at a fixed interval.
pub struct PolledClipboard<B: ClipboardBackend> {
    backend: B,
    cache: ClipboardCache,
    interval: Duration,
    last_poll: Option<Duration>,
}

impl<B: ClipboardBackend> PolledClipboard<B> {
    pub fn new(backend: B, interval: Duration) -> Self {
        Self {
            backend,
            cache: ClipboardCache::new(),
            interval,
            last_poll: None,
        }
    }

    pub fn set_text(&mut self, text: &str) -> Result<(), BackendError> {
        self.backend.write_text(text)?;
        self.cache.store(text);
        Ok(())
    }

    /// Cached clipboard text; empty until the first refresh lands.
    pub fn text(&self) -> String {
        self.cache.get().unwrap_or_default()
    }

    /// Request a refresh if the poll interval has elapsed since the last one.
    pub fn poll(&mut self, now: Duration) -> bool {
        let due = match self.last_poll {
            Some(last) => now.saturating_sub(last) >= self.interval,
            None => true,
        };
        if due {
            self.last_poll = Some(now);
            self.backend.request_refresh(self.cache.clone());
        }
        due
    }

    pub fn cache(&self) -> &ClipboardCache {
        &self.cache
    }
}

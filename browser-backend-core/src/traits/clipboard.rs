use crate::models::error::BackendError;
use crate::platform::clipboard::ClipboardCache;

/// Access to the system clipboard.
///
/// Reads are asynchronous and permission-gated in the browser, so reading is
/// split into a refresh request that eventually stores the text into the
/// shared cache.
pub trait ClipboardBackend {
    fn write_text(&mut self, text: &str) -> Result<(), BackendError>;

    /// Ask for the clipboard contents to be stored into `cache` when available.
    fn request_refresh(&mut self, cache: ClipboardCache);
}

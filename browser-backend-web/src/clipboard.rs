use browser_backend_core::{BackendError, ClipboardBackend, ClipboardCache};
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::Clipboard;

fn navigator_clipboard() -> Result<Clipboard, BackendError> {
    let window = web_sys::window().ok_or_else(|| BackendError::Resource("no window".into()))?;
    Ok(window.navigator().clipboard())
}

/// System clipboard through `navigator.clipboard`.
///
/// Both directions are asynchronous and may be refused by the browser; reads
/// land in the cache whenever the promise resolves.
#[derive(Debug, Default)]
pub struct NavigatorClipboard;

impl ClipboardBackend for NavigatorClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), BackendError> {
        let promise = navigator_clipboard()?.write_text(text);
        spawn_local(async move {
            if let Err(e) = JsFuture::from(promise).await {
                log::warn!("Clipboard write rejected: {:?}", e);
            }
        });
        Ok(())
    }

    fn request_refresh(&mut self, cache: ClipboardCache) {
        let clipboard = match navigator_clipboard() {
            Ok(clipboard) => clipboard,
            Err(e) => {
                log::debug!("Clipboard unavailable: {}", e);
                return;
            }
        };
        let promise = clipboard.read_text();
        spawn_local(async move {
            match JsFuture::from(promise).await {
                Ok(value) => {
                    if let Some(text) = value.as_string() {
                        cache.store(text);
                    }
                }
                Err(e) => log::debug!("Clipboard read rejected: {:?}", e),
            }
        });
    }
}

//! # browser-backend-web
//!
//! WebAssembly/DOM backend for browser-backend-core.
//!
//! Provides:
//! - `WebAudioQueueDriver`: buffer-queue audio driver over WebAudio, with
//!   microphone capture through `getUserMedia`
//! - `DomSurface`: one canvas plus an IME text-input proxy per window peer
//! - `listeners`: window mouse, wheel and keyboard listeners
//! - `NavigatorClipboard`: asynchronous system clipboard
//! - `fetch`: `window.fetch` transport behind `WebInputStream`
//! - `runtime` and the exported entry points (`init_backend`, the
//!   `backend_*_callback` functions)
//!
//! ## Platform Requirements
//! - `wasm32-unknown-unknown`, built with `wasm-bindgen`
//! - Audio only starts after a user gesture has resumed the `AudioContext`
//!
//! ## Usage
//! ```ignore
//! import init, { init_backend } from "./browser_backend_web.js";
//! await init();
//! init_backend(JSON.stringify({ target_frame_rate: 60 }));
//! ```

#[cfg(target_arch = "wasm32")]
pub mod clipboard;
#[cfg(target_arch = "wasm32")]
pub mod dom_surface;
#[cfg(target_arch = "wasm32")]
pub mod exports;
#[cfg(target_arch = "wasm32")]
pub mod fetch;
#[cfg(target_arch = "wasm32")]
pub mod listeners;
#[cfg(target_arch = "wasm32")]
mod microphone;
#[cfg(target_arch = "wasm32")]
pub mod runtime;
#[cfg(target_arch = "wasm32")]
pub mod web_audio;

#[cfg(target_arch = "wasm32")]
pub use clipboard::NavigatorClipboard;
#[cfg(target_arch = "wasm32")]
pub use dom_surface::DomSurface;
#[cfg(target_arch = "wasm32")]
pub use fetch::{fetch, open_web_input_stream};
#[cfg(target_arch = "wasm32")]
pub use runtime::{with_runtime, BrowserRuntime};
#[cfg(target_arch = "wasm32")]
pub use web_audio::WebAudioQueueDriver;

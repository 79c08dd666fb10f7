use browser_backend_core::{BackendConfiguration, BackendError, ThreadingMode};
use wasm_bindgen::prelude::*;

use crate::runtime::{self, with_runtime, BrowserRuntime};

fn to_js(e: BackendError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Set up logging, the runtime and the animation-frame loop.
///
/// `config_json` may be empty for defaults. Calling it again is a no-op.
#[wasm_bindgen]
pub fn init_backend(config_json: &str) -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();

    if runtime::is_installed() {
        log::debug!("Backend already initialised");
        return Ok(());
    }

    let mut config = if config_json.trim().is_empty() {
        BackendConfiguration::default()
    } else {
        BackendConfiguration::from_json(config_json).map_err(to_js)?
    };
    if config.threading == ThreadingMode::DedicatedThread {
        log::warn!("Threads are unavailable in this build; audio feeds run cooperatively");
        config.threading = ThreadingMode::Cooperative;
    }

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let runtime = BrowserRuntime::new(&window, config).map_err(to_js)?;
    runtime::install(runtime);
    runtime::start_animation_loop(&window)?;

    log::info!("Browser backend initialised");
    Ok(())
}

#[wasm_bindgen]
#[allow(clippy::too_many_arguments)]
pub fn backend_mouse_callback(
    kind: &str,
    x: i32,
    y: i32,
    which: i32,
    shift: bool,
    ctrl: bool,
    alt: bool,
    wheel_delta: i32,
) -> bool {
    with_runtime(|rt| rt.sender().mouse(kind, x, y, which, shift, ctrl, alt, wheel_delta)).unwrap_or(false)
}

#[wasm_bindgen]
pub fn backend_keyboard_callback(kind: &str, key_code: i32, key: &str) -> bool {
    with_runtime(|rt| rt.sender().keyboard(kind, key_code, key)).unwrap_or(false)
}

/// IME composition event for the peer whose DOM id is `peer_id`.
#[wasm_bindgen]
pub fn backend_input_callback(peer_id: &str, kind: &str, data: &str) -> bool {
    with_runtime(|rt| rt.sender().composition(peer_id, kind, data)).unwrap_or(false)
}

#[wasm_bindgen]
pub fn backend_animation_frame_callback(timestamp: f64) -> i32 {
    runtime::animation_frame(timestamp)
}

#[wasm_bindgen]
pub fn backend_request_quit() {
    with_runtime(|rt| rt.request_quit());
}

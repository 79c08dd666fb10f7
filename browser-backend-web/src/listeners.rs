use browser_backend_core::EventSender;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{KeyboardEvent, MouseEvent, WheelEvent, Window};

/// Pixel wheel deltas are about 100 per notch; the framework expects the
/// legacy 120-per-notch `wheelDelta` scale with the opposite sign.
const WHEEL_DELTA_SCALE: f64 = -1.2;

enum Listener {
    Mouse(Closure<dyn FnMut(MouseEvent)>),
    Wheel(Closure<dyn FnMut(WheelEvent)>),
    Keyboard(Closure<dyn FnMut(KeyboardEvent)>),
}

impl Listener {
    fn function(&self) -> &js_sys::Function {
        match self {
            Self::Mouse(c) => c.as_ref().unchecked_ref(),
            Self::Wheel(c) => c.as_ref().unchecked_ref(),
            Self::Keyboard(c) => c.as_ref().unchecked_ref(),
        }
    }
}

/// Window-level mouse, wheel and keyboard listeners feeding an
/// [`EventSender`]. Listeners are removed on drop.
pub struct WindowListeners {
    window: Window,
    listeners: Vec<(&'static str, Listener)>,
}

impl Drop for WindowListeners {
    fn drop(&mut self) {
        for (event, listener) in &self.listeners {
            let _ = self
                .window
                .remove_event_listener_with_callback(event, listener.function());
        }
    }
}

fn mouse_listener(sender: &EventSender, kind: &'static str, prevent_default: bool) -> Listener {
    let sender = sender.clone();
    Listener::Mouse(Closure::wrap(Box::new(move |e: MouseEvent| {
        if prevent_default {
            e.prevent_default();
        }
        sender.mouse(
            kind,
            e.page_x(),
            e.page_y(),
            e.button() as i32,
            e.shift_key(),
            e.ctrl_key(),
            e.alt_key(),
            0,
        );
    }) as Box<dyn FnMut(MouseEvent)>))
}

fn wheel_listener(sender: &EventSender) -> Listener {
    let sender = sender.clone();
    Listener::Wheel(Closure::wrap(Box::new(move |e: WheelEvent| {
        sender.mouse(
            "wheel",
            e.page_x(),
            e.page_y(),
            e.button() as i32,
            e.shift_key(),
            e.ctrl_key(),
            e.alt_key(),
            (e.delta_y() * WHEEL_DELTA_SCALE).round() as i32,
        );
    }) as Box<dyn FnMut(WheelEvent)>))
}

fn keyboard_listener(sender: &EventSender, kind: &'static str, prevent_default: bool) -> Listener {
    let sender = sender.clone();
    Listener::Keyboard(Closure::wrap(Box::new(move |e: KeyboardEvent| {
        if prevent_default {
            e.prevent_default();
        }
        sender.keyboard(kind, e.key_code() as i32, &e.key());
    }) as Box<dyn FnMut(KeyboardEvent)>))
}

/// Attach the listeners to `window`. Presses, releases and key-downs are
/// kept from reaching the page beneath.
pub fn attach_window_listeners(window: &Window, sender: &EventSender) -> Result<WindowListeners, JsValue> {
    let listeners = vec![
        ("mousedown", mouse_listener(sender, "down", true)),
        ("mouseup", mouse_listener(sender, "up", true)),
        ("mousemove", mouse_listener(sender, "move", false)),
        ("mouseenter", mouse_listener(sender, "enter", false)),
        ("mouseleave", mouse_listener(sender, "leave", false)),
        ("wheel", wheel_listener(sender)),
        ("keydown", keyboard_listener(sender, "down", true)),
        ("keyup", keyboard_listener(sender, "up", false)),
    ];

    let mut attached = WindowListeners {
        window: window.clone(),
        listeners: Vec::with_capacity(listeners.len()),
    };
    for (event, listener) in listeners {
        window.add_event_listener_with_callback(event, listener.function())?;
        attached.listeners.push((event, listener));
    }
    log::debug!("Attached {} window listeners", attached.listeners.len());
    Ok(attached)
}

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use browser_backend_core::{
    BackendConfiguration, BackendError, BufferQueueAudioDevice, BufferQueueDeviceType, Clock, EventProxy, EventSender,
    FrameLoop, MessageQueue, PeerStack, PolledClipboard, SessionRegistry, SpecialLocations, WindowMessage,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::Window;

use crate::clipboard::NavigatorClipboard;
use crate::dom_surface::DomSurface;
use crate::listeners::{attach_window_listeners, WindowListeners};
use crate::web_audio::WebAudioQueueDriver;

/// `performance.now()` as a `Clock`.
fn performance_clock() -> Clock {
    Arc::new(|| {
        let millis = web_sys::window()
            .and_then(|w| w.performance())
            .map(|p| p.now())
            .unwrap_or(0.0);
        Duration::from_secs_f64(millis.max(0.0) / 1000.0)
    })
}

/// Everything the backend owns on the browser main thread.
pub struct BrowserRuntime {
    config: BackendConfiguration,
    queue: Arc<MessageQueue<WindowMessage>>,
    frame_loop: Arc<FrameLoop>,
    device_type: BufferQueueDeviceType,
    proxy: EventProxy,
    clipboard: PolledClipboard<NavigatorClipboard>,
    clock: Clock,
    _listeners: WindowListeners,
}

impl BrowserRuntime {
    pub fn new(window: &Window, config: BackendConfiguration) -> Result<Self, BackendError> {
        let clock = performance_clock();
        let queue = Arc::new(MessageQueue::new());
        let sender = EventSender::new(Arc::clone(&queue));

        let surface = DomSurface::new(window.clone(), sender.clone())?;
        let mut stack = PeerStack::new(
            Box::new(surface),
            Arc::clone(&queue),
            Arc::clone(&clock),
            config.frame_budget(),
        );
        stack.set_message_thread_proxied(config.message_thread_proxied);
        let proxy = EventProxy::new(Arc::clone(&queue), stack, Arc::clone(&clock));

        let frame_loop = Arc::new(FrameLoop::new());
        let device_type = BufferQueueDeviceType::new(config.clone(), Arc::new(SessionRegistry::new()), &frame_loop);

        let listeners = attach_window_listeners(window, &sender)
            .map_err(|e| BackendError::Resource(format!("failed to attach window listeners: {:?}", e)))?;

        match SpecialLocations::from_env().ensure_user_directories() {
            Ok(created) if !created.is_empty() => log::info!("Created {} user directories", created.len()),
            Ok(_) => {}
            Err(e) => log::debug!("User directories unavailable: {}", e),
        }

        let clipboard = PolledClipboard::new(NavigatorClipboard, config.clipboard_poll_interval());

        Ok(Self {
            config,
            queue,
            frame_loop,
            device_type,
            proxy,
            clipboard,
            clock,
            _listeners: listeners,
        })
    }

    pub fn config(&self) -> &BackendConfiguration {
        &self.config
    }

    pub fn sender(&self) -> EventSender {
        self.proxy.sender()
    }

    pub fn frame_loop(&self) -> &Arc<FrameLoop> {
        &self.frame_loop
    }

    pub fn peers(&self) -> &PeerStack {
        self.proxy.stack()
    }

    pub fn peers_mut(&mut self) -> &mut PeerStack {
        self.proxy.stack_mut()
    }

    pub fn input(&self) -> &EventProxy {
        &self.proxy
    }

    pub fn clipboard_mut(&mut self) -> &mut PolledClipboard<NavigatorClipboard> {
        &mut self.clipboard
    }

    pub fn device_type(&self) -> &BufferQueueDeviceType {
        &self.device_type
    }

    pub fn create_audio_device(&self) -> Option<BufferQueueAudioDevice<WebAudioQueueDriver>> {
        let name = self.device_type.type_name();
        self.device_type.create_device(name, name, WebAudioQueueDriver::new())
    }

    pub fn request_quit(&self) {
        self.queue.request_quit();
    }

    /// Returns whether the message thread is proxied away from this thread.
    pub fn register_main_thread(&mut self) -> bool {
        let proxied = self.frame_loop.register_main_thread();
        let proxied = proxied || self.config.message_thread_proxied;
        self.proxy.stack_mut().set_message_thread_proxied(proxied);
        proxied
    }

    /// One animation frame: advance cooperative feeds, then drain the message
    /// queue, then poll the clipboard.
    pub fn animation_frame(&mut self) {
        self.frame_loop.on_animation_frame();
        if !self.queue.quit_requested() {
            self.proxy.dispatch_pending();
        }
        self.clipboard.poll((self.clock)());
    }
}

thread_local! {
    static RUNTIME: RefCell<Option<BrowserRuntime>> = const { RefCell::new(None) };
}

/// Install `runtime` unless one is already running. Returns whether it was
/// installed.
pub fn install(runtime: BrowserRuntime) -> bool {
    RUNTIME.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_some() {
            return false;
        }
        *slot = Some(runtime);
        true
    })
}

pub fn is_installed() -> bool {
    RUNTIME.with(|cell| cell.try_borrow().map(|slot| slot.is_some()).unwrap_or(true))
}

/// Run `f` against the installed runtime.
///
/// Not re-entrant: calls made from inside a runtime callback (peer handlers,
/// frame callbacks) get `None`.
pub fn with_runtime<R>(f: impl FnOnce(&mut BrowserRuntime) -> R) -> Option<R> {
    RUNTIME.with(|cell| match cell.try_borrow_mut() {
        Ok(mut slot) => slot.as_mut().map(f),
        Err(_) => {
            log::warn!("Backend runtime accessed re-entrantly");
            None
        }
    })
}

/// Animation-frame entry point. A negative timestamp only registers the main
/// thread and reports whether the message thread is proxied (1 if so).
pub fn animation_frame(timestamp: f64) -> i32 {
    if timestamp < 0.0 {
        return with_runtime(|rt| rt.register_main_thread() as i32).unwrap_or(0);
    }
    with_runtime(|rt| rt.animation_frame());
    0
}

/// Drive [`animation_frame`] from `requestAnimationFrame` for the lifetime of
/// the page.
pub fn start_animation_loop(window: &Window) -> Result<(), JsValue> {
    let handle: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::new(RefCell::new(None));
    let next = Rc::clone(&handle);

    *handle.borrow_mut() = Some(Closure::wrap(Box::new(move |timestamp: f64| {
        animation_frame(timestamp);
        let Some(window) = web_sys::window() else {
            return;
        };
        if let Some(callback) = next.borrow().as_ref() {
            if let Err(e) = window.request_animation_frame(callback.as_ref().unchecked_ref()) {
                log::error!("requestAnimationFrame failed: {:?}", e);
            }
        }
    }) as Box<dyn FnMut(f64)>));

    if let Some(callback) = handle.borrow().as_ref() {
        window.request_animation_frame(callback.as_ref().unchecked_ref())?;
    }
    Ok(())
}

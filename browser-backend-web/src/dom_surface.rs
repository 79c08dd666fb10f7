use std::collections::HashMap;

use browser_backend_core::{BackendError, EventSender, PeerId, PeerSurface, Point, Rect, RgbaImage, StandardCursor};
use wasm_bindgen::prelude::*;
use wasm_bindgen::{Clamped, JsCast};
use web_sys::{
    CanvasRenderingContext2d, CompositionEvent, Document, HtmlCanvasElement, HtmlElement, HtmlInputElement, ImageData,
    Window,
};

const COMPOSITION_EVENTS: [&str; 3] = ["compositionstart", "compositionupdate", "compositionend"];

struct PeerElements {
    canvas: HtmlCanvasElement,
    /// Invisible input that anchors the platform IME near the caret.
    text_input: HtmlInputElement,
    composition_listeners: Vec<(&'static str, Closure<dyn FnMut(CompositionEvent)>)>,
}

impl PeerElements {
    fn remove(self) {
        for (event, listener) in &self.composition_listeners {
            let _ = self
                .text_input
                .remove_event_listener_with_callback(event, listener.as_ref().unchecked_ref());
        }
        self.text_input.remove();
        self.canvas.remove();
    }
}

fn set_style(element: &HtmlElement, properties: &[(&str, &str)]) {
    let style = element.style();
    for (name, value) in properties {
        if let Err(e) = style.set_property(name, value) {
            log::debug!("Setting style {} failed: {:?}", name, e);
        }
    }
}

fn px(value: i32) -> String {
    format!("{}px", value)
}

fn dom_error(what: &str, e: JsValue) -> BackendError {
    BackendError::Resource(format!("{}: {:?}", what, e))
}

/// `PeerSurface` backed by absolutely positioned canvases in the page body.
pub struct DomSurface {
    window: Window,
    document: Document,
    sender: EventSender,
    peers: HashMap<PeerId, PeerElements>,
}

impl DomSurface {
    pub fn new(window: Window, sender: EventSender) -> Result<Self, BackendError> {
        let document = window
            .document()
            .ok_or_else(|| BackendError::Resource("window has no document".into()))?;
        Ok(Self {
            window,
            document,
            sender,
            peers: HashMap::new(),
        })
    }

    fn body(&self) -> Result<HtmlElement, BackendError> {
        self.document
            .body()
            .ok_or_else(|| BackendError::Resource("document has no body".into()))
    }

    fn elements(&self, id: &PeerId) -> Option<&PeerElements> {
        let elements = self.peers.get(id);
        if elements.is_none() {
            log::warn!("No canvas for peer {}", id);
        }
        elements
    }

    fn create_canvas(&self, id: &PeerId, bounds: Rect, z_index: i32) -> Result<HtmlCanvasElement, BackendError> {
        let canvas: HtmlCanvasElement = self
            .document
            .create_element("canvas")
            .map_err(|e| dom_error("failed to create canvas", e))?
            .dyn_into()
            .map_err(|_| BackendError::Resource("created element is not a canvas".into()))?;
        canvas.set_id(id.as_str());
        canvas.set_width(bounds.width.max(0) as u32);
        canvas.set_height(bounds.height.max(0) as u32);
        set_style(
            &canvas,
            &[
                ("position", "absolute"),
                ("left", px(bounds.x).as_str()),
                ("top", px(bounds.y).as_str()),
                ("z-index", z_index.to_string().as_str()),
            ],
        );
        Ok(canvas)
    }

    fn create_text_input(
        &self,
        id: &PeerId,
        z_index: i32,
    ) -> Result<(HtmlInputElement, Vec<(&'static str, Closure<dyn FnMut(CompositionEvent)>)>), BackendError> {
        let input: HtmlInputElement = self
            .document
            .create_element("input")
            .map_err(|e| dom_error("failed to create text input", e))?
            .dyn_into()
            .map_err(|_| BackendError::Resource("created element is not an input".into()))?;
        input.set_type("text");
        set_style(
            &input,
            &[
                ("position", "absolute"),
                ("opacity", "0"),
                ("pointer-events", "none"),
                ("width", "1px"),
                ("height", "1px"),
                ("z-index", z_index.to_string().as_str()),
            ],
        );

        let mut listeners = Vec::with_capacity(COMPOSITION_EVENTS.len());
        for event in COMPOSITION_EVENTS {
            let sender = self.sender.clone();
            let peer = id.clone();
            let field = input.clone();
            let listener = Closure::wrap(Box::new(move |e: CompositionEvent| {
                sender.composition(peer.as_str(), &e.type_(), &e.data().unwrap_or_default());
                if e.type_() == "compositionend" {
                    field.set_value("");
                }
            }) as Box<dyn FnMut(CompositionEvent)>);
            input
                .add_event_listener_with_callback(event, listener.as_ref().unchecked_ref())
                .map_err(|e| dom_error("failed to attach composition listener", e))?;
            listeners.push((event, listener));
        }
        Ok((input, listeners))
    }
}

impl PeerSurface for DomSurface {
    fn create(&mut self, id: &PeerId, bounds: Rect, z_index: i32) -> Result<(), BackendError> {
        if self.peers.contains_key(id) {
            return Err(BackendError::Resource(format!("canvas {} already exists", id)));
        }
        let body = self.body()?;
        let canvas = self.create_canvas(id, bounds, z_index)?;
        let (text_input, composition_listeners) = self.create_text_input(id, z_index)?;

        body.append_child(&canvas)
            .map_err(|e| dom_error("failed to attach canvas", e))?;
        body.append_child(&text_input)
            .map_err(|e| dom_error("failed to attach text input", e))?;

        self.peers.insert(
            id.clone(),
            PeerElements {
                canvas,
                text_input,
                composition_listeners,
            },
        );
        Ok(())
    }

    fn destroy(&mut self, id: &PeerId) {
        if let Some(elements) = self.peers.remove(id) {
            elements.remove();
        }
    }

    fn set_bounds(&mut self, id: &PeerId, bounds: Rect) {
        if let Some(elements) = self.elements(id) {
            elements.canvas.set_width(bounds.width.max(0) as u32);
            elements.canvas.set_height(bounds.height.max(0) as u32);
            set_style(&elements.canvas, &[("left", px(bounds.x).as_str()), ("top", px(bounds.y).as_str())]);
        }
    }

    fn set_visible(&mut self, id: &PeerId, visible: bool) {
        if let Some(elements) = self.elements(id) {
            set_style(&elements.canvas, &[("display", if visible { "block" } else { "none" })]);
        }
    }

    fn set_z_index(&mut self, id: &PeerId, z_index: i32) {
        if let Some(elements) = self.elements(id) {
            let z = z_index.to_string();
            set_style(&elements.canvas, &[("z-index", z.as_str())]);
            set_style(&elements.text_input, &[("z-index", z.as_str())]);
        }
    }

    fn show_text_input(&mut self, id: &PeerId, position: Point) {
        if let Some(elements) = self.elements(id) {
            set_style(&elements.text_input, &[("left", px(position.x).as_str()), ("top", px(position.y).as_str())]);
            if let Err(e) = elements.text_input.focus() {
                log::debug!("Focusing text input failed: {:?}", e);
            }
        }
    }

    fn dismiss_text_input(&mut self, id: &PeerId) {
        if let Some(elements) = self.elements(id) {
            elements.text_input.set_value("");
            if let Err(e) = elements.text_input.blur() {
                log::debug!("Blurring text input failed: {:?}", e);
            }
        }
    }

    fn viewport_size(&self) -> (i32, i32) {
        let dimension = |value: Result<JsValue, JsValue>| value.ok().and_then(|v| v.as_f64()).unwrap_or(0.0) as i32;
        (dimension(self.window.inner_width()), dimension(self.window.inner_height()))
    }

    fn set_cursor(&mut self, cursor: StandardCursor) {
        match self.body() {
            Ok(body) => set_style(&body, &[("cursor", cursor.css_name())]),
            Err(e) => log::debug!("Cannot set cursor: {}", e),
        }
    }

    fn blit(&mut self, id: &PeerId, area: Rect, image: &RgbaImage) {
        let Some(elements) = self.elements(id) else {
            return;
        };
        let context = match elements.canvas.get_context("2d") {
            Ok(Some(context)) => context,
            Ok(None) => return,
            Err(e) => {
                log::warn!("No 2d context for peer {}: {:?}", id, e);
                return;
            }
        };
        let Ok(context) = context.dyn_into::<CanvasRenderingContext2d>() else {
            return;
        };

        let data = match ImageData::new_with_u8_clamped_array_and_sh(Clamped(image.pixels.as_slice()), image.width, image.height) {
            Ok(data) => data,
            Err(e) => {
                log::warn!("Invalid image for peer {}: {:?}", id, e);
                return;
            }
        };
        if let Err(e) = context.put_image_data(&data, area.x as f64, area.y as f64) {
            log::warn!("Blitting to peer {} failed: {:?}", id, e);
        }
    }
}

impl Drop for DomSurface {
    fn drop(&mut self) {
        for (_, elements) in self.peers.drain() {
            elements.remove();
        }
    }
}

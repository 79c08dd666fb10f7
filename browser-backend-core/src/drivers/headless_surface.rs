use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::error::BackendError;
use crate::models::geometry::{Point, Rect};
use crate::models::input_models::{PeerId, StandardCursor};
use crate::traits::peer::{PeerSurface, RgbaImage};

/// What a headless surface knows about one peer's canvas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceRecord {
    pub bounds: Rect,
    pub visible: bool,
    pub z_index: i32,
    /// Page position of the text input proxy while IME input is active.
    pub text_input: Option<Point>,
    pub blits: Vec<Rect>,
}

#[derive(Default)]
struct HeadlessState {
    canvases: HashMap<PeerId, SurfaceRecord>,
    cursor: StandardCursor,
}

/// A `PeerSurface` with no DOM behind it.
///
/// Keeps the last state pushed for every canvas so native hosts and tests can
/// inspect it through a cloned handle.
#[derive(Clone)]
pub struct HeadlessSurface {
    state: Arc<Mutex<HeadlessState>>,
    viewport: (i32, i32),
}

impl HeadlessSurface {
    pub fn new(viewport_width: i32, viewport_height: i32) -> Self {
        Self {
            state: Arc::new(Mutex::new(HeadlessState::default())),
            viewport: (viewport_width, viewport_height),
        }
    }

    pub fn record(&self, id: &PeerId) -> Option<SurfaceRecord> {
        self.state.lock().canvases.get(id).cloned()
    }

    pub fn canvas_count(&self) -> usize {
        self.state.lock().canvases.len()
    }

    pub fn cursor(&self) -> StandardCursor {
        self.state.lock().cursor
    }

    fn update(&self, id: &PeerId, f: impl FnOnce(&mut SurfaceRecord)) {
        match self.state.lock().canvases.get_mut(id) {
            Some(record) => f(record),
            None => log::warn!("No canvas for peer {}", id),
        }
    }
}

impl PeerSurface for HeadlessSurface {
    fn create(&mut self, id: &PeerId, bounds: Rect, z_index: i32) -> Result<(), BackendError> {
        let mut s = self.state.lock();
        if s.canvases.contains_key(id) {
            return Err(BackendError::Resource(format!("canvas {} already exists", id)));
        }
        s.canvases.insert(
            id.clone(),
            SurfaceRecord {
                bounds,
                visible: true,
                z_index,
                text_input: None,
                blits: Vec::new(),
            },
        );
        Ok(())
    }

    fn destroy(&mut self, id: &PeerId) {
        self.state.lock().canvases.remove(id);
    }

    fn set_bounds(&mut self, id: &PeerId, bounds: Rect) {
        self.update(id, |r| r.bounds = bounds);
    }

    fn set_visible(&mut self, id: &PeerId, visible: bool) {
        self.update(id, |r| r.visible = visible);
    }

    fn set_z_index(&mut self, id: &PeerId, z_index: i32) {
        self.update(id, |r| r.z_index = z_index);
    }

    fn show_text_input(&mut self, id: &PeerId, position: Point) {
        self.update(id, |r| r.text_input = Some(position));
    }

    fn dismiss_text_input(&mut self, id: &PeerId) {
        self.update(id, |r| r.text_input = None);
    }

    fn viewport_size(&self) -> (i32, i32) {
        self.viewport
    }

    fn set_cursor(&mut self, cursor: StandardCursor) {
        self.state.lock().cursor = cursor;
    }

    fn blit(&mut self, id: &PeerId, area: Rect, _image: &RgbaImage) {
        self.update(id, |r| r.blits.push(area));
    }
}

use crate::models::error::BackendError;
use crate::models::geometry::{Point, PointF, Rect};
use crate::models::input_models::{KeyPress, ModifierKeys, PeerId, StandardCursor, WheelDetails};

/// RGBA pixels for one repainted region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// The DOM side of every window peer: one canvas per peer plus an invisible
/// text input element used to anchor the platform IME.
///
/// Implemented by:
/// - `DomSurface` (browser, in `browser-backend-web`)
/// - `HeadlessSurface` (records calls; native hosts and tests)
pub trait PeerSurface {
    fn create(&mut self, id: &PeerId, bounds: Rect, z_index: i32) -> Result<(), BackendError>;

    fn destroy(&mut self, id: &PeerId);

    fn set_bounds(&mut self, id: &PeerId, bounds: Rect);

    fn set_visible(&mut self, id: &PeerId, visible: bool);

    fn set_z_index(&mut self, id: &PeerId, z_index: i32);

    /// Move the text input proxy to `position` (page coordinates) and focus it.
    fn show_text_input(&mut self, id: &PeerId, position: Point);

    fn dismiss_text_input(&mut self, id: &PeerId);

    /// Inner size of the browser viewport, used for full-screen peers.
    fn viewport_size(&self) -> (i32, i32);

    fn set_cursor(&mut self, cursor: StandardCursor);

    /// Copy freshly painted pixels into the peer's canvas at `area`.
    fn blit(&mut self, id: &PeerId, area: Rect, image: &RgbaImage);
}

/// Component that receives committed IME text.
pub trait TextInputTarget {
    /// Bounds of the component in page coordinates.
    fn screen_bounds(&self) -> Rect;

    /// Caret rectangle relative to the component.
    fn caret_rectangle(&self) -> Rect;

    fn insert_text_at_caret(&mut self, text: &str);
}

/// The framework side of a window peer.
///
/// All methods run on the message thread. Every method has an empty default
/// so hosts only implement what they care about.
#[allow(unused_variables)]
pub trait PeerHandler {
    fn mouse(&mut self, position: PointF, modifiers: ModifierKeys, time: i64) {}

    fn wheel(&mut self, position: PointF, wheel: &WheelDetails, time: i64) {}

    /// Returns whether the key state change was consumed.
    fn key_up_or_down(&mut self, is_down: bool) -> bool {
        false
    }

    fn key_press(&mut self, key: &KeyPress) -> bool {
        false
    }

    fn modifier_keys_changed(&mut self, modifiers: ModifierKeys) {}

    fn focus_gained(&mut self) {}

    fn focus_lost(&mut self) {}

    fn brought_to_front(&mut self) {}

    fn moved_or_resized(&mut self, bounds: Rect) {}

    /// Render `area` (peer-local). `None` leaves the canvas untouched.
    fn paint(&mut self, area: Rect) -> Option<RgbaImage> {
        None
    }

    fn text_input_target(&mut self) -> Option<&mut dyn TextInputTarget> {
        None
    }
}

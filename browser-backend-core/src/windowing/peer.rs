use crate::models::geometry::{PointF, Rect};
use crate::models::input_models::PeerId;
use crate::traits::peer::PeerHandler;

/// Backend state of one top-level window.
pub struct WindowPeer {
    pub(crate) id: PeerId,
    pub(crate) bounds: Rect,
    pub(crate) z_index: i32,
    pub(crate) focused: bool,
    pub(crate) visible: bool,
    pub(crate) full_screen: bool,
    pub(crate) repaint_posted: bool,
    pub(crate) pending: Vec<Rect>,
    /// Regions left over from an interrupted repaint cycle; painted first.
    pub(crate) unfinished: Vec<Rect>,
    pub(crate) handler: Box<dyn PeerHandler>,
}

impl WindowPeer {
    pub(crate) fn new(id: PeerId, bounds: Rect, z_index: i32, handler: Box<dyn PeerHandler>) -> Self {
        Self {
            id,
            bounds,
            z_index,
            focused: false,
            visible: true,
            full_screen: false,
            repaint_posted: false,
            pending: Vec::new(),
            unfinished: Vec::new(),
            handler,
        }
    }

    pub fn id(&self) -> &PeerId {
        &self.id
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn z_index(&self) -> i32 {
        self.z_index
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_full_screen(&self) -> bool {
        self.full_screen
    }

    pub fn has_pending_repaints(&self) -> bool {
        !self.pending.is_empty() || !self.unfinished.is_empty()
    }

    pub fn local_to_global(&self, local: PointF) -> PointF {
        let origin = self.bounds.position().to_float();
        PointF::new(local.x + origin.x, local.y + origin.y)
    }

    pub fn global_to_local(&self, global: PointF) -> PointF {
        let origin = self.bounds.position().to_float();
        PointF::new(global.x - origin.x, global.y - origin.y)
    }

    pub fn handler_mut(&mut self) -> &mut dyn PeerHandler {
        self.handler.as_mut()
    }

    pub(crate) fn set_focus(&mut self, focused: bool) {
        if self.focused == focused {
            return;
        }
        self.focused = focused;
        if focused {
            self.handler.focus_gained();
        } else {
            self.handler.focus_lost();
        }
    }
}

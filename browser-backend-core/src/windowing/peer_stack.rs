use std::sync::Arc;
use std::time::Duration;

use crate::messaging::clock::Clock;
use crate::messaging::message_queue::MessageQueue;
use crate::messaging::window_message::WindowMessage;
use crate::models::error::BackendError;
use crate::models::geometry::{Point, PointF, Rect};
use crate::models::input_models::{PeerId, StandardCursor};
use crate::traits::peer::{PeerHandler, PeerSurface};
use crate::windowing::peer::WindowPeer;

/// Stacking index below every peer. The first peer gets `BASE_Z_INDEX + 1`.
pub const BASE_Z_INDEX: i32 = 10;

/// All window peers, their stacking order and focus.
///
/// Z-indices are unique; the highest visible peer wins hit tests. Exactly one
/// visible peer holds focus once any peer exists.
pub struct PeerStack {
    surface: Box<dyn PeerSurface>,
    peers: Vec<WindowPeer>,
    highest_z: i32,
    queue: Arc<MessageQueue<WindowMessage>>,
    clock: Clock,
    frame_budget: Duration,
    message_thread_proxied: bool,
}

impl PeerStack {
    pub fn new(
        surface: Box<dyn PeerSurface>,
        queue: Arc<MessageQueue<WindowMessage>>,
        clock: Clock,
        frame_budget: Duration,
    ) -> Self {
        Self {
            surface,
            peers: Vec::new(),
            highest_z: BASE_Z_INDEX,
            queue,
            clock,
            frame_budget,
            message_thread_proxied: false,
        }
    }

    /// When proxied, pending repaints are never cut short by the frame budget.
    pub fn set_message_thread_proxied(&mut self, proxied: bool) {
        self.message_thread_proxied = proxied;
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn peer(&self, id: &PeerId) -> Option<&WindowPeer> {
        self.peers.iter().find(|p| &p.id == id)
    }

    pub fn peer_mut(&mut self, id: &PeerId) -> Option<&mut WindowPeer> {
        self.peers.iter_mut().find(|p| &p.id == id)
    }

    fn index_of(&self, id: &PeerId) -> Result<usize, BackendError> {
        self.peers
            .iter()
            .position(|p| &p.id == id)
            .ok_or_else(|| BackendError::PeerNotFound(id.to_string()))
    }

    pub fn focused_peer(&self) -> Option<&PeerId> {
        self.peers.iter().find(|p| p.focused).map(|p| &p.id)
    }

    /// Create a canvas-backed peer on top of the stack and give it focus.
    pub fn create_peer(&mut self, bounds: Rect, handler: Box<dyn PeerHandler>) -> Result<PeerId, BackendError> {
        let id = PeerId::generate();
        let z_index = self.highest_z + 1;
        self.surface.create(&id, bounds, z_index)?;
        self.highest_z = z_index;

        self.peers.push(WindowPeer::new(id.clone(), bounds, z_index, handler));
        log::info!("Created window peer {} (z-index {})", id, z_index);

        self.grab_focus(&id)?;
        Ok(id)
    }

    pub fn remove_peer(&mut self, id: &PeerId) -> Result<(), BackendError> {
        let index = self.index_of(id)?;
        let peer = self.peers.remove(index);
        self.surface.destroy(id);
        log::info!("Removed window peer {}", id);

        if peer.focused {
            self.focus_topmost_visible();
        }
        Ok(())
    }

    pub fn set_visible(&mut self, id: &PeerId, visible: bool) -> Result<(), BackendError> {
        let index = self.index_of(id)?;
        if self.peers[index].visible == visible {
            return Ok(());
        }
        self.surface.set_visible(id, visible);
        self.peers[index].visible = visible;

        if !visible && self.peers[index].focused {
            self.peers[index].set_focus(false);
            self.focus_topmost_visible();
        } else if visible && !self.peers.iter().any(|p| p.visible && p.focused) {
            self.focus_topmost_visible();
        }
        Ok(())
    }

    /// Move/resize the peer. A change of size repaints the whole surface.
    pub fn set_bounds(&mut self, id: &PeerId, bounds: Rect, full_screen: bool) -> Result<(), BackendError> {
        let index = self.index_of(id)?;
        let old = self.peers[index].bounds;
        {
            let peer = &mut self.peers[index];
            peer.bounds = bounds;
            peer.full_screen = full_screen;
        }
        self.surface.set_bounds(id, bounds);
        self.peers[index].handler.moved_or_resized(bounds);

        if !bounds.is_empty() && bounds.with_zero_origin() != old.with_zero_origin() {
            self.repaint(id, bounds.with_zero_origin())?;
        }
        Ok(())
    }

    /// Stretch the peer over the whole viewport.
    pub fn set_full_screen(&mut self, id: &PeerId, full_screen: bool) -> Result<(), BackendError> {
        if !full_screen {
            let index = self.index_of(id)?;
            self.peers[index].full_screen = false;
            return Ok(());
        }
        let (width, height) = self.surface.viewport_size();
        self.set_bounds(id, Rect::new(0, 0, width, height), true)
    }

    pub fn to_front(&mut self, id: &PeerId, make_active: bool) -> Result<(), BackendError> {
        let index = self.index_of(id)?;

        if self.peers[index].z_index != self.highest_z {
            self.highest_z += 1;
            self.peers[index].z_index = self.highest_z;
            self.surface.set_z_index(id, self.highest_z);
            self.peers[index].handler.brought_to_front();
        }

        if make_active {
            self.grab_focus(id)?;
        }
        Ok(())
    }

    /// Place `id` directly below `other` and hand focus to `other` if it is
    /// visible.
    pub fn to_behind(&mut self, id: &PeerId, other: &PeerId) -> Result<(), BackendError> {
        let index = self.index_of(id)?;
        let other_index = self.index_of(other)?;
        if index == other_index {
            return Ok(());
        }

        let mut order: Vec<usize> = (0..self.peers.len()).filter(|&i| i != index).collect();
        order.sort_by_key(|&i| self.peers[i].z_index);
        let slot = order.iter().position(|&i| i == other_index).unwrap_or(0);
        order.insert(slot, index);

        for (rank, &i) in order.iter().enumerate() {
            let z_index = BASE_Z_INDEX + 1 + rank as i32;
            if self.peers[i].z_index != z_index {
                self.peers[i].z_index = z_index;
                self.surface.set_z_index(&self.peers[i].id, z_index);
            }
        }
        self.highest_z = BASE_Z_INDEX + order.len() as i32;

        if self.peers[other_index].visible {
            self.grab_focus(other)?;
        }
        Ok(())
    }

    /// Focus `id`; whichever other peer had focus loses it.
    pub fn grab_focus(&mut self, id: &PeerId) -> Result<(), BackendError> {
        let index = self.index_of(id)?;
        if self.peers[index].focused {
            return Ok(());
        }
        for (i, peer) in self.peers.iter_mut().enumerate() {
            if i != index && peer.focused {
                peer.set_focus(false);
            }
        }
        self.peers[index].set_focus(true);
        Ok(())
    }

    fn focus_topmost_visible(&mut self) {
        let topmost = self
            .peers
            .iter()
            .enumerate()
            .filter(|(_, p)| p.visible)
            .max_by_key(|(_, p)| p.z_index)
            .map(|(i, _)| i);

        match topmost {
            Some(i) => {
                for (j, peer) in self.peers.iter_mut().enumerate() {
                    if j != i && peer.focused {
                        peer.set_focus(false);
                    }
                }
                self.peers[i].set_focus(true);
            }
            None => log::debug!("No visible peer left to take focus"),
        }
    }

    /// Indices of visible peers, topmost first.
    pub(crate) fn visible_by_descending_z(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.peers.len()).filter(|&i| self.peers[i].visible).collect();
        order.sort_by(|&a, &b| self.peers[b].z_index.cmp(&self.peers[a].z_index));
        order
    }

    pub(crate) fn peer_at_index_mut(&mut self, index: usize) -> &mut WindowPeer {
        &mut self.peers[index]
    }

    pub(crate) fn peers_mut(&mut self) -> impl Iterator<Item = &mut WindowPeer> {
        self.peers.iter_mut()
    }

    /// Topmost visible peer containing `point` (page coordinates).
    pub fn peer_at(&self, point: Point) -> Option<&PeerId> {
        self.visible_by_descending_z()
            .into_iter()
            .map(|i| &self.peers[i])
            .find(|p| p.bounds.contains(point))
            .map(|p| &p.id)
    }

    pub fn local_to_global(&self, id: &PeerId, local: PointF) -> Result<PointF, BackendError> {
        Ok(self.peers[self.index_of(id)?].local_to_global(local))
    }

    pub fn global_to_local(&self, id: &PeerId, global: PointF) -> Result<PointF, BackendError> {
        Ok(self.peers[self.index_of(id)?].global_to_local(global))
    }

    /// Anchor the IME proxy at `position`, relative to the peer.
    pub fn text_input_required(&mut self, id: &PeerId, position: Point) -> Result<(), BackendError> {
        let origin = self.peers[self.index_of(id)?].bounds.position();
        self.surface.show_text_input(id, origin + position);
        Ok(())
    }

    /// Anchor the IME proxy at `position`, in page coordinates.
    pub(crate) fn place_text_input(&mut self, id: &PeerId, position: Point) {
        self.surface.show_text_input(id, position);
    }

    pub fn dismiss_pending_text_input(&mut self, id: &PeerId) -> Result<(), BackendError> {
        self.index_of(id)?;
        self.surface.dismiss_text_input(id);
        Ok(())
    }

    pub fn set_cursor(&mut self, cursor: StandardCursor) {
        self.surface.set_cursor(cursor);
    }

    /// Queue `area` (peer-local) for painting; posts at most one repaint
    /// message per peer until it is handled.
    pub fn repaint(&mut self, id: &PeerId, area: Rect) -> Result<(), BackendError> {
        let index = self.index_of(id)?;
        let peer = &mut self.peers[index];
        peer.pending.push(area);
        if !peer.repaint_posted {
            peer.repaint_posted = true;
            self.queue.post(WindowMessage::Repaint(id.clone()));
        }
        Ok(())
    }

    fn over_budget(&self, cycle_start: Duration) -> bool {
        (self.clock)().saturating_sub(cycle_start) > self.frame_budget
    }

    /// Paint leftover regions first, then pending ones, until the frame
    /// budget for the current dispatch cycle runs out. What remains is
    /// deferred to a fresh repaint message.
    pub fn handle_repaint(&mut self, id: &PeerId, cycle_start: Duration) -> Result<(), BackendError> {
        let index = self.index_of(id)?;

        let unfinished = std::mem::take(&mut self.peers[index].unfinished);
        for (i, area) in unfinished.iter().enumerate() {
            self.paint_area(index, *area);
            self.peers[index].pending.retain(|r| !area.contains_rect(r));

            if self.over_budget(cycle_start) {
                self.peers[index].unfinished = unfinished[i + 1..].to_vec();
                self.queue.post(WindowMessage::Repaint(id.clone()));
                return Ok(());
            }
        }

        let pending = std::mem::take(&mut self.peers[index].pending);
        for (i, area) in pending.iter().enumerate() {
            self.paint_area(index, *area);

            if self.message_thread_proxied {
                continue;
            }

            if self.over_budget(cycle_start) {
                let peer = &mut self.peers[index];
                peer.unfinished.extend_from_slice(&pending[i + 1..]);
                peer.repaint_posted = true;
                self.queue.post(WindowMessage::Repaint(id.clone()));
                return Ok(());
            }
        }

        self.peers[index].repaint_posted = false;
        Ok(())
    }

    fn paint_area(&mut self, index: usize, area: Rect) {
        let peer = &mut self.peers[index];
        if let Some(image) = peer.handler.paint(area) {
            self.surface.blit(&peer.id, area, &image);
        }
    }
}

use crate::models::input_models::{InputEvent, PeerId};

/// Messages drained on the application's message thread.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowMessage {
    Input(InputEvent),
    /// Paint the pending regions of a peer.
    Repaint(PeerId),
}

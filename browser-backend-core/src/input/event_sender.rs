use std::sync::Arc;

use crate::messaging::message_queue::MessageQueue;
use crate::messaging::window_message::WindowMessage;
use crate::models::geometry::Point;
use crate::models::input_models::{
    CompositionEvent, CompositionKind, InputEvent, KeyEventKind, KeyboardEvent, MouseEvent, MouseEventKind, PeerId,
};

/// Producer side of the input event hop.
///
/// Lives wherever browser events arrive. It only parses and posts immutable
/// records; all state changes happen on the message thread.
#[derive(Clone)]
pub struct EventSender {
    queue: Arc<MessageQueue<WindowMessage>>,
}

impl EventSender {
    pub fn new(queue: Arc<MessageQueue<WindowMessage>>) -> Self {
        Self { queue }
    }

    pub fn post(&self, event: InputEvent) {
        self.queue.post(WindowMessage::Input(event));
    }

    /// Returns false if `kind` is not a known mouse event tag.
    #[allow(clippy::too_many_arguments)]
    pub fn mouse(
        &self,
        kind: &str,
        x: i32,
        y: i32,
        which: i32,
        shift: bool,
        ctrl: bool,
        alt: bool,
        wheel_delta: i32,
    ) -> bool {
        let kind: MouseEventKind = match kind.parse() {
            Ok(kind) => kind,
            Err(e) => {
                log::debug!("Ignoring mouse event: {}", e);
                return false;
            }
        };
        self.post(InputEvent::Mouse(MouseEvent {
            kind,
            position: Point::new(x, y),
            which,
            shift,
            ctrl,
            alt,
            wheel_delta,
        }));
        true
    }

    pub fn keyboard(&self, kind: &str, key_code: i32, key: &str) -> bool {
        let kind: KeyEventKind = match kind.parse() {
            Ok(kind) => kind,
            Err(e) => {
                log::debug!("Ignoring keyboard event: {}", e);
                return false;
            }
        };
        self.post(InputEvent::Keyboard(KeyboardEvent {
            kind,
            key_code,
            key: key.to_string(),
        }));
        true
    }

    pub fn composition(&self, target: &str, kind: &str, data: &str) -> bool {
        let kind: CompositionKind = match kind.parse() {
            Ok(kind) => kind,
            Err(e) => {
                log::debug!("Ignoring composition event: {}", e);
                return false;
            }
        };
        self.post(InputEvent::Composition(CompositionEvent {
            target: PeerId::from(target),
            kind,
            data: data.to_string(),
        }));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posts_parsed_records_in_order() {
        let queue = Arc::new(MessageQueue::new());
        let sender = EventSender::new(Arc::clone(&queue));

        assert!(sender.mouse("down", 1, 2, 0, true, false, false, 0));
        assert!(sender.keyboard("up", 65, "a"));
        assert!(sender.composition("peer-1", "compositionend", "日本"));

        let mut seen = Vec::new();
        queue.dispatch_pending(|m| seen.push(m));
        assert_eq!(seen.len(), 3);
        assert!(matches!(
            &seen[0],
            WindowMessage::Input(InputEvent::Mouse(MouseEvent { kind: MouseEventKind::Down, shift: true, .. }))
        ));
        assert!(matches!(
            &seen[2],
            WindowMessage::Input(InputEvent::Composition(CompositionEvent { kind: CompositionKind::End, .. }))
        ));
    }

    #[test]
    fn unknown_tags_are_dropped() {
        let queue = Arc::new(MessageQueue::new());
        let sender = EventSender::new(Arc::clone(&queue));

        assert!(!sender.mouse("out", 0, 0, 0, false, false, false, 0));
        assert!(!sender.keyboard("press", 13, "Enter"));
        assert!(!sender.composition("p", "input", "x"));
        assert!(queue.is_empty());
    }
}

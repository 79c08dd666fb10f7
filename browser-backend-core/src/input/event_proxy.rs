use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::input::event_sender::EventSender;
use crate::messaging::clock::Clock;
use crate::messaging::message_queue::MessageQueue;
use crate::messaging::window_message::WindowMessage;
use crate::models::geometry::Point;
use crate::models::input_models::{
    key_codes, CompositionEvent, CompositionKind, InputEvent, KeyEventKind, KeyPress, KeyboardEvent, ModifierKeys,
    MouseEvent, MouseEventKind, WheelDetails,
};
use crate::windowing::peer_stack::PeerStack;

/// Browser wheel deltas come in multiples of 120 per notch; the framework
/// expects a quarter of a notch per unit.
const WHEEL_DELTA_DIVISOR: f32 = 480.0;

/// Consumer side of the input event hop.
///
/// Owns the peer stack and all input state (modifiers, key-down table, last
/// pointer position, event time). Only the message thread touches it.
pub struct EventProxy {
    queue: Arc<MessageQueue<WindowMessage>>,
    stack: PeerStack,
    clock: Clock,
    modifiers: ModifierKeys,
    keys_down: HashMap<i32, bool>,
    last_mouse: Point,
    event_time: i64,
}

impl EventProxy {
    pub fn new(queue: Arc<MessageQueue<WindowMessage>>, stack: PeerStack, clock: Clock) -> Self {
        Self {
            queue,
            stack,
            clock,
            modifiers: ModifierKeys::empty(),
            keys_down: HashMap::new(),
            last_mouse: Point::default(),
            event_time: 0,
        }
    }

    pub fn sender(&self) -> EventSender {
        EventSender::new(Arc::clone(&self.queue))
    }

    pub fn stack(&self) -> &PeerStack {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut PeerStack {
        &mut self.stack
    }

    pub fn current_modifiers(&self) -> ModifierKeys {
        self.modifiers
    }

    pub fn last_mouse_position(&self) -> Point {
        self.last_mouse
    }

    pub fn is_key_currently_down(&self, key_code: i32) -> bool {
        self.keys_down.get(&key_code).copied().unwrap_or(false)
    }

    /// Handle the messages queued when the cycle starts, in arrival order.
    /// Messages posted while handling (deferred repaints) wait for the next
    /// cycle.
    pub fn dispatch_pending(&mut self) -> usize {
        let cycle_start = (self.clock)();
        let queue = Arc::clone(&self.queue);
        queue.dispatch_batch(|message| self.handle_message(message, cycle_start))
    }

    fn handle_message(&mut self, message: WindowMessage, cycle_start: Duration) {
        match message {
            WindowMessage::Input(InputEvent::Mouse(e)) => self.handle_mouse(&e),
            WindowMessage::Input(InputEvent::Keyboard(e)) => self.handle_keyboard(&e),
            WindowMessage::Input(InputEvent::Composition(e)) => self.handle_composition(&e),
            WindowMessage::Repaint(id) => {
                if let Err(e) = self.stack.handle_repaint(&id, cycle_start) {
                    log::debug!("Dropping repaint: {}", e);
                }
            }
        }
    }

    fn handle_mouse(&mut self, e: &MouseEvent) {
        self.last_mouse = e.position;
        let is_down = e.kind == MouseEventKind::Down;

        let mut mods = self.modifiers;
        match e.kind {
            MouseEventKind::Down => mods = mods.without_mouse_buttons() | ModifierKeys::button_for_which(e.which),
            MouseEventKind::Up => mods = mods.without_mouse_buttons(),
            _ => {}
        }
        mods.set(ModifierKeys::SHIFT, e.shift);
        mods.set(ModifierKeys::CTRL, e.ctrl);
        mods.set(ModifierKeys::ALT, e.alt);
        self.modifiers = mods;

        let global = e.position.to_float();
        let time = self.event_time;

        for index in self.stack.visible_by_descending_z() {
            let peer = self.stack.peer_at_index_mut(index);
            let inside = peer.bounds().contains(e.position);

            // Presses only go to peers under the pointer; moves and releases
            // reach peers below so drags can leave the window.
            if is_down && !inside {
                continue;
            }

            let local = peer.global_to_local(global);
            if e.wheel_delta == 0 {
                peer.handler_mut().mouse(local, mods, time);
            } else {
                let wheel = WheelDetails {
                    delta_x: 0.0,
                    delta_y: e.wheel_delta as f32 / WHEEL_DELTA_DIVISOR,
                    ..WheelDetails::default()
                };
                peer.handler_mut().wheel(local, &wheel, time);
            }

            if inside {
                break;
            }
        }

        self.event_time += 1;
    }

    fn handle_keyboard(&mut self, e: &KeyboardEvent) {
        let is_down = e.kind == KeyEventKind::Down;

        let mut chars = e.key.chars();
        let key_char = match (chars.next(), chars.next()) {
            (Some(c), None) => Some(c),
            _ => None,
        };

        let changed = match e.key_code {
            key_codes::SHIFT => ModifierKeys::SHIFT,
            key_codes::CTRL => ModifierKeys::CTRL,
            key_codes::ALT => ModifierKeys::ALT,
            key_codes::COMMAND => ModifierKeys::COMMAND,
            _ => ModifierKeys::empty(),
        };
        if !changed.is_empty() {
            self.modifiers.set(changed, is_down);
        }

        let key_code = match key_char {
            Some(c) if c.is_ascii_alphabetic() => c as i32,
            _ => e.key_code,
        };
        self.keys_down.insert(key_code, is_down);

        let mods = self.modifiers;
        for index in self.stack.visible_by_descending_z() {
            let peer = self.stack.peer_at_index_mut(index);
            if !peer.is_focused() {
                continue;
            }

            let handler = peer.handler_mut();
            if !changed.is_empty() {
                handler.modifier_keys_changed(mods);
            }
            handler.key_up_or_down(is_down);
            if is_down {
                handler.key_press(&KeyPress::new(key_code, mods, key_char));
            }
        }
    }

    fn handle_composition(&mut self, e: &CompositionEvent) {
        let Some(peer) = self.stack.peer_mut(&e.target) else {
            log::debug!("Composition event for unknown peer {}", e.target);
            return;
        };
        let Some(target) = peer.handler_mut().text_input_target() else {
            return;
        };

        match e.kind {
            CompositionKind::Start | CompositionKind::Update => {
                let anchor = target.screen_bounds().position() + target.caret_rectangle().position();
                self.stack.place_text_input(&e.target, anchor);
            }
            CompositionKind::End => {
                if !e.data.is_empty() {
                    target.insert_text_at_caret(&e.data);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::headless_surface::HeadlessSurface;
    use crate::messaging::clock::ManualClock;
    use crate::models::geometry::{PointF, Rect};
    use crate::models::input_models::PeerId;
    use crate::test_support::{EventLog, HandlerEvent, RecordingHandler};

    struct Fixture {
        proxy: EventProxy,
        sender: EventSender,
        surface: HeadlessSurface,
    }

    fn fixture() -> Fixture {
        let surface = HeadlessSurface::new(800, 600);
        let queue = Arc::new(MessageQueue::new());
        let clock = ManualClock::new().as_clock();
        let stack = PeerStack::new(
            Box::new(surface.clone()),
            Arc::clone(&queue),
            Arc::clone(&clock),
            Duration::from_secs_f64(1.0 / 120.0),
        );
        let proxy = EventProxy::new(queue, stack, clock);
        let sender = proxy.sender();
        Fixture { proxy, sender, surface }
    }

    fn add_peer(f: &mut Fixture, bounds: Rect) -> (PeerId, EventLog) {
        let (handler, events) = RecordingHandler::new();
        let id = f.proxy.stack_mut().create_peer(bounds, Box::new(handler)).unwrap();
        events.lock().clear();
        (id, events)
    }

    fn mouse_events(log: &EventLog) -> Vec<HandlerEvent> {
        log.lock()
            .iter()
            .filter(|e| matches!(e, HandlerEvent::Mouse(..) | HandlerEvent::Wheel(..)))
            .cloned()
            .collect()
    }

    fn key_events(log: &EventLog) -> Vec<HandlerEvent> {
        log.lock()
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    HandlerEvent::KeyUpOrDown(_) | HandlerEvent::KeyPress(_) | HandlerEvent::ModifiersChanged(_)
                )
            })
            .cloned()
            .collect()
    }

    #[test]
    fn press_outside_every_peer_reaches_no_handler() {
        let mut f = fixture();
        let (_a, ea) = add_peer(&mut f, Rect::new(0, 0, 100, 100));
        let (b, eb) = add_peer(&mut f, Rect::new(200, 200, 50, 50));

        f.sender.mouse("down", 500, 500, 0, false, false, false, 0);
        f.proxy.dispatch_pending();

        assert!(mouse_events(&ea).is_empty());
        assert!(mouse_events(&eb).is_empty());
        assert_eq!(f.proxy.stack().focused_peer(), Some(&b));
        assert_eq!(f.proxy.last_mouse_position(), Point::new(500, 500));
    }

    #[test]
    fn topmost_peer_consumes_press() {
        let mut f = fixture();
        let (low, el) = add_peer(&mut f, Rect::new(0, 0, 100, 100));
        let (high, eh) = add_peer(&mut f, Rect::new(0, 0, 50, 50));
        assert!(f.proxy.stack().peer(&high).unwrap().z_index() > f.proxy.stack().peer(&low).unwrap().z_index());

        f.sender.mouse("down", 10, 10, 0, false, false, false, 0);
        f.proxy.dispatch_pending();

        assert!(mouse_events(&el).is_empty());
        assert_eq!(
            mouse_events(&eh),
            vec![HandlerEvent::Mouse(PointF::new(10.0, 10.0), ModifierKeys::LEFT_BUTTON)]
        );
    }

    #[test]
    fn moves_reach_peers_above_until_one_contains_pointer() {
        let mut f = fixture();
        let (_low, el) = add_peer(&mut f, Rect::new(0, 0, 100, 100));
        let (_high, eh) = add_peer(&mut f, Rect::new(200, 200, 50, 50));

        f.sender.mouse("move", 10, 20, 0, false, false, false, 0);
        f.proxy.dispatch_pending();

        // The upper peer sees the move in its own coordinates, then the lower
        // one consumes it.
        assert_eq!(
            mouse_events(&eh),
            vec![HandlerEvent::Mouse(PointF::new(-190.0, -180.0), ModifierKeys::empty())]
        );
        assert_eq!(
            mouse_events(&el),
            vec![HandlerEvent::Mouse(PointF::new(10.0, 20.0), ModifierKeys::empty())]
        );
    }

    #[test]
    fn buttons_and_modifiers_follow_mouse_events() {
        let mut f = fixture();
        add_peer(&mut f, Rect::new(0, 0, 100, 100));

        f.sender.mouse("down", 5, 5, 2, true, false, true, 0);
        f.proxy.dispatch_pending();
        assert_eq!(
            f.proxy.current_modifiers(),
            ModifierKeys::RIGHT_BUTTON | ModifierKeys::SHIFT | ModifierKeys::ALT
        );

        f.sender.mouse("up", 5, 5, 2, false, false, false, 0);
        f.proxy.dispatch_pending();
        assert_eq!(f.proxy.current_modifiers(), ModifierKeys::empty());
    }

    #[test]
    fn wheel_delta_is_scaled() {
        let mut f = fixture();
        let (_id, events) = add_peer(&mut f, Rect::new(0, 0, 100, 100));

        f.sender.mouse("wheel", 10, 10, 0, false, false, false, 120);
        f.proxy.dispatch_pending();

        match mouse_events(&events).as_slice() {
            [HandlerEvent::Wheel(pos, wheel)] => {
                assert_eq!(*pos, PointF::new(10.0, 10.0));
                assert_eq!(wheel.delta_y, 0.25);
                assert_eq!(wheel.delta_x, 0.0);
            }
            other => panic!("unexpected events {:?}", other),
        }
    }

    #[test]
    fn keys_go_to_focused_visible_peer_only() {
        let mut f = fixture();
        let (_a, ea) = add_peer(&mut f, Rect::new(0, 0, 100, 100));
        let (_b, eb) = add_peer(&mut f, Rect::new(0, 0, 100, 100));

        f.sender.keyboard("down", 65, "a");
        f.sender.keyboard("up", 65, "a");
        f.proxy.dispatch_pending();

        assert!(key_events(&ea).is_empty());
        assert_eq!(
            key_events(&eb),
            vec![
                HandlerEvent::KeyUpOrDown(true),
                HandlerEvent::KeyPress(KeyPress::new('a' as i32, ModifierKeys::empty(), Some('a'))),
                HandlerEvent::KeyUpOrDown(false),
            ]
        );
    }

    #[test]
    fn modifier_keys_toggle_state_and_notify() {
        let mut f = fixture();
        let (_id, events) = add_peer(&mut f, Rect::new(0, 0, 100, 100));

        f.sender.keyboard("down", key_codes::SHIFT, "Shift");
        f.proxy.dispatch_pending();

        assert_eq!(f.proxy.current_modifiers(), ModifierKeys::SHIFT);
        assert!(f.proxy.is_key_currently_down(key_codes::SHIFT));
        assert_eq!(key_events(&events)[0], HandlerEvent::ModifiersChanged(ModifierKeys::SHIFT));

        f.sender.keyboard("down", 88, "X");
        f.proxy.dispatch_pending();
        assert!(f.proxy.is_key_currently_down('X' as i32));
        assert!(events.lock().contains(&HandlerEvent::KeyPress(KeyPress::new(
            'X' as i32,
            ModifierKeys::SHIFT,
            Some('X')
        ))));

        f.sender.keyboard("up", key_codes::SHIFT, "Shift");
        f.proxy.dispatch_pending();
        assert_eq!(f.proxy.current_modifiers(), ModifierKeys::empty());
        assert!(!f.proxy.is_key_currently_down(key_codes::SHIFT));
    }

    #[test]
    fn composition_positions_proxy_and_commits_text() {
        let mut f = fixture();
        let (handler, events) = RecordingHandler::with_text_target(Rect::new(40, 30, 200, 20), Rect::new(12, 2, 1, 16));
        let id = f.proxy.stack_mut().create_peer(Rect::new(0, 0, 300, 300), Box::new(handler)).unwrap();

        f.sender.composition(id.as_str(), "compositionstart", "");
        f.proxy.dispatch_pending();
        assert_eq!(f.surface.record(&id).unwrap().text_input, Some(Point::new(52, 32)));

        f.sender.composition(id.as_str(), "compositionend", "");
        f.sender.composition(id.as_str(), "compositionend", "かな");
        f.sender.composition("missing-peer", "compositionend", "x");
        f.proxy.dispatch_pending();

        let inserted: Vec<HandlerEvent> = events
            .lock()
            .iter()
            .filter(|e| matches!(e, HandlerEvent::TextInserted(_)))
            .cloned()
            .collect();
        assert_eq!(inserted, vec![HandlerEvent::TextInserted("かな".into())]);
    }

    #[test]
    fn event_time_advances_per_mouse_event() {
        let mut f = fixture();
        let (_id, events) = add_peer(&mut f, Rect::new(0, 0, 100, 100));

        for _ in 0..3 {
            f.sender.mouse("move", 1, 1, 0, false, false, false, 0);
        }
        assert_eq!(f.proxy.dispatch_pending(), 3);

        assert_eq!(mouse_events(&events).len(), 3);
        assert_eq!(f.proxy.event_time, 3);
    }
}

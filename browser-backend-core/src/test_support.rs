//! Shared test doubles.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::messaging::clock::ManualClock;
use crate::models::geometry::{PointF, Rect};
use crate::models::input_models::{KeyPress, ModifierKeys, WheelDetails};
use crate::traits::peer::{PeerHandler, RgbaImage, TextInputTarget};

#[derive(Debug, Clone, PartialEq)]
pub enum HandlerEvent {
    Mouse(PointF, ModifierKeys),
    Wheel(PointF, WheelDetails),
    KeyUpOrDown(bool),
    KeyPress(KeyPress),
    ModifiersChanged(ModifierKeys),
    FocusGained,
    FocusLost,
    BroughtToFront,
    MovedOrResized(Rect),
    Paint(Rect),
    TextInserted(String),
}

pub type EventLog = Arc<Mutex<Vec<HandlerEvent>>>;

struct RecordingTextTarget {
    screen_bounds: Rect,
    caret: Rect,
    events: EventLog,
}

impl TextInputTarget for RecordingTextTarget {
    fn screen_bounds(&self) -> Rect {
        self.screen_bounds
    }

    fn caret_rectangle(&self) -> Rect {
        self.caret
    }

    fn insert_text_at_caret(&mut self, text: &str) {
        self.events.lock().push(HandlerEvent::TextInserted(text.to_string()));
    }
}

/// Peer handler that logs every call and paints a blank image.
pub struct RecordingHandler {
    events: EventLog,
    paint_cost: Option<(ManualClock, Duration)>,
    text_target: Option<RecordingTextTarget>,
}

impl RecordingHandler {
    pub fn new() -> (Self, EventLog) {
        let events: EventLog = Arc::new(Mutex::new(Vec::new()));
        let handler = Self {
            events: Arc::clone(&events),
            paint_cost: None,
            text_target: None,
        };
        (handler, events)
    }

    /// Every paint advances `clock` by `cost`.
    pub fn with_paint_cost(clock: ManualClock, cost: Duration) -> (Self, EventLog) {
        let (mut handler, events) = Self::new();
        handler.paint_cost = Some((clock, cost));
        (handler, events)
    }

    pub fn with_text_target(screen_bounds: Rect, caret: Rect) -> (Self, EventLog) {
        let (mut handler, events) = Self::new();
        handler.text_target = Some(RecordingTextTarget {
            screen_bounds,
            caret,
            events: Arc::clone(&events),
        });
        (handler, events)
    }

    fn push(&self, event: HandlerEvent) {
        self.events.lock().push(event);
    }
}

impl PeerHandler for RecordingHandler {
    fn mouse(&mut self, position: PointF, modifiers: ModifierKeys, _time: i64) {
        self.push(HandlerEvent::Mouse(position, modifiers));
    }

    fn wheel(&mut self, position: PointF, wheel: &WheelDetails, _time: i64) {
        self.push(HandlerEvent::Wheel(position, *wheel));
    }

    fn key_up_or_down(&mut self, is_down: bool) -> bool {
        self.push(HandlerEvent::KeyUpOrDown(is_down));
        true
    }

    fn key_press(&mut self, key: &KeyPress) -> bool {
        self.push(HandlerEvent::KeyPress(*key));
        true
    }

    fn modifier_keys_changed(&mut self, modifiers: ModifierKeys) {
        self.push(HandlerEvent::ModifiersChanged(modifiers));
    }

    fn focus_gained(&mut self) {
        self.push(HandlerEvent::FocusGained);
    }

    fn focus_lost(&mut self) {
        self.push(HandlerEvent::FocusLost);
    }

    fn brought_to_front(&mut self) {
        self.push(HandlerEvent::BroughtToFront);
    }

    fn moved_or_resized(&mut self, bounds: Rect) {
        self.push(HandlerEvent::MovedOrResized(bounds));
    }

    fn paint(&mut self, area: Rect) -> Option<RgbaImage> {
        self.push(HandlerEvent::Paint(area));
        if let Some((clock, cost)) = &self.paint_cost {
            clock.advance(*cost);
        }
        let width = area.width.max(0) as u32;
        let height = area.height.max(0) as u32;
        Some(RgbaImage {
            width,
            height,
            pixels: vec![0; (width * height * 4) as usize],
        })
    }

    fn text_input_target(&mut self) -> Option<&mut dyn TextInputTarget> {
        self.text_target.as_mut().map(|t| t as &mut dyn TextInputTarget)
    }
}

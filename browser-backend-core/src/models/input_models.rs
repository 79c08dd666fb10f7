use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;

use super::geometry::Point;

bitflags! {
    /// Process-wide modifier-key and mouse-button state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ModifierKeys: u32 {
        const SHIFT = 1;
        const CTRL = 2;
        const ALT = 4;
        const COMMAND = 8;
        const LEFT_BUTTON = 16;
        const RIGHT_BUTTON = 32;
        const MIDDLE_BUTTON = 64;

        const MOUSE_BUTTONS = Self::LEFT_BUTTON.bits()
            | Self::RIGHT_BUTTON.bits()
            | Self::MIDDLE_BUTTON.bits();
    }
}

impl ModifierKeys {
    pub fn without_mouse_buttons(self) -> Self {
        self - Self::MOUSE_BUTTONS
    }

    pub fn is_any_mouse_button_down(self) -> bool {
        self.intersects(Self::MOUSE_BUTTONS)
    }

    /// Button flag for the DOM `which` value carried by a press.
    ///
    /// 1 is the middle button, 2 the right one; 0 and anything above 2 count
    /// as the left button.
    pub fn button_for_which(which: i32) -> Self {
        match which {
            1 => Self::MIDDLE_BUTTON,
            2 => Self::RIGHT_BUTTON,
            _ => Self::LEFT_BUTTON,
        }
    }
}

/// Error returned when an event type tag is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEventTag(pub String);

impl fmt::Display for UnknownEventTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown event tag: {}", self.0)
    }
}

impl std::error::Error for UnknownEventTag {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseEventKind {
    Down,
    Up,
    Move,
    Enter,
    Leave,
    Wheel,
}

impl FromStr for MouseEventKind {
    type Err = UnknownEventTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "down" => Ok(Self::Down),
            "up" => Ok(Self::Up),
            "move" => Ok(Self::Move),
            "enter" => Ok(Self::Enter),
            "leave" => Ok(Self::Leave),
            "wheel" => Ok(Self::Wheel),
            other => Err(UnknownEventTag(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyEventKind {
    Down,
    Up,
}

impl FromStr for KeyEventKind {
    type Err = UnknownEventTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "down" => Ok(Self::Down),
            "up" => Ok(Self::Up),
            other => Err(UnknownEventTag(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompositionKind {
    Start,
    Update,
    End,
}

impl FromStr for CompositionKind {
    type Err = UnknownEventTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "compositionstart" => Ok(Self::Start),
            "compositionupdate" => Ok(Self::Update),
            "compositionend" => Ok(Self::End),
            other => Err(UnknownEventTag(other.to_string())),
        }
    }
}

/// Opaque window peer identifier (a UUID string, also used as the DOM id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(String);

impl PeerId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PeerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PeerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw mouse record as posted from the browser main thread.
#[derive(Debug, Clone, PartialEq)]
pub struct MouseEvent {
    pub kind: MouseEventKind,
    pub position: Point,
    pub which: i32,
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub wheel_delta: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyboardEvent {
    pub kind: KeyEventKind,
    pub key_code: i32,
    /// DOM `key` value; a single character for printable keys.
    pub key: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositionEvent {
    pub target: PeerId,
    pub kind: CompositionKind,
    pub data: String,
}

/// Immutable event record carried across the thread hop.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Mouse(MouseEvent),
    Keyboard(KeyboardEvent),
    Composition(CompositionEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WheelDetails {
    pub delta_x: f32,
    pub delta_y: f32,
    pub is_reversed: bool,
    pub is_smooth: bool,
    pub is_inertial: bool,
}

/// Key press delivered to focused peers on key-down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyPress {
    pub key_code: i32,
    pub modifiers: ModifierKeys,
    pub text_character: Option<char>,
}

impl KeyPress {
    pub fn new(key_code: i32, modifiers: ModifierKeys, text_character: Option<char>) -> Self {
        Self {
            key_code,
            modifiers,
            text_character,
        }
    }
}

/// DOM key codes as understood by the framework.
pub mod key_codes {
    pub const EXTENDED_KEY_MODIFIER: i32 = 0x10000;

    pub const SHIFT: i32 = 16;
    pub const CTRL: i32 = 17;
    pub const ALT: i32 = 18;
    pub const COMMAND: i32 = 91;

    pub const SPACE: i32 = 32;
    pub const RETURN: i32 = 13;
    pub const ESCAPE: i32 = 27;
    pub const BACKSPACE: i32 = 8;
    pub const TAB: i32 = 9;
    pub const LEFT: i32 = 37;
    pub const UP: i32 = 38;
    pub const RIGHT: i32 = 39;
    pub const DOWN: i32 = 40;
    pub const PAGE_UP: i32 = 33;
    pub const PAGE_DOWN: i32 = 34;
    pub const END: i32 = 35;
    pub const HOME: i32 = 36;
    pub const INSERT: i32 = 45;
    pub const DELETE: i32 = 46;

    pub const F1: i32 = 112;
    pub const F12: i32 = 123;
    pub const F13: i32 = EXTENDED_KEY_MODIFIER | 24;

    pub const NUMBER_PAD_0: i32 = EXTENDED_KEY_MODIFIER | 27;

    pub const PLAY: i32 = EXTENDED_KEY_MODIFIER | 45;
    pub const STOP: i32 = EXTENDED_KEY_MODIFIER | 46;
    pub const FAST_FORWARD: i32 = EXTENDED_KEY_MODIFIER | 47;
    pub const REWIND: i32 = EXTENDED_KEY_MODIFIER | 48;

    /// Function keys F1..=F12 map to 112..=123; F13..=F35 live in the extended range.
    pub fn function_key(n: u8) -> Option<i32> {
        match n {
            1..=12 => Some(F1 + (n as i32 - 1)),
            13..=35 => Some(F13 + (n as i32 - 13)),
            _ => None,
        }
    }
}

/// Built-in mouse cursors and the CSS `cursor` values they map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StandardCursor {
    None,
    #[default]
    Normal,
    Wait,
    IBeam,
    Crosshair,
    Copy,
    PointingHand,
    DraggingHand,
    LeftRightResize,
    UpDownResize,
    UpDownLeftRightResize,
    TopEdgeResize,
    BottomEdgeResize,
    LeftEdgeResize,
    RightEdgeResize,
    TopLeftCornerResize,
    TopRightCornerResize,
    BottomLeftCornerResize,
    BottomRightCornerResize,
}

impl StandardCursor {
    pub fn css_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Normal => "default",
            Self::Wait => "wait",
            Self::IBeam => "text",
            Self::Crosshair => "crosshair",
            Self::Copy => "copy",
            Self::PointingHand => "pointer",
            Self::DraggingHand => "move",
            Self::LeftRightResize => "ew-resize",
            Self::UpDownResize => "ns-resize",
            Self::UpDownLeftRightResize => "all-scroll",
            Self::TopEdgeResize => "n-resize",
            Self::BottomEdgeResize => "s-resize",
            Self::LeftEdgeResize => "w-resize",
            Self::RightEdgeResize => "e-resize",
            Self::TopLeftCornerResize => "nw-resize",
            Self::TopRightCornerResize => "ne-resize",
            Self::BottomLeftCornerResize => "sw-resize",
            Self::BottomRightCornerResize => "se-resize",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn which_maps_to_buttons() {
        assert_eq!(ModifierKeys::button_for_which(0), ModifierKeys::LEFT_BUTTON);
        assert_eq!(ModifierKeys::button_for_which(1), ModifierKeys::MIDDLE_BUTTON);
        assert_eq!(ModifierKeys::button_for_which(2), ModifierKeys::RIGHT_BUTTON);
        assert_eq!(ModifierKeys::button_for_which(4), ModifierKeys::LEFT_BUTTON);
    }

    #[test]
    fn mouse_buttons_are_stripped() {
        let mods = ModifierKeys::SHIFT | ModifierKeys::LEFT_BUTTON;
        assert_eq!(mods.without_mouse_buttons(), ModifierKeys::SHIFT);
        assert!(mods.is_any_mouse_button_down());
    }

    #[test]
    fn event_tags_parse() {
        assert_eq!("wheel".parse::<MouseEventKind>(), Ok(MouseEventKind::Wheel));
        assert_eq!("up".parse::<KeyEventKind>(), Ok(KeyEventKind::Up));
        assert_eq!("compositionend".parse::<CompositionKind>(), Ok(CompositionKind::End));
        assert!("press".parse::<MouseEventKind>().is_err());
    }

    #[test]
    fn function_keys_cover_extended_range() {
        assert_eq!(key_codes::function_key(1), Some(112));
        assert_eq!(key_codes::function_key(13), Some(0x10000 | 24));
        assert_eq!(key_codes::function_key(35), Some(0x10000 | 46));
        assert_eq!(key_codes::function_key(36), None);
    }

    #[test]
    fn cursor_css_names() {
        assert_eq!(StandardCursor::default().css_name(), "default");
        assert_eq!(StandardCursor::IBeam.css_name(), "text");
        assert_eq!(StandardCursor::PointingHand.css_name(), "pointer");
    }
}

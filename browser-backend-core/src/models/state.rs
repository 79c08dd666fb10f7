/// Audio feed state machine.
///
/// State transitions:
/// ```text
/// waiting-for-interaction → playing → stopped
///            ↓                           ↑
///            └───────────────────────────┘  (stop before first playback)
/// ```
///
/// `Stopped` is terminal: a feed never re-enters `Playing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedState {
    WaitingForInteraction,
    Playing,
    Stopped,
}

impl FeedState {
    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped)
    }
}

/// Outcome of a single advance of the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedStatus {
    Good,
    Error,
    /// No queue slot has been consumed yet; the caller should idle until the
    /// next tick (or sleep briefly on a dedicated thread) instead of spinning.
    NeedToWait,
}

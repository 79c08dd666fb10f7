use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::messaging::frame_loop::FrameLoop;
use crate::models::state::{FeedState, FeedStatus};
use crate::session::feed::AudioFeedStateMachine;
use crate::traits::buffer_queue_driver::BufferQueueDriver;

/// A feed that can be advanced from the frame tick.
pub trait CooperativeSession: Send + Sync {
    fn state(&self) -> FeedState;

    /// Advance once without a stop request.
    fn advance(&self) -> FeedStatus;
}

/// A state machine behind its own lock, so the registry and the owning
/// device can both reach it.
pub struct CooperativeFeed<D: BufferQueueDriver> {
    machine: Mutex<AudioFeedStateMachine<D>>,
}

impl<D: BufferQueueDriver> CooperativeFeed<D> {
    pub fn new(machine: AudioFeedStateMachine<D>) -> Self {
        Self {
            machine: Mutex::new(machine),
        }
    }

    /// Advance once with a stop request.
    pub fn stop(&self) -> FeedStatus {
        self.machine.lock().advance(true)
    }
}

impl<D: BufferQueueDriver> CooperativeSession for CooperativeFeed<D> {
    fn state(&self) -> FeedState {
        self.machine.lock().state()
    }

    fn advance(&self) -> FeedStatus {
        self.machine.lock().advance(false)
    }
}

fn same_session(a: &Arc<dyn CooperativeSession>, b: &Arc<dyn CooperativeSession>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// Live cooperative sessions, advanced once per animation frame.
///
/// The lock is held for a whole traversal, so a session removed by another
/// thread is never advanced after `remove_all` returns.
pub struct SessionRegistry {
    sessions: Mutex<Vec<Arc<dyn CooperativeSession>>>,
    attached: AtomicBool,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(Vec::new()),
            attached: AtomicBool::new(false),
        }
    }

    /// Returns false if the session is already registered.
    pub fn add(&self, session: Arc<dyn CooperativeSession>) -> bool {
        let mut sessions = self.sessions.lock();
        if sessions.iter().any(|s| same_session(s, &session)) {
            log::warn!("Session already registered");
            return false;
        }
        sessions.push(session);
        true
    }

    /// Remove every entry for `session`; returns how many were removed.
    pub fn remove_all(&self, session: &Arc<dyn CooperativeSession>) -> usize {
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|s| !same_session(s, session));
        before - sessions.len()
    }

    pub fn for_each_active(&self, mut f: impl FnMut(&dyn CooperativeSession)) {
        let sessions = self.sessions.lock();
        for session in sessions.iter() {
            if session.state() != FeedState::Stopped {
                f(session.as_ref());
            }
        }
    }

    /// Advance every active session once.
    pub fn tick(&self) {
        self.for_each_active(|session| {
            session.advance();
        });
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    /// Register the tick with `frame_loop`. Only the first call registers.
    pub fn attach(self: &Arc<Self>, frame_loop: &FrameLoop) -> bool {
        if self.attached.swap(true, Ordering::SeqCst) {
            return false;
        }
        let registry: Weak<Self> = Arc::downgrade(self);
        frame_loop.register(Box::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.tick();
            }
        }));
        log::info!("Session registry attached to frame loop");
        true
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

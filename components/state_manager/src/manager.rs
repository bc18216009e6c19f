//! State manager with subscriber dispatch and pause gate

use crate::state::can_transition;
use lumenplay_shared_types::{PlayerError, PlayerResult, PlayerState};
use parking_lot::{Condvar, Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

/// Handle returned by [`StateManager::register`]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl fmt::Debug for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriptionId({})", self.0)
    }
}

type StateCallback = Arc<dyn Fn(PlayerState, PlayerState) + Send + Sync>;

/// The player's finite state machine
///
/// One instance is shared by the facade, the playback controller, and every
/// worker thread. Transitions outside the edge table fail with
/// [`PlayerError::InvalidStateTransition`]. Subscribers are dispatched
/// synchronously against a copy-on-write snapshot, so registration and
/// unregistration never block a running callback and callbacks run without
/// the state lock held. A dedicated dispatch lock keeps notifications in
/// transition order.
pub struct StateManager {
    state: Mutex<PlayerState>,
    changed: Condvar,
    // Serializes transition+notify so subscribers see every edge in order
    dispatch: Mutex<()>,
    subscribers: RwLock<Arc<Vec<(SubscriptionId, StateCallback)>>>,
}

impl StateManager {
    /// Creates a manager in [`PlayerState::Idle`]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PlayerState::Idle),
            changed: Condvar::new(),
            dispatch: Mutex::new(()),
            subscribers: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Returns the current state
    pub fn state(&self) -> PlayerState {
        *self.state.lock()
    }

    /// Performs a validated transition and notifies subscribers
    ///
    /// Transitioning to the current state is a no-op and does not notify.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::InvalidStateTransition`] for edges outside the
    /// table; the state is left unchanged.
    pub fn transition_to(&self, to: PlayerState) -> PlayerResult<()> {
        let _order = self.dispatch.lock();

        let from = {
            let mut state = self.state.lock();
            let from = *state;
            if from == to {
                return Ok(());
            }
            if !can_transition(from, to) {
                warn!(from = from.name(), to = to.name(), "rejected state transition");
                return Err(PlayerError::InvalidStateTransition { from, to });
            }
            *state = to;
            self.changed.notify_all();
            from
        };

        debug!(from = from.name(), to = to.name(), "state transition");

        let subscribers = Arc::clone(&self.subscribers.read());
        for (_, callback) in subscribers.iter() {
            callback(from, to);
        }
        Ok(())
    }

    /// Registers a state-change callback
    ///
    /// The callback receives `(old, new)` for every transition after
    /// registration. It runs on the transitioning thread and must not call
    /// back into the manager with blocking transitions.
    pub fn register<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(PlayerState, PlayerState) + Send + Sync + 'static,
    {
        let id = SubscriptionId(Uuid::new_v4());
        let mut subscribers = self.subscribers.write();
        let mut next = (**subscribers).clone();
        next.push((id, Arc::new(callback)));
        *subscribers = Arc::new(next);
        id
    }

    /// Removes a callback; returns whether it was registered
    pub fn unregister(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        let next: Vec<_> = subscribers
            .iter()
            .filter(|(sub, _)| *sub != id)
            .cloned()
            .collect();
        let removed = next.len() != before;
        *subscribers = Arc::new(next);
        removed
    }

    /// Returns whether pipeline workers should exit their loops
    pub fn should_stop(&self) -> bool {
        matches!(
            self.state(),
            PlayerState::Idle | PlayerState::Stopped | PlayerState::Error
        )
    }

    /// Returns whether pipeline workers should hold at the pause gate
    pub fn should_pause(&self) -> bool {
        matches!(self.state(), PlayerState::Paused | PlayerState::Seeking)
    }

    /// Blocks the caller until playback resumes or stops
    ///
    /// Returns immediately when the state is neither paused nor seeking.
    pub fn wait_for_resume(&self) {
        let mut state = self.state.lock();
        while matches!(*state, PlayerState::Paused | PlayerState::Seeking) {
            self.changed.wait(&mut state);
        }
    }

    /// Sleeps up to `duration`, waking early on any state change
    ///
    /// Pacing sleeps in render loops use this so pause and stop are observed
    /// without polling. Returns the state seen on wakeup.
    pub fn interruptible_sleep(&self, duration: Duration) -> PlayerState {
        let deadline = Instant::now() + duration;
        let mut state = self.state.lock();
        let initial = *state;
        while *state == initial {
            if self.changed.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        *state
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StateManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateManager")
            .field("state", &self.state())
            .field("subscribers", &self.subscribers.read().len())
            .finish()
    }
}

//! # state_manager Component
//!
//! Process-wide player state machine with subscriptions.
//!
//! The [`StateManager`] owns the single [`PlayerState`] every pipeline worker
//! consults. Transitions are validated against a fixed edge table; state
//! change subscribers observe every transition, including the `Seeking`
//! transient that the seek protocol is required never to skip. Worker threads
//! park on the manager's pause gate ([`StateManager::wait_for_resume`])
//! instead of polling.
//!
//! # Examples
//!
//! ```
//! use lumenplay_state_manager::StateManager;
//! use lumenplay_shared_types::PlayerState;
//!
//! let manager = StateManager::new();
//! manager.transition_to(PlayerState::Opening).unwrap();
//! manager.transition_to(PlayerState::Stopped).unwrap();
//! manager.transition_to(PlayerState::Playing).unwrap();
//! assert_eq!(manager.state(), PlayerState::Playing);
//!
//! // Playing -> Opening is not an edge of the table
//! assert!(manager.transition_to(PlayerState::Opening).is_err());
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod manager;
mod state;

pub use manager::{StateManager, SubscriptionId};
pub use state::can_transition;

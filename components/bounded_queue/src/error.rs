//! Error types for queue operations

use thiserror::Error;

/// A failed push; the rejected item travels back to the caller
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PushError<T> {
    /// The queue was stopped; the item was not enqueued
    #[error("queue is stopped")]
    Stopped(T),

    /// The bounded wait elapsed with the queue still full
    #[error("push timed out")]
    Timeout(T),

    /// Non-blocking push found the queue full
    #[error("queue is full")]
    Full(T),
}

impl<T> PushError<T> {
    /// Recovers the item that failed to enqueue
    pub fn into_inner(self) -> T {
        match self {
            PushError::Stopped(item) | PushError::Timeout(item) | PushError::Full(item) => item,
        }
    }

    /// Returns whether the failure was the terminal stop signal
    pub fn is_stopped(&self) -> bool {
        matches!(self, PushError::Stopped(_))
    }
}

//! # bounded_queue Component
//!
//! Blocking bounded FIFO queues with stop semantics.
//!
//! Every stage boundary of the playback pipeline (demuxer → decoder,
//! decoder → player) is a [`BoundedQueue`]. Producers block when the queue is
//! full, which is what throttles the demuxer when decoders fall behind and
//! throttles decoders when players fall behind. `stop()` is the terminal
//! signal: it wakes every waiter and makes all further operations fail, so
//! shutdown never deadlocks on a blocked pipeline stage.
//!
//! # Examples
//!
//! ```
//! use lumenplay_bounded_queue::BoundedQueue;
//!
//! let queue = BoundedQueue::new(4);
//! queue.push(1).unwrap();
//! queue.push(2).unwrap();
//! assert_eq!(queue.pop(), Some(1));
//!
//! queue.stop();
//! assert!(queue.push(3).is_err());
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod error;
mod queue;

pub use error::PushError;
pub use queue::BoundedQueue;

//! Bounded blocking queue implementation

use crate::PushError;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

struct QueueInner<T> {
    items: VecDeque<T>,
    stopped: bool,
}

/// A finite FIFO with blocking push/pop and a terminal stop signal
///
/// Single-producer/single-consumer is the common pipeline arrangement, but
/// every operation is safe under arbitrary concurrent callers. FIFO order is
/// preserved. Operations fail under stop; they never panic.
///
/// # Examples
///
/// ```
/// use lumenplay_bounded_queue::BoundedQueue;
/// use std::sync::Arc;
/// use std::thread;
///
/// let queue = Arc::new(BoundedQueue::new(8));
/// let producer = {
///     let queue = Arc::clone(&queue);
///     thread::spawn(move || {
///         for i in 0..32 {
///             queue.push(i).unwrap();
///         }
///     })
/// };
///
/// let mut received = Vec::new();
/// for _ in 0..32 {
///     received.push(queue.pop().unwrap());
/// }
/// producer.join().unwrap();
/// assert_eq!(received, (0..32).collect::<Vec<_>>());
/// ```
pub struct BoundedQueue<T> {
    inner: Mutex<QueueInner<T>>,
    not_full: Condvar,
    not_empty: Condvar,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    /// Creates a queue holding at most `capacity` items (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(QueueInner {
                items: VecDeque::with_capacity(capacity),
                stopped: false,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            capacity,
        }
    }

    /// Enqueues `item`, blocking while the queue is full
    ///
    /// # Errors
    ///
    /// Returns [`PushError::Stopped`] carrying the item back once the queue
    /// is stopped, including while blocked.
    pub fn push(&self, item: T) -> Result<(), PushError<T>> {
        let mut inner = self.inner.lock();
        loop {
            if inner.stopped {
                return Err(PushError::Stopped(item));
            }
            if inner.items.len() < self.capacity {
                inner.items.push_back(item);
                self.not_empty.notify_one();
                return Ok(());
            }
            self.not_full.wait(&mut inner);
        }
    }

    /// Enqueues `item`, blocking at most `timeout` while the queue is full
    ///
    /// A stop signal fails the push immediately rather than consuming the
    /// remaining timeout; decode threads rely on this to stay responsive.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::Stopped`] on stop, [`PushError::Timeout`] when
    /// the wait elapses with the queue still full. Both carry the item back.
    pub fn push_with_timeout(&self, item: T, timeout: Duration) -> Result<(), PushError<T>> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();
        loop {
            if inner.stopped {
                return Err(PushError::Stopped(item));
            }
            if inner.items.len() < self.capacity {
                inner.items.push_back(item);
                self.not_empty.notify_one();
                return Ok(());
            }
            if self.not_full.wait_until(&mut inner, deadline).timed_out() {
                return Err(if inner.stopped {
                    PushError::Stopped(item)
                } else {
                    PushError::Timeout(item)
                });
            }
        }
    }

    /// Enqueues `item` without blocking
    ///
    /// # Errors
    ///
    /// Returns [`PushError::Stopped`] or [`PushError::Full`] with the item.
    pub fn try_push(&self, item: T) -> Result<(), PushError<T>> {
        let mut inner = self.inner.lock();
        if inner.stopped {
            return Err(PushError::Stopped(item));
        }
        if inner.items.len() >= self.capacity {
            return Err(PushError::Full(item));
        }
        inner.items.push_back(item);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Dequeues the oldest item, blocking while the queue is empty
    ///
    /// Returns `None` once the queue is stopped; residual items are left for
    /// [`BoundedQueue::clear`] so release logic runs exactly once per item.
    pub fn pop(&self) -> Option<T> {
        let mut inner = self.inner.lock();
        loop {
            if inner.stopped {
                return None;
            }
            if let Some(item) = inner.items.pop_front() {
                self.not_full.notify_one();
                return Some(item);
            }
            self.not_empty.wait(&mut inner);
        }
    }

    /// Dequeues the oldest item without blocking
    pub fn try_pop(&self) -> Option<T> {
        let mut inner = self.inner.lock();
        if inner.stopped {
            return None;
        }
        let item = inner.items.pop_front();
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    /// Signals the terminal stop and wakes every waiter; idempotent
    pub fn stop(&self) {
        let mut inner = self.inner.lock();
        inner.stopped = true;
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }

    /// Re-arms the queue after a stop
    ///
    /// Only legal once no worker references the queue; callers drain residue
    /// with [`BoundedQueue::clear`] first.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.stopped = false;
    }

    /// Returns whether the queue has been stopped
    pub fn is_stopped(&self) -> bool {
        self.inner.lock().stopped
    }

    /// Drains every queued item under the lock, calling `visitor` once per item
    pub fn clear<F>(&self, mut visitor: F)
    where
        F: FnMut(T),
    {
        let mut inner = self.inner.lock();
        while let Some(item) = inner.items.pop_front() {
            visitor(item);
        }
        self.not_full.notify_all();
    }

    /// Returns the number of queued items
    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    /// Returns whether the queue holds no items
    pub fn is_empty(&self) -> bool {
        self.inner.lock().items.is_empty()
    }

    /// Returns the configured capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

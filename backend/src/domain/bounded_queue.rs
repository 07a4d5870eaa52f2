//! Fixed-capacity FIFO shared by pipeline workers and the front door.
//!
//! Built on a bounded Tokio channel. The receiving half sits behind an async
//! mutex so several consumers can share it: a blocking `pop` holds the lock
//! only while the queue is empty, and `try_pop` gives up instead of waiting
//! for that lock.

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use crate::domain::Cancelled;
use crate::domain::cancellation::until_cancelled;

/// Bounded multi-producer, multi-consumer FIFO queue.
///
/// # Examples
/// ```
/// use laff::domain::BoundedQueue;
/// use tokio_util::sync::CancellationToken;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let queue = BoundedQueue::new(2);
/// let cancel = CancellationToken::new();
/// queue.push("first", &cancel).await.expect("capacity available");
/// assert_eq!(queue.try_pop(), Some("first"));
/// assert_eq!(queue.try_pop(), None);
/// # });
/// ```
#[derive(Debug)]
pub struct BoundedQueue<T> {
    sender: mpsc::Sender<T>,
    receiver: Mutex<mpsc::Receiver<T>>,
}

impl<T> BoundedQueue<T> {
    /// Create a queue holding at most `capacity` items. A zero capacity is
    /// raised to one.
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self {
            sender,
            receiver: Mutex::new(receiver),
        }
    }

    /// Append `item`, waiting for free capacity.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] when `cancel` fires first; the item is dropped.
    pub async fn push(&self, item: T, cancel: &CancellationToken) -> Result<(), Cancelled> {
        until_cancelled(cancel, self.sender.send(item))
            .await?
            .map_err(|_| Cancelled)
    }

    /// Remove the oldest item, waiting until one is available.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] when `cancel` fires first.
    pub async fn pop(&self, cancel: &CancellationToken) -> Result<T, Cancelled> {
        let received = until_cancelled(cancel, async {
            let mut receiver = self.receiver.lock().await;
            receiver.recv().await
        })
        .await?;
        received.ok_or(Cancelled)
    }

    /// Remove the oldest item without waiting.
    ///
    /// Returns `None` when the queue is empty, or when another consumer is
    /// parked in [`BoundedQueue::pop`] (which only happens while it is empty).
    pub fn try_pop(&self) -> Option<T> {
        let mut receiver = self.receiver.try_lock().ok()?;
        receiver.try_recv().ok()
    }

    /// Number of queued items.
    pub fn len(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    /// Whether the queue holds no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of items the queue can hold.
    pub fn capacity(&self) -> usize {
        self.sender.max_capacity()
    }
}

#[cfg(test)]
mod tests {
    //! FIFO, backpressure and cancellation behaviour.

    use std::sync::Arc;
    use std::time::Duration;

    use rstest::{fixture, rstest};
    use tokio::time::{Instant, timeout};

    use super::*;

    #[fixture]
    fn cancel() -> CancellationToken {
        CancellationToken::new()
    }

    #[rstest]
    #[tokio::test]
    async fn pops_in_push_order(cancel: CancellationToken) {
        let queue = BoundedQueue::new(4);
        for value in 0..4 {
            queue.push(value, &cancel).await.expect("push");
        }

        let mut drained = Vec::new();
        for _ in 0..4 {
            drained.push(queue.pop(&cancel).await.expect("pop"));
        }
        assert_eq!(drained, vec![0, 1, 2, 3]);
    }

    #[rstest]
    fn try_pop_on_empty_queue_returns_immediately() {
        let queue = BoundedQueue::<u32>::new(1);
        let started = std::time::Instant::now();
        assert_eq!(queue.try_pop(), None);
        assert!(started.elapsed() < Duration::from_millis(50));
    }

    #[rstest]
    #[tokio::test]
    async fn try_pop_gives_up_while_a_consumer_is_parked(cancel: CancellationToken) {
        let queue = Arc::new(BoundedQueue::<u32>::new(1));
        let parked = {
            let queue = Arc::clone(&queue);
            let cancel = cancel.clone();
            tokio::spawn(async move { queue.pop(&cancel).await })
        };
        tokio::task::yield_now().await;

        assert_eq!(queue.try_pop(), None);
        queue.push(7, &cancel).await.expect("push");
        let popped = timeout(Duration::from_secs(1), parked)
            .await
            .expect("parked pop completes")
            .expect("join");
        assert_eq!(popped, Ok(7));
    }

    #[rstest]
    #[tokio::test]
    async fn push_waits_for_capacity(cancel: CancellationToken) {
        let queue = Arc::new(BoundedQueue::new(1));
        queue.push(1, &cancel).await.expect("first push");
        assert_eq!(queue.len(), 1);

        let pusher = {
            let queue = Arc::clone(&queue);
            let cancel = cancel.clone();
            tokio::spawn(async move { queue.push(2, &cancel).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!pusher.is_finished(), "push must wait while the queue is full");

        assert_eq!(queue.try_pop(), Some(1));
        timeout(Duration::from_secs(1), pusher)
            .await
            .expect("push completes once space frees")
            .expect("join")
            .expect("push succeeds");
        assert_eq!(queue.try_pop(), Some(2));
    }

    #[rstest]
    #[tokio::test]
    async fn cancellation_releases_blocked_push_and_pop(cancel: CancellationToken) {
        let full = Arc::new(BoundedQueue::new(1));
        full.push(1, &cancel).await.expect("fill");
        let empty = Arc::new(BoundedQueue::<u32>::new(1));

        let pusher = {
            let full = Arc::clone(&full);
            let cancel = cancel.clone();
            tokio::spawn(async move { full.push(2, &cancel).await })
        };
        let popper = {
            let empty = Arc::clone(&empty);
            let cancel = cancel.clone();
            tokio::spawn(async move { empty.pop(&cancel).await })
        };
        tokio::task::yield_now().await;

        let started = Instant::now();
        cancel.cancel();
        let pushed = timeout(Duration::from_secs(1), pusher)
            .await
            .expect("push returns")
            .expect("join");
        let popped = timeout(Duration::from_secs(1), popper)
            .await
            .expect("pop returns")
            .expect("join");

        assert_eq!(pushed, Err(Cancelled));
        assert_eq!(popped, Err(Cancelled));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[rstest]
    fn zero_capacity_is_raised_to_one() {
        let queue = BoundedQueue::<u8>::new(0);
        assert_eq!(queue.capacity(), 1);
        assert!(queue.is_empty());
    }
}

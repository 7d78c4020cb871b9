//! Per-session outbound queue.
//!
//! Hub actors never block on a member: delivery only appends to a bounded
//! queue, and a full queue is handled by the configured [`OverflowPolicy`].
//! The session's write pump is the single consumer.

use std::{
    collections::VecDeque,
    fmt,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use tokio::sync::Notify;

/// An encoded frame, shared between all recipients of a broadcast.
pub type OutboundFrame = Arc<str>;

/// What happens when a member's outbound queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OverflowPolicy {
    /// Evict the slow member and close its session
    #[default]
    Disconnect,
    /// Discard the oldest queued frame to make room, and count it
    DropOldest,
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnect => f.write_str("disconnect"),
            Self::DropOldest => f.write_str("drop-oldest"),
        }
    }
}

/// Result of a single delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    /// Queued after discarding the oldest pending frame
    DisplacedOldest,
    /// Queue full (now or earlier), member evicted
    Evicted,
    /// Session already closed its queue
    Closed,
}

impl Delivery {
    /// Whether the recipient should be removed from membership sets
    pub fn is_gone(self) -> bool {
        matches!(self, Self::Evicted | Self::Closed)
    }
}

#[derive(Debug, Default)]
struct QueueState {
    frames: VecDeque<OutboundFrame>,
    closed: bool,
    evicted: bool,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<QueueState>,
    capacity: usize,
    policy: OverflowPolicy,
    dropped: AtomicU64,
    readable: Notify,
    eviction: Notify,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // the state stays consistent even if a holder panicked
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Producer side of an outbound queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct OutboundSender {
    shared: Arc<Shared>,
}

/// Consumer side, owned by the write pump. Dropping it closes the queue.
#[derive(Debug)]
pub struct OutboundReceiver {
    shared: Arc<Shared>,
}

/// Resolves once the session has been evicted.
#[derive(Debug)]
pub struct Eviction {
    shared: Arc<Shared>,
}

impl Eviction {
    pub async fn evicted(&self) {
        self.shared.eviction.notified().await;
    }
}

/// Create an outbound queue with the given capacity and overflow policy.
pub fn outbound_queue(
    capacity: usize,
    policy: OverflowPolicy,
) -> (OutboundSender, OutboundReceiver, Eviction) {
    let shared = Arc::new(Shared {
        state: Mutex::new(QueueState {
            frames: VecDeque::with_capacity(capacity),
            ..QueueState::default()
        }),
        capacity,
        policy,
        dropped: AtomicU64::new(0),
        readable: Notify::new(),
        eviction: Notify::new(),
    });
    (
        OutboundSender {
            shared: shared.clone(),
        },
        OutboundReceiver {
            shared: shared.clone(),
        },
        Eviction { shared },
    )
}

impl OutboundSender {
    /// Enqueue a frame without waiting.
    pub fn send(&self, frame: OutboundFrame) -> Delivery {
        let mut state = self.shared.lock();
        if state.closed {
            return Delivery::Closed;
        }
        if state.evicted {
            return Delivery::Evicted;
        }

        let mut delivery = Delivery::Queued;
        if state.frames.len() >= self.shared.capacity {
            match self.shared.policy {
                OverflowPolicy::DropOldest => {
                    state.frames.pop_front();
                    self.shared.dropped.fetch_add(1, Ordering::Relaxed);
                    delivery = Delivery::DisplacedOldest;
                }
                OverflowPolicy::Disconnect => {
                    state.evicted = true;
                    drop(state);
                    // notify_one keeps a permit if the reader is not waiting yet
                    self.shared.eviction.notify_one();
                    return Delivery::Evicted;
                }
            }
        }
        state.frames.push_back(frame);
        drop(state);
        self.shared.readable.notify_one();
        delivery
    }

    /// Refuse every further frame. Frames already queued can still be read.
    /// Idempotent.
    pub fn close(&self) {
        self.shared.lock().closed = true;
        self.shared.readable.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    pub fn is_evicted(&self) -> bool {
        self.shared.lock().evicted
    }

    /// Frames discarded under [`OverflowPolicy::DropOldest`]
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

impl OutboundReceiver {
    /// Next frame, or `None` once the queue is closed and drained.
    pub async fn recv(&mut self) -> Option<OutboundFrame> {
        loop {
            {
                let mut state = self.shared.lock();
                if let Some(frame) = state.frames.pop_front() {
                    return Some(frame);
                }
                if state.closed {
                    return None;
                }
            }
            self.shared.readable.notified().await;
        }
    }

    pub fn try_recv(&mut self) -> Option<OutboundFrame> {
        self.shared.lock().frames.pop_front()
    }

    /// Frames currently queued
    pub fn len(&self) -> usize {
        self.shared.lock().frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop accepting frames; the ones already queued remain readable.
    pub fn close(&mut self) {
        self.shared.lock().closed = true;
    }
}

impl Drop for OutboundReceiver {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        state.closed = true;
        state.frames.clear();
    }
}

//! Lifecycle events emitted by the display.
//!
//! Events land in an [`EventQueue`] the host drains once per frame. Hosts
//! that prefer push delivery can [`subscribe`](EventBus::subscribe) for a
//! channel receiver instead; both see every event.

use std::collections::VecDeque;
use std::collections::vec_deque::Drain;
use std::sync::mpsc::{self, Receiver, Sender};

use crate::error::DisplayError;
use crate::performance::{PerformanceMetrics, PerformanceWarning};

/// Oldest events are dropped once a never-drained queue reaches this size.
pub const MAX_QUEUED_EVENTS: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayEvent {
    /// Atlas and shaders are ready; the display accepts commands.
    Ready,
    /// The outcome of `spin_id` has settled on screen.
    SpinComplete { spin_id: String },
    /// Advisory only, rendering continues.
    PerformanceWarning {
        warnings: Vec<PerformanceWarning>,
        metrics: PerformanceMetrics,
    },
    /// Initialization failed; the display will not become ready.
    Error(DisplayError),
}

#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<DisplayEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: DisplayEvent) {
        if self.events.len() >= MAX_QUEUED_EVENTS {
            self.events.pop_front();
            tracing::warn!("Event queue full, dropping oldest event");
        }
        self.events.push_back(event);
    }

    /// Take every pending event, oldest first.
    pub fn drain(&mut self) -> Drain<'_, DisplayEvent> {
        self.events.drain(..)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DisplayEvent> {
        self.events.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Fans events out to the queue and to every subscriber.
#[derive(Debug, Default)]
pub struct EventBus {
    queue: EventQueue,
    subscribers: Vec<(SubscriptionId, Sender<DisplayEvent>)>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, event: DisplayEvent) {
        tracing::trace!("Emitting {:?}", event);
        // Receivers that were dropped are unsubscribed implicitly.
        self.subscribers.retain(|(_, tx)| tx.send(event.clone()).is_ok());
        self.queue.push(event);
    }

    pub fn subscribe(&mut self) -> (SubscriptionId, Receiver<DisplayEvent>) {
        let (tx, rx) = mpsc::channel();
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, tx));
        (id, rx)
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        before != self.subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut EventQueue {
        &mut self.queue
    }
}

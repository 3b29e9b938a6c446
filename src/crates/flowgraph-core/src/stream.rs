//! Live event stream of a running workflow
//!
//! Every event a node emits (including the final `Stop`, but not the engine's own
//! `Start`) is pushed to an [`EventSink`] the moment it is produced, before it is
//! queued for routing. The receiving half is an [`EventStream`]: a lazy, single-pass
//! `Stream` in production order.
//!
//! ```text
//!  engine loop ──emit──► EventSink ──mpsc(capacity)──► EventStream ──► caller
//!                            │
//!                            └── full? apply BackpressurePolicy
//! ```
//!
//! The channel is bounded. Until it fills, events are buffered, so a caller that
//! only starts reading after the run finished still sees everything in order.
//! Once it is full the [`BackpressurePolicy`] decides:
//!
//! | Policy | Behaviour when full |
//! |--------|---------------------|
//! | `Block { timeout: None }` | wait for the consumer |
//! | `Block { timeout: Some(d) }` | wait up to `d`, then drop the event with a warning |
//! | `DropNewest` | drop the event with a warning, never wait |
//!
//! A consumer that drops its stream disables the sink; execution carries on.

use crate::event::{Event, Payload};
use futures::Stream;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

/// Stream of events produced by one run
pub type EventStream<E> = Pin<Box<dyn Stream<Item = Event<E>> + Send>>;

/// What the sink does when the channel is full
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackpressurePolicy {
    /// Wait for capacity, optionally giving up after `timeout`
    Block { timeout: Option<Duration> },
    /// Drop the event immediately
    DropNewest,
}

impl Default for BackpressurePolicy {
    fn default() -> Self {
        Self::Block { timeout: None }
    }
}

/// Sending half of a run's event stream
#[derive(Debug)]
pub struct EventSink<E> {
    sender: Option<mpsc::Sender<Event<E>>>,
    policy: BackpressurePolicy,
    dropped: usize,
}

impl<E: Payload> EventSink<E> {
    /// A sink that discards everything
    pub fn disabled() -> Self {
        Self {
            sender: None,
            policy: BackpressurePolicy::default(),
            dropped: 0,
        }
    }

    /// Whether a consumer is still attached
    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    /// Events dropped because of the backpressure policy
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Surface `event` to the consumer
    pub async fn emit(&mut self, event: &Event<E>) {
        let Some(sender) = &self.sender else { return };

        match self.policy {
            BackpressurePolicy::Block { timeout: None } => {
                if sender.send(event.clone()).await.is_err() {
                    self.detach();
                }
            }
            BackpressurePolicy::Block {
                timeout: Some(limit),
            } => match tokio::time::timeout(limit, sender.send(event.clone())).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => self.detach(),
                Err(_) => self.drop_event(event),
            },
            BackpressurePolicy::DropNewest => match sender.try_send(event.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => self.drop_event(event),
                Err(TrySendError::Closed(_)) => self.detach(),
            },
        }
    }

    fn detach(&mut self) {
        debug!("Event stream receiver dropped, disabling sink");
        self.sender = None;
    }

    fn drop_event(&mut self, event: &Event<E>) {
        self.dropped += 1;
        warn!(
            event_type = %event.event_type(),
            dropped = self.dropped,
            "Event stream full, dropping event"
        );
    }
}

/// Create a connected sink and stream
///
/// `capacity` is clamped to at least one.
pub fn event_channel<E: Payload>(
    capacity: usize,
    policy: BackpressurePolicy,
) -> (EventSink<E>, EventStream<E>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let sink = EventSink {
        sender: Some(tx),
        policy,
        dropped: 0,
    };
    (sink, Box::pin(ReceiverStream::new(rx)))
}

/// A stream that ends immediately
pub(crate) fn empty_stream<E: Payload>() -> EventStream<E> {
    Box::pin(futures::stream::empty())
}

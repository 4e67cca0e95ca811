// ABOUTME: Ordered single-producer/single-consumer event bus between a pipeline and its presentation sink
// The consumer drains until the emitter is closed, then hands the sink back on a oneshot

pub mod terminal;

pub use terminal::TerminalSink;

use crate::models::{Event, EventStatus};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Identifies one pipeline step on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub key: &'static str,
    pub name: &'static str,
}

impl Step {
    pub const fn new(key: &'static str, name: &'static str) -> Self {
        Self { key, name }
    }
}

/// Receives every event, in order, on the consumer task.
pub trait EventSink: Send + 'static {
    fn handle(&mut self, event: &Event);

    /// Called once after the last event.
    fn close(&mut self) {}
}

#[derive(Debug, Error)]
pub enum EventBusError {
    #[error("event consumer stopped before signalling completion")]
    ConsumerGone,
}

/// Entry point for a progress channel and its consumer task.
pub struct EventBus;

impl EventBus {
    /// Spawn the consumer task. Must be called inside a tokio runtime.
    pub fn start<S: EventSink>(sink: S) -> (EventEmitter, Drain<S>) {
        // Capacity 1 keeps the producer at most one event ahead of the renderer
        let (tx, mut rx) = mpsc::channel::<Event>(1);
        let (done_tx, done_rx) = oneshot::channel();

        tokio::spawn(async move {
            let mut sink = sink;
            while let Some(event) = rx.recv().await {
                sink.handle(&event);
            }
            sink.close();
            debug!("Event consumer drained");
            let _ = done_tx.send(sink);
        });

        (EventEmitter { tx }, Drain { done: done_rx })
    }
}

/// Producer half. Not `Clone`: exactly one producer per bus.
pub struct EventEmitter {
    tx: mpsc::Sender<Event>,
}

impl EventEmitter {
    /// Send an event, waiting until the consumer has room for it.
    pub async fn emit(&self, event: Event) {
        if let Err(e) = self.tx.send(event).await {
            warn!("Event dropped, consumer is gone: {:?}", e.0);
        }
    }

    pub async fn report(&self, step: Step, status: EventStatus, message: impl Into<String>) {
        self.emit(Event::new(step.key, step.name, status, message)).await;
    }

    /// Open `step`; exactly one terminal event must follow.
    pub async fn running(&self, step: Step, message: impl Into<String>) {
        self.report(step, EventStatus::Running, message).await;
    }

    pub async fn success(&self, step: Step, message: impl Into<String>) {
        self.report(step, EventStatus::Success, message).await;
    }

    pub async fn error(&self, step: Step, message: impl Into<String>) {
        self.report(step, EventStatus::Error, message).await;
    }

    pub async fn info(&self, step: Step, message: impl Into<String>) {
        self.report(step, EventStatus::Info, message).await;
    }

    /// Standalone event for a step that does not apply.
    pub async fn skipped(&self, step: Step, message: impl Into<String>) {
        self.report(step, EventStatus::Skipped, message).await;
    }

    /// Close the channel so the consumer can finish draining.
    pub fn close(self) {
        drop(self.tx);
    }
}

/// Completion handoff of the consumer task.
pub struct Drain<S> {
    done: oneshot::Receiver<S>,
}

impl<S> Drain<S> {
    /// Wait until every emitted event has been handled, returning the sink.
    pub async fn wait(self) -> Result<S, EventBusError> {
        self.done.await.map_err(|_| EventBusError::ConsumerGone)
    }
}

/// Keeps every event in memory. Used by tests and by callers that want a transcript.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    pub events: Vec<Event>,
    pub closed: bool,
}

impl RecordingSink {
    /// Keys of every recorded event with `status`, in order.
    pub fn keys_with_status(&self, status: EventStatus) -> Vec<String> {
        self.events
            .iter()
            .filter(|e| e.status == status)
            .map(|e| e.key.clone())
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn handle(&mut self, event: &Event) {
        self.events.push(event.clone());
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// Check the step protocol: each `running` event is closed by exactly one
/// terminal event of the same key before the next `running` event.
pub fn check_step_pairing(events: &[Event]) -> Result<(), String> {
    let mut open: Option<&Event> = None;

    for event in events {
        if !event.status.is_terminal() {
            if let Some(prev) = open {
                return Err(format!("step '{}' started before '{}' finished", event.key, prev.key));
            }
            open = Some(event);
            continue;
        }

        match open {
            Some(prev) if prev.key != event.key => {
                return Err(format!("terminal event '{}' does not close step '{}'", event.key, prev.key));
            }
            Some(_) => open = None,
            None => {}
        }
    }

    match open {
        Some(prev) => Err(format!("step '{}' never finished", prev.key)),
        None => Ok(()),
    }
}

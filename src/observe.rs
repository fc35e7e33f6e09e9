//! Observability collaborator.
//!
//! The rendering core and the generator report timings and recoverable
//! problems through an injected [`Observer`] instead of logging directly, so
//! they stay silent under test unless a test asks to see the events.

use std::sync::Mutex;
use std::time::{Duration, Instant};

pub trait Observer: Send + Sync {
    /// A named span finished.
    fn span_finished(&self, name: &'static str, elapsed: Duration);

    /// A recoverable problem (asset skipped, secondary upload failed).
    fn warn(&self, message: &str);

    /// Progress information.
    fn info(&self, _message: &str) {}
}

/// Times a span until dropped.
pub struct SpanTimer<'a> {
    observer: &'a dyn Observer,
    name: &'static str,
    started: Instant,
}

impl Drop for SpanTimer<'_> {
    fn drop(&mut self) {
        self.observer.span_finished(self.name, self.started.elapsed());
    }
}

/// Start a span on `observer`; it is reported when the returned guard drops.
pub fn span<'a>(observer: &'a dyn Observer, name: &'static str) -> SpanTimer<'a> {
    SpanTimer {
        observer,
        name,
        started: Instant::now(),
    }
}

/// Forwards everything to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn span_finished(&self, name: &'static str, elapsed: Duration) {
        tracing::debug!(span = name, elapsed_ms = elapsed.as_millis() as u64, "span finished");
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{}", message);
    }

    fn info(&self, message: &str) {
        tracing::info!("{}", message);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn span_finished(&self, _name: &'static str, _elapsed: Duration) {}
    fn warn(&self, _message: &str) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservedEvent {
    Span(&'static str),
    Warn(String),
    Info(String),
}

/// Keeps every event in memory. Durations are dropped so event lists compare
/// deterministically.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ObservedEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ObservedEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ObservedEvent::Warn(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    pub fn spans(&self) -> Vec<&'static str> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ObservedEvent::Span(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: ObservedEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl Observer for RecordingObserver {
    fn span_finished(&self, name: &'static str, _elapsed: Duration) {
        self.push(ObservedEvent::Span(name));
    }

    fn warn(&self, message: &str) {
        self.push(ObservedEvent::Warn(message.to_string()));
    }

    fn info(&self, message: &str) {
        self.push(ObservedEvent::Info(message.to_string()));
    }
}

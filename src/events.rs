//! Host status channel.
//!
//! The orchestrator reports progress as [`StatusEvent`]s through an
//! [`EventBus`]. Every event is logged through `tracing`; hosts attach zero or
//! more [`EventSink`]s to display them.

use serde::{Deserialize, Serialize};
use std::sync::mpsc::Sender;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
}

impl StatusEvent {
    pub fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }
}

pub trait EventSink: Send + Sync {
    fn on_event(&self, event: &StatusEvent);
}

/// Forwards events to a channel, e.g. one polled by a UI thread. A dropped
/// receiver is ignored.
pub struct ChannelSink {
    sender: Sender<StatusEvent>,
}

impl ChannelSink {
    pub fn new(sender: Sender<StatusEvent>) -> Self {
        Self { sender }
    }
}

impl EventSink for ChannelSink {
    fn on_event(&self, event: &StatusEvent) {
        let _ = self.sender.send(event.clone());
    }
}

#[derive(Clone, Default)]
pub struct EventBus {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn emit(&self, event: StatusEvent) {
        match event.kind {
            EventKind::Info => tracing::info!("{}", event.message),
            EventKind::Success => tracing::info!(success = true, "{}", event.message),
            EventKind::Warning => tracing::warn!("{}", event.message),
            EventKind::Error => tracing::error!("{}", event.message),
        }
        for sink in &self.sinks {
            sink.on_event(&event);
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(StatusEvent::new(EventKind::Info, message));
    }

    pub fn success(&self, message: impl Into<String>) {
        self.emit(StatusEvent::new(EventKind::Success, message));
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.emit(StatusEvent::new(EventKind::Warning, message));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(StatusEvent::new(EventKind::Error, message));
    }
}

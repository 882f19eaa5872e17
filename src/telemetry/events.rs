//! Per-request classification events.

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// One finished classification request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationEvent {
    pub request_id: String,
    /// `short_circuit`, `ensemble`, `single_outcome` or `emergency_fallback`.
    pub path: String,
    pub source: String,
    pub label: String,
    pub confidence: f64,
    pub providers_attempted: usize,
    pub providers_failed: usize,
    pub duration_ms: u64,
    /// Unix ms when the request finished.
    pub timestamp: u64,
}

/// Destination for classification events.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn report(&self, event: ClassificationEvent) -> Result<()>;
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// No-op sink (the default).
pub struct NoopEventSink;

#[async_trait]
impl EventSink for NoopEventSink {
    async fn report(&self, _: ClassificationEvent) -> Result<()> {
        Ok(())
    }
}

pub fn noop_sink() -> Arc<dyn EventSink> {
    Arc::new(NoopEventSink)
}

/// Bounded in-memory sink, oldest events dropped first.
pub struct InMemoryEventSink {
    events: RwLock<Vec<ClassificationEvent>>,
    max_events: usize,
}

impl InMemoryEventSink {
    pub fn new(max: usize) -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            max_events: max.max(1),
        }
    }
    pub fn events(&self) -> Vec<ClassificationEvent> {
        self.events
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
    pub fn len(&self) -> usize {
        self.events.read().unwrap_or_else(|e| e.into_inner()).len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn clear(&self) {
        self.events.write().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

#[async_trait]
impl EventSink for InMemoryEventSink {
    async fn report(&self, event: ClassificationEvent) -> Result<()> {
        let mut events = self.events.write().unwrap_or_else(|e| e.into_inner());
        events.push(event);
        if events.len() > self.max_events {
            events.remove(0);
        }
        Ok(())
    }
}

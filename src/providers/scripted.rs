//! Deterministic provider driven by a queue of canned steps.
//!
//! Useful for tests, demos and dry runs of a provider lineup. Once the queue
//! is drained every call repeats the fallback step (by default a failure).

use super::{ClassificationProvider, ProviderError, ProviderErrorKind};
use crate::types::{ClassificationOutcome, ImagePayload};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
enum Step {
    Outcome(ClassificationOutcome),
    Fail(ProviderErrorKind),
    Hang,
}

#[derive(Debug, Clone)]
pub struct ScriptedProvider {
    name: String,
    queue: Arc<Mutex<VecDeque<Step>>>,
    repeat: Step,
    delay: Option<Duration>,
    call_count: Arc<AtomicUsize>,
}

impl ScriptedProvider {
    /// A provider whose script is empty: every call fails as `unavailable`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            queue: Arc::new(Mutex::new(VecDeque::new())),
            repeat: Step::Fail(ProviderErrorKind::Unavailable),
            delay: None,
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Always answers `label` with `confidence`.
    pub fn succeeding(name: impl Into<String>, label: &str, confidence: f64) -> Self {
        let mut p = Self::new(name);
        p.repeat = Step::Outcome(ClassificationOutcome::new(label, confidence, p.name.clone()));
        p
    }

    /// Always fails with `kind`.
    pub fn failing(name: impl Into<String>, kind: ProviderErrorKind) -> Self {
        let mut p = Self::new(name);
        p.repeat = Step::Fail(kind);
        p
    }

    /// Never answers.
    pub fn hanging(name: impl Into<String>) -> Self {
        let mut p = Self::new(name);
        p.repeat = Step::Hang;
        p
    }

    pub fn then_succeed(self, label: &str, confidence: f64) -> Self {
        let outcome = ClassificationOutcome::new(label, confidence, self.name.clone());
        self.push(Step::Outcome(outcome))
    }

    pub fn then_outcome(self, outcome: ClassificationOutcome) -> Self {
        self.push(Step::Outcome(outcome))
    }

    pub fn then_fail(self, kind: ProviderErrorKind) -> Self {
        self.push(Step::Fail(kind))
    }

    pub fn then_hang(self) -> Self {
        self.push(Step::Hang)
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    fn push(self, step: Step) -> Self {
        self.queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(step);
        self
    }

    fn next_step(&self) -> Step {
        self.queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| self.repeat.clone())
    }
}

#[async_trait]
impl ClassificationProvider for ScriptedProvider {
    async fn classify(
        &self,
        _image: &ImagePayload,
    ) -> std::result::Result<ClassificationOutcome, ProviderError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let step = self.next_step();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match step {
            Step::Outcome(outcome) => Ok(outcome),
            Step::Fail(kind) => Err(ProviderError::new(
                &self.name,
                kind,
                format!("scripted {} failure", kind),
            )),
            Step::Hang => {
                std::future::pending::<()>().await;
                Err(ProviderError::new(&self.name, ProviderErrorKind::Timeout, "unreachable"))
            }
        }
    }
}

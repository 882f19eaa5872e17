//! 遥测模块：提供者调用统计与分类事件。
//!
//! Telemetry Module.
//!
//! Pure bookkeeping. Nothing here influences which provider is called or
//! which answer wins.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`MetricsRecorder`] | Per-provider calls, successes, smoothed confidence, last use |
//! | [`ProviderMetricsSummary`] | Read-only row for the observability panel |
//! | [`EventSink`] | Trait for per-request event destinations |
//! | [`NoopEventSink`] | Default sink (no collection) |
//! | [`InMemoryEventSink`] | Bounded in-memory sink for tests and dashboards |

pub mod events;
pub mod metrics;

pub use events::{noop_sink, ClassificationEvent, EventSink, InMemoryEventSink, NoopEventSink};
pub use metrics::{MetricsRecorder, ProviderMetrics, ProviderMetricsSummary, ProviderStatus};

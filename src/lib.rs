//! # wildlife-id
//!
//! 多提供者野生动物物种识别引擎：按优先级故障转移、熔断排除、加权集成投票与确定性兜底。
//!
//! Multi-provider wildlife species classification engine.
//!
//! ## Overview
//!
//! A photo is sent to a prioritized lineup of classification providers (cloud
//! vision APIs, a citizen-science taxonomy service, an on-device model). The
//! first provider that is confident enough wins. When nobody is, the answers
//! that did come back are grouped by tolerant label matching and voted on.
//! When nothing came back at all, an offline heuristic still produces a
//! clearly-marked low-confidence answer. Callers always get exactly one
//! [`FinalClassification`] for a valid image.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wildlife_id::providers::{ProviderDescriptor, ScriptedProvider};
//! use wildlife_id::{Classifier, ImagePayload};
//!
//! #[tokio::main]
//! async fn main() -> wildlife_id::Result<()> {
//!     let classifier = Classifier::builder()
//!         .provider(
//!             ProviderDescriptor::new("vision", 1, 0.75, 0.3),
//!             ScriptedProvider::succeeding("vision", "Bengal Tiger", 0.91),
//!         )
//!         .build()?;
//!
//!     let image = ImagePayload::from_path("tiger.jpg").await?;
//!     let result = classifier.classify(&image).await?;
//!     println!("{} ({:.2}) via {}", result.label, result.confidence, result.source);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`orchestrator`] | [`Classifier`] failover state machine, builder, batch runs |
//! | [`providers`] | Provider capability trait, descriptors, vendor adapters |
//! | [`resilience`] | Health registry (per-provider circuit breaker) and clocks |
//! | [`telemetry`] | Per-provider metrics and classification events |
//! | [`ensemble`] | Weighted voting over similar labels |
//! | [`labels`] | Label normalization and tolerant similarity |
//! | [`fallback`] | Deterministic emergency fallback |
//! | [`enrich`] | Scientific name and taxonomy enrichment |
//! | [`config`] | YAML engine configuration |
//! | [`types`] | Image payloads, outcomes, final results |

pub mod config;
pub mod enrich;
pub mod ensemble;
pub mod fallback;
pub mod labels;
pub mod orchestrator;
pub mod providers;
pub mod resilience;
pub mod telemetry;
pub mod types;

pub use config::EngineConfig;
pub use orchestrator::{ClassificationPath, ClassificationReport, Classifier, ClassifierBuilder};
pub use providers::{ClassificationProvider, ProviderDescriptor, ProviderError, ProviderKind};
pub use types::{
    ClassificationOutcome, FinalClassification, ImageFormat, ImagePayload, ResultSource, Taxonomy,
};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

pub mod error;
pub use error::{Error, ErrorContext};

pub use tokio_util::sync::CancellationToken;

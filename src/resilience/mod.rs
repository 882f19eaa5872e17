//! 弹性模块：提供者熔断（健康登记表）与可注入时钟。
//!
//! # Resilience Module
//!
//! Tracks which classification providers are temporarily excluded after a
//! failure.
//!
//! ## State machine (per provider)
//!
//! - **Available**: the provider is tried normally
//! - **Excluded**: set immediately on any provider error, for a fixed cooldown
//! - Back to **Available** once `now >= excluded_until`, checked lazily on read
//!
//! There is no half-open probing. `reset()` clears all exclusions, which is
//! what an explicit user-triggered retry does.
//!
//! ```rust
//! use wildlife_id::resilience::{HealthConfig, HealthRegistry};
//! use std::time::Duration;
//!
//! let registry = HealthRegistry::new(HealthConfig::new().with_cooldown(Duration::from_secs(300)));
//! registry.mark_failed("google-vision");
//! assert!(!registry.is_available("google-vision"));
//! registry.reset();
//! assert!(registry.is_available("google-vision"));
//! ```

pub mod clock;
pub mod health;

pub use clock::{system_clock, Clock, ManualClock, SystemClock};
pub use health::{ExclusionSnapshot, HealthConfig, HealthRegistry, DEFAULT_COOLDOWN, MAX_COOLDOWN};

//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use wildlife_id::providers::{ProviderDescriptor, ScriptedProvider};
use wildlife_id::resilience::ManualClock;
use wildlife_id::{ClassifierBuilder, ImagePayload};

pub const JPEG_HEADER: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xE0];

pub fn jpeg() -> ImagePayload {
    let mut bytes = JPEG_HEADER.to_vec();
    bytes.extend_from_slice(b"fake image body");
    ImagePayload::new(bytes)
}

pub fn jpeg_named(name: &str) -> ImagePayload {
    jpeg().with_file_name(name)
}

pub fn desc(name: &str, priority: i32, min_confidence: f64, weight: f64) -> ProviderDescriptor {
    ProviderDescriptor::new(name, priority, min_confidence, weight)
}

/// Builder wired to a manual clock so cooldowns can be stepped through.
pub fn builder_with_clock() -> (ClassifierBuilder, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let builder = ClassifierBuilder::new()
        .clock(clock.clone())
        .cooldown(Duration::from_secs(300))
        .provider_timeout(Duration::from_secs(15));
    (builder, clock)
}

/// Register scripted providers, returning handles that share call counters.
pub fn with_scripted(
    mut builder: ClassifierBuilder,
    lineup: Vec<(ProviderDescriptor, ScriptedProvider)>,
) -> (ClassifierBuilder, Vec<ScriptedProvider>) {
    let mut handles = Vec::new();
    for (d, p) in lineup {
        handles.push(p.clone());
        builder = builder.provider(d, p);
    }
    (builder, handles)
}

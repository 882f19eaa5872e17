//! Per-provider metrics through real classification traffic

mod support;

use std::sync::Arc;
use std::time::Duration;
use support::{builder_with_clock, desc, jpeg};
use wildlife_id::providers::{ProviderErrorKind, ScriptedProvider};
use wildlife_id::resilience::{HealthConfig, HealthRegistry, ManualClock};
use wildlife_id::telemetry::{MetricsRecorder, ProviderStatus};

#[test]
fn test_success_rate_is_exact() {
    let recorder = MetricsRecorder::new();
    recorder.register("idle");
    for (success, confidence) in [(true, 0.9), (false, 0.0), (true, 0.7), (false, 0.0), (true, 0.5)] {
        recorder.record("busy", success, confidence);
    }
    let health = HealthRegistry::new(HealthConfig::new());
    let summary = recorder.summary(&health);

    let busy = &summary["busy"];
    assert_eq!(busy.calls, 5);
    assert_eq!(busy.success_rate, 3.0 / 5.0 * 100.0);

    let idle = &summary["idle"];
    assert_eq!(idle.calls, 0);
    assert_eq!(idle.success_rate, 0.0);
    assert!(!idle.success_rate.is_nan());
    assert!(idle.last_used.is_none());
}

#[test]
fn test_running_average_halves_toward_latest() {
    let recorder = MetricsRecorder::new();
    recorder.record("p", true, 0.8);
    assert!((recorder.get("p").unwrap().running_average_confidence - 0.4).abs() < 1e-12);
    recorder.record("p", true, 0.6);
    assert!((recorder.get("p").unwrap().running_average_confidence - 0.5).abs() < 1e-12);
    // failures leave the average alone
    recorder.record("p", false, 0.0);
    assert!((recorder.get("p").unwrap().running_average_confidence - 0.5).abs() < 1e-12);
}

#[tokio::test]
async fn test_summary_after_traffic() {
    let (builder, clock) = builder_with_clock();
    let classifier = builder
        .provider(
            desc("vision", 1, 0.75, 0.3),
            ScriptedProvider::succeeding("vision", "Elk", 0.8)
                .then_fail(ProviderErrorKind::RateLimited),
        )
        .provider(desc("inat", 2, 0.65, 0.25), ScriptedProvider::succeeding("inat", "Elk", 0.7))
        .provider(desc("mobilenet", 3, 0.6, 0.15), ScriptedProvider::new("mobilenet"))
        .build()
        .unwrap();

    // vision fails, inat answers
    classifier.classify(&jpeg()).await.unwrap();
    // vision excluded, inat answers
    classifier.classify(&jpeg()).await.unwrap();
    clock.advance(Duration::from_secs(301));
    // vision back and confident
    classifier.classify(&jpeg()).await.unwrap();

    let summary = classifier.metrics_summary();
    let vision = &summary["vision"];
    assert_eq!(vision.calls, 2);
    assert_eq!(vision.success_rate, 50.0);
    assert!((vision.avg_confidence - 0.4).abs() < 1e-12);
    assert_eq!(vision.status, ProviderStatus::Active);
    assert!(vision.last_used.is_some());

    let inat = &summary["inat"];
    assert_eq!(inat.calls, 2);
    assert_eq!(inat.success_rate, 100.0);
    assert!((inat.avg_confidence - 0.525).abs() < 1e-12);

    let mobilenet = &summary["mobilenet"];
    assert_eq!(mobilenet.calls, 0);
    assert_eq!(mobilenet.success_rate, 0.0);
}

#[tokio::test]
async fn test_status_reflects_exclusion() {
    let clock = Arc::new(ManualClock::new());
    let classifier = wildlife_id::Classifier::builder()
        .clock(clock.clone())
        .provider(
            desc("down", 1, 0.7, 0.3),
            ScriptedProvider::failing("down", ProviderErrorKind::Unavailable),
        )
        .build()
        .unwrap();
    classifier.classify(&jpeg()).await.unwrap();

    let json = serde_json::to_value(classifier.metrics_summary()).unwrap();
    assert_eq!(json["down"]["status"], "excluded");
    assert_eq!(json["down"]["successRate"], 0.0);
    assert_eq!(json["down"]["calls"], 1);
    assert!(json["down"].get("avgConfidence").is_some());
}

#[tokio::test]
async fn test_concurrent_updates_are_not_lost() {
    let recorder = Arc::new(MetricsRecorder::new());
    let mut tasks = Vec::new();
    for i in 0..8 {
        let r = recorder.clone();
        tasks.push(tokio::spawn(async move {
            for _ in 0..250 {
                r.record("shared", i % 2 == 0, 0.5);
            }
        }));
    }
    for t in tasks {
        t.await.unwrap();
    }
    let m = recorder.get("shared").unwrap();
    assert_eq!(m.calls, 2000);
    assert_eq!(m.successes, 1000);
    assert_eq!(m.success_rate(), 50.0);
}

//! HTTP adapters against mock vendor servers

mod support;

use mockito::{Matcher, Server};
use std::time::Duration;
use support::{desc, jpeg};
use url::Url;
use wildlife_id::providers::{
    ClassificationProvider, HttpProvider, HttpProviderConfig, ProviderErrorKind, ProviderKind,
};
use wildlife_id::{Classifier, ClassificationPath, ResultSource};

fn provider(name: &str, kind: ProviderKind, url: String) -> HttpProvider {
    let cfg = HttpProviderConfig::new(name, kind, Url::parse(&url).unwrap())
        .with_timeout(Duration::from_secs(5));
    HttpProvider::new(cfg).unwrap()
}

#[tokio::test]
async fn test_vision_request_and_normalization() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/images:annotate")
        .match_header("authorization", "Bearer vision-key")
        .match_body(Matcher::Regex(r#""type":"LABEL_DETECTION""#.to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"responses":[{"labelAnnotations":[
                {"description":"Wildlife","score":0.98},
                {"description":"Snow leopard","score":0.87}
            ]}]}"#,
        )
        .create_async()
        .await;

    let cfg = HttpProviderConfig::new(
        "google-vision",
        ProviderKind::Vision,
        Url::parse(&format!("{}/v1/images:annotate", server.url())).unwrap(),
    )
    .with_api_key("vision-key");
    let vision = HttpProvider::new(cfg).unwrap();

    let outcome = vision.classify(&jpeg()).await.unwrap();
    assert_eq!(outcome.label, "Snow leopard");
    assert_eq!(outcome.confidence, 0.87);
    assert_eq!(outcome.source_provider_name, "google-vision");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_taxonomy_uses_multipart() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/computervision/score_image")
        .match_header(
            "content-type",
            Matcher::Regex("multipart/form-data; boundary=.*".to_string()),
        )
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"results":[{"combined_score":77.0,"taxon":{
                "name":"Ursus arctos","preferred_common_name":"Brown Bear","rank":"species",
                "ancestors":[{"rank":"family","name":"Ursidae"},{"rank":"genus","name":"Ursus"}]
            }}]}"#,
        )
        .create_async()
        .await;

    let inat = provider(
        "inaturalist",
        ProviderKind::Taxonomy,
        format!("{}/v1/computervision/score_image", server.url()),
    );
    let outcome = inat.classify(&jpeg().with_file_name("bear.jpg")).await.unwrap();
    assert_eq!(outcome.label, "Brown Bear");
    assert_eq!(outcome.scientific_name.as_deref(), Some("Ursus arctos"));
    assert_eq!(outcome.taxonomy().unwrap().family, "Ursidae");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_error_statuses_map_to_kinds() {
    let mut server = Server::new_async().await;
    for (path, status, kind) in [
        ("/auth", 401, ProviderErrorKind::Authentication),
        ("/quota", 402, ProviderErrorKind::QuotaExceeded),
        ("/limited", 429, ProviderErrorKind::RateLimited),
        ("/down", 503, ProviderErrorKind::Unavailable),
    ] {
        server
            .mock("POST", path)
            .with_status(status)
            .with_body("nope")
            .create_async()
            .await;
        let p = provider("rek", ProviderKind::Rekognition, format!("{}{}", server.url(), path));
        let err = p.classify(&jpeg()).await.unwrap_err();
        assert_eq!(err.kind, kind, "status {}", status);
        assert_eq!(err.status, Some(status as u16));
        assert_eq!(err.provider, "rek");
    }
}

#[tokio::test]
async fn test_unusable_body_is_invalid_response() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/garbage")
        .with_status(200)
        .with_body("<html>maintenance</html>")
        .create_async()
        .await;
    server
        .mock("POST", "/empty")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"Labels":[]}"#)
        .create_async()
        .await;

    for path in ["/garbage", "/empty"] {
        let p = provider("rek", ProviderKind::Rekognition, format!("{}{}", server.url(), path));
        let err = p.classify(&jpeg()).await.unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::InvalidResponse, "{path}");
    }
}

#[tokio::test]
async fn test_unreachable_host_is_network_error() {
    let p = provider("vision", ProviderKind::Vision, "http://127.0.0.1:9/annotate".to_string());
    let err = p.classify(&jpeg()).await.unwrap_err();
    assert!(
        matches!(err.kind, ProviderErrorKind::Network | ProviderErrorKind::Timeout),
        "{err}"
    );
}

#[tokio::test]
async fn test_classifier_fails_over_between_http_providers() {
    let mut server = Server::new_async().await;
    let vision_mock = server
        .mock("POST", "/vision")
        .with_status(500)
        .with_body("internal error")
        .expect(1)
        .create_async()
        .await;
    let rek_mock = server
        .mock("POST", "/rekognition")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"Labels":[{"Name":"Animal","Confidence":99.0},{"Name":"Zebra","Confidence":93.5}]}"#)
        .expect(2)
        .create_async()
        .await;

    let classifier = Classifier::builder()
        .provider(
            desc("google-vision", 1, 0.75, 0.3),
            provider("google-vision", ProviderKind::Vision, format!("{}/vision", server.url())),
        )
        .provider(
            desc("aws-rekognition", 2, 0.70, 0.3),
            provider("aws-rekognition", ProviderKind::Rekognition, format!("{}/rekognition", server.url())),
        )
        .build()
        .unwrap();

    let report = classifier.classify_detailed(&jpeg()).await.unwrap();
    assert_eq!(report.result.label, "Zebra");
    assert!((report.result.confidence - 0.935).abs() < 1e-12);
    assert_eq!(report.result.source, ResultSource::Provider("aws-rekognition".into()));
    assert_eq!(
        report.path,
        ClassificationPath::ShortCircuit {
            provider: "aws-rekognition".into()
        }
    );

    // vision is excluded now and not called again
    classifier.classify(&jpeg()).await.unwrap();
    assert_eq!(classifier.failed_providers(), vec!["google-vision"]);
    vision_mock.assert_async().await;
    rek_mock.assert_async().await;
}

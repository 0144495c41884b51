use review_harvest::config::{Environment, NotifyConfig};
use review_harvest::notify::{notifier_from_config, Notifier, SlackWebhook};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_webhook_posts_text_and_channel() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hooks/reviews"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let hook = SlackWebhook::new(
        format!("{}/hooks/reviews", mock_server.uri()),
        Some("#reviews".to_string()),
    );
    hook.notify("🔄: Starting reviews daily scraper").await;

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(
        body,
        json!({ "text": "🔄: Starting reviews daily scraper", "channel": "#reviews" })
    );
}

#[tokio::test]
async fn test_webhook_failure_is_swallowed() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let hook = SlackWebhook::new(mock_server.uri(), None);
    hook.notify("❌: Abort id: 24: https://maps.example.com/place/24.")
        .await;
}

#[tokio::test]
async fn test_production_config_posts_to_webhook() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let notifier = notifier_from_config(&NotifyConfig {
        webhook_url: Some(mock_server.uri()),
        channel: None,
        environment: Environment::Production,
    });
    notifier.notify("hello").await;
}

#[tokio::test]
async fn test_development_config_never_posts() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let notifier = notifier_from_config(&NotifyConfig {
        webhook_url: Some(mock_server.uri()),
        channel: None,
        environment: Environment::Development,
    });
    notifier.notify("hello").await;
}

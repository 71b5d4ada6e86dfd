use crate::channels::{ChannelError, OutboundChannel, TelegramChannel, WhatsAppGateway};
use crate::config::WhatsAppConfig;
use uuid::Uuid;

fn gateway_for(url: &str) -> WhatsAppGateway {
    WhatsAppGateway::new(&WhatsAppConfig {
        base_url: url.to_string(),
        api_token: "test-token".to_string(),
    })
}

#[tokio::test]
async fn send_posts_to_gateway() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/send/message")
        .match_header("authorization", "Bearer test-token")
        .match_body(mockito::Matcher::PartialJson(serde_json::json!({
            "to": "123@g.us",
            "text": "7416281 refill",
        })))
        .with_status(200)
        .with_body(r#"{"sent":true}"#)
        .create_async()
        .await;

    let gateway = gateway_for(&server.url());
    gateway
        .send(Some(Uuid::new_v4()), "123@g.us", "7416281 refill")
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn send_without_device_fails_before_any_request() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/send/message")
        .expect(0)
        .create_async()
        .await;

    let gateway = gateway_for(&server.url());
    let err = gateway.send(None, "123@g.us", "hello").await.unwrap_err();
    match err {
        ChannelError::Request(message) => assert!(message.contains("no sending device")),
        other => panic!("expected Request error, got {:?}", other),
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn send_surfaces_gateway_errors() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/send/message")
        .with_status(502)
        .with_body("device disconnected")
        .create_async()
        .await;

    let gateway = gateway_for(&server.url());
    let err = gateway
        .send(Some(Uuid::new_v4()), "123@g.us", "hello")
        .await
        .unwrap_err();
    match err {
        ChannelError::Status { status, body } => {
            assert_eq!(status, 502);
            assert!(body.contains("device disconnected"));
        }
        other => panic!("expected Status error, got {:?}", other),
    }
}

#[tokio::test]
async fn list_groups_parses_gateway_payload() {
    let mut server = mockito::Server::new_async().await;
    let device_id = Uuid::new_v4();
    server
        .mock("GET", format!("/devices/{}/groups", device_id).as_str())
        .with_status(200)
        .with_body(r#"{"groups":[{"jid":"123@g.us","subject":"Provider Support"}]}"#)
        .create_async()
        .await;

    let gateway = gateway_for(&server.url());
    let groups = gateway.list_groups(device_id).await.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].jid, "123@g.us");
    assert_eq!(groups[0].name, "Provider Support");
}

#[tokio::test]
async fn telegram_reports_unsupported() {
    let telegram = TelegramChannel::new();
    let err = telegram.send(None, "-1001234", "hello").await.unwrap_err();
    assert!(matches!(err, ChannelError::Unsupported("telegram")));
}

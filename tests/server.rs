//! Webhook Endpoint Integration Tests
//!
//! Drives the axum app over a local socket: batch dispatch to the router,
//! the event-failure-to-500 mapping, and the liveness route.

mod common;

use std::net::SocketAddr;
use std::sync::Arc;

use common::harness;
use noteflow::server::app;
use noteflow::EventRouter;
use serde_json::json;

const COMPLETION: &str = "#記事\r\n拜訪台中客戶討論新案\r\n#待辦\r\n回覆報價單";

/// Bind the app on an ephemeral port and serve it in the background.
async fn spawn_app(router: EventRouter) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app(Arc::new(router))).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn test_callback_returns_dispositions_for_a_clean_batch() {
    let h = harness(COMPLETION, "上午拜訪客戶");
    let addr = spawn_app(h.router).await;

    // A greeting the router replies to and a follow event it ignores.
    let batch = json!({
        "destination": "U_bot",
        "events": [
            {
                "type": "message",
                "replyToken": "rt-1",
                "source": { "type": "user", "userId": "U_alice" },
                "message": { "id": "m-1", "type": "text", "text": "早安" }
            },
            {
                "type": "follow",
                "replyToken": "rt-2",
                "source": { "type": "user", "userId": "U_alice" }
            }
        ]
    });

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/callback"))
        .json(&batch)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let dispositions: Vec<String> = response.json().await.unwrap();
    assert_eq!(dispositions, vec!["replied", "ignored"]);

    assert_eq!(h.messenger.reply_texts().len(), 1);
}

#[tokio::test]
async fn test_callback_maps_an_event_failure_to_500_and_keeps_sibling_effects() {
    let h = harness(COMPLETION, "上午拜訪客戶");
    let addr = spawn_app(h.router).await;

    // A handleable greeting next to a sticker the router rejects.
    let batch = json!({
        "events": [
            {
                "type": "message",
                "replyToken": "rt-ok",
                "source": { "type": "user", "userId": "U_alice" },
                "message": { "id": "m-1", "type": "text", "text": "早安" }
            },
            {
                "type": "message",
                "replyToken": "rt-bad",
                "source": { "type": "user", "userId": "U_alice" },
                "message": { "id": "m-2", "type": "sticker" }
            }
        ]
    });

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/callback"))
        .json(&batch)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);

    // The sibling was fully handled before the batch failed: its reply is
    // out and its partition exists. Nothing rolls back.
    let replies = h.messenger.reply_texts();
    assert_eq!(replies.len(), 1);
    assert!(replies[0].starts_with("Hi 讓您久等了"));
    assert_eq!(*h.store.partitions.lock().unwrap(), vec!["U_alice"]);
}

#[tokio::test]
async fn test_health_endpoint_answers_ok() {
    let h = harness(COMPLETION, "上午拜訪客戶");
    let addr = spawn_app(h.router).await;

    let response = reqwest::Client::new()
        .get(format!("http://{addr}/health"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "ok");
}

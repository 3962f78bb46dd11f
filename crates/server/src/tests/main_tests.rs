use super::*;

use std::time::Duration;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
};
use serde_json::json;
use shared::protocol::ServerEvent;
use tokio::{net::TcpListener, time::timeout};
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tower::ServiceExt;

use crate::config::Pacing;

fn test_state() -> Arc<AppState> {
    Arc::new(AppState::new(
        Pacing {
            millis_per_second: 0,
            ..Pacing::default()
        },
        64,
    ))
}

#[tokio::test]
async fn healthz_reports_ok() {
    let app = build_router(test_state());
    let request = Request::get("/healthz")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(body.as_ref(), b"ok");
}

#[tokio::test]
async fn websocket_clients_receive_broadcasts_and_malformed_commands_are_ignored() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = build_router(test_state());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let (mut socket, _) = connect_async(format!("ws://{addr}/ws"))
        .await
        .expect("connect");

    socket
        .send(WsMessage::Text("not a command".to_string()))
        .await
        .expect("send garbage");
    socket
        .send(WsMessage::Text(
            json!({ "action": "simulate_lead", "mode": "old" }).to_string(),
        ))
        .await
        .expect("send command");

    let mut kinds = Vec::new();
    loop {
        let frame = timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("frame in time")
            .expect("socket open")
            .expect("frame");
        let WsMessage::Text(text) = frame else {
            continue;
        };
        let event: ServerEvent = serde_json::from_str(&text).expect("event json");
        kinds.push(event.kind());
        if let ServerEvent::StageChange { metrics, .. } = event {
            assert_eq!(metrics.lost, 1);
            assert_eq!(metrics.revenue_lost, 2800.0);
            break;
        }
    }

    assert_eq!(kinds.first(), Some(&"new_lead"));
    assert_eq!(kinds.iter().filter(|k| **k == "message").count(), 5);
}

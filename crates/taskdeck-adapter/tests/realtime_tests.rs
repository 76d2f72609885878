/*
[INPUT]:  Local websocket server speaking the Phoenix channel protocol
[OUTPUT]: Test results for the realtime client
[POS]:    Integration tests - live change feed
[UPDATE]: When realtime client or protocol handling changes
*/

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::time::Duration;
use taskdeck_adapter::{BackendClient, BackendError, ChangeEvent, RealtimeClient, RealtimeConfig};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_test::assert_ok;
use tokio_tungstenite::{WebSocketStream, accept_async};
use tokio_tungstenite::tungstenite::Message;

fn frame(event: &str, payload: Value, reference: Option<&str>) -> Message {
    Message::Text(
        json!({
            "topic": "realtime:tasks",
            "event": event,
            "payload": payload,
            "ref": reference
        })
        .to_string()
        .into(),
    )
}

fn change(kind: &str, record: Value, old_record: Value) -> Message {
    frame(
        "postgres_changes",
        json!({
            "ids": [1],
            "data": {
                "schema": "public",
                "table": "tasks",
                "commit_timestamp": "2024-05-01T10:00:00Z",
                "type": kind,
                "record": record,
                "old_record": old_record
            }
        }),
        None,
    )
}

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let base = format!("http://{}", listener.local_addr().expect("addr"));
    (listener, base)
}

/// Accept one connection and answer its join frame with `status`
async fn accept_join(listener: TcpListener, status: &str) -> WebSocketStream<TcpStream> {
    let (stream, _) = listener.accept().await.expect("accept");
    let mut ws = accept_async(stream).await.expect("handshake");
    let join = match ws.next().await {
        Some(Ok(Message::Text(text))) => serde_json::from_str::<Value>(&text).expect("json"),
        other => panic!("expected join frame, got {other:?}"),
    };
    let join_ref = join["ref"].as_str().unwrap_or_default().to_string();
    ws.send(frame(
        "phx_reply",
        json!({"status": status, "response": {"reason": "denied"}}),
        Some(&join_ref),
    ))
    .await
    .unwrap();
    ws
}

#[tokio::test]
async fn test_subscription_joins_and_delivers_changes() {
    let (listener, base) = bind().await;
    let (joined_tx, joined_rx) = oneshot::channel::<Value>();
    let (closed_tx, closed_rx) = oneshot::channel::<Vec<String>>();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let mut ws = accept_async(stream).await.expect("handshake");

        let join = match ws.next().await {
            Some(Ok(Message::Text(text))) => serde_json::from_str::<Value>(&text).expect("json"),
            other => panic!("expected join frame, got {other:?}"),
        };
        let join_ref = join["ref"].as_str().unwrap_or_default().to_string();
        let _ = joined_tx.send(join);

        ws.send(frame("phx_reply", json!({"status": "ok", "response": {}}), Some(&join_ref)))
            .await
            .unwrap();
        ws.send(frame("system", json!({"status": "ok", "message": "Subscribed"}), None))
            .await
            .unwrap();
        ws.send(change(
            "INSERT",
            json!({"id": 6, "title": "a", "description": "b", "email": "e", "image_url": null}),
            json!({}),
        ))
        .await
        .unwrap();
        ws.send(change("UPDATE", json!({"id": "oops"}), json!({}))).await.unwrap();
        ws.send(change("DELETE", json!({}), json!({"id": 5}))).await.unwrap();

        let mut seen = Vec::new();
        while let Some(Ok(message)) = ws.next().await {
            match message {
                Message::Text(text) => {
                    let value: Value = serde_json::from_str(&text).unwrap_or_default();
                    seen.push(value["event"].as_str().unwrap_or_default().to_string());
                }
                Message::Close(_) => {
                    seen.push("close".to_string());
                    break;
                }
                _ => {}
            }
        }
        let _ = closed_tx.send(seen);
    });

    let client = assert_ok!(BackendClient::new(&base, "anon"));
    let realtime = RealtimeClient::new(client);
    let mut subscription = assert_ok!(realtime.subscribe("tasks").await);

    let join = joined_rx.await.expect("join frame");
    assert_eq!(join["topic"], "realtime:tasks");
    assert_eq!(join["event"], "phx_join");
    assert_eq!(join["payload"]["access_token"], "anon");
    assert_eq!(join["payload"]["config"]["postgres_changes"][0]["event"], "*");

    let first = tokio::time::timeout(Duration::from_secs(5), subscription.recv())
        .await
        .expect("insert in time");
    assert!(matches!(first, Some(ChangeEvent::Insert(ref task)) if task.id == 6));

    // The malformed UPDATE is dropped, not delivered.
    let second = tokio::time::timeout(Duration::from_secs(5), subscription.recv())
        .await
        .expect("delete in time");
    assert_eq!(second, Some(ChangeEvent::Delete { id: 5 }));

    assert_ok!(subscription.close().await);
    let seen = tokio::time::timeout(Duration::from_secs(5), closed_rx)
        .await
        .expect("server saw close")
        .expect("server result");
    assert_eq!(seen, vec!["phx_leave".to_string(), "close".to_string()]);
}

#[tokio::test]
async fn test_dropping_subscription_closes_socket() {
    let (listener, base) = bind().await;
    let (closed_tx, closed_rx) = oneshot::channel::<bool>();

    tokio::spawn(async move {
        let mut ws = accept_join(listener, "ok").await;
        let mut closed = false;
        while let Some(Ok(message)) = ws.next().await {
            if let Message::Close(_) = message {
                closed = true;
                break;
            }
        }
        let _ = closed_tx.send(closed);
    });

    let client = assert_ok!(BackendClient::new(&base, "anon"));
    let subscription = assert_ok!(RealtimeClient::new(client).subscribe("tasks").await);
    drop(subscription);

    let closed = tokio::time::timeout(Duration::from_secs(5), closed_rx)
        .await
        .expect("server finished")
        .expect("server result");
    assert!(closed);
}

#[tokio::test]
async fn test_heartbeat_is_sent() {
    let (listener, base) = bind().await;
    let (beat_tx, beat_rx) = oneshot::channel::<Value>();

    tokio::spawn(async move {
        let mut ws = accept_join(listener, "ok").await;
        let mut beat_tx = Some(beat_tx);
        while let Some(Ok(message)) = ws.next().await {
            if let Message::Text(text) = message {
                let value: Value = serde_json::from_str(&text).unwrap_or_default();
                if value["event"] == "heartbeat"
                    && let Some(tx) = beat_tx.take()
                {
                    let _ = tx.send(value);
                }
            }
        }
    });

    let client = assert_ok!(BackendClient::new(&base, "anon"));
    let config = RealtimeConfig {
        heartbeat_interval: Duration::from_millis(50),
        channel_capacity: 8,
        join_timeout: Duration::from_secs(5),
    };
    let _subscription = assert_ok!(RealtimeClient::with_config(client, config).subscribe("tasks").await);

    let beat = tokio::time::timeout(Duration::from_secs(5), beat_rx)
        .await
        .expect("heartbeat in time")
        .expect("heartbeat frame");
    assert_eq!(beat["topic"], "phoenix");
}

#[tokio::test]
async fn test_rejected_join_fails_and_closes_socket() {
    let (listener, base) = bind().await;
    let (closed_tx, closed_rx) = oneshot::channel::<bool>();

    tokio::spawn(async move {
        let mut ws = accept_join(listener, "error").await;
        let mut closed = false;
        while let Some(Ok(message)) = ws.next().await {
            if let Message::Close(_) = message {
                closed = true;
                break;
            }
        }
        let _ = closed_tx.send(closed);
    });

    let client = assert_ok!(BackendClient::new(&base, "anon"));
    let result = tokio::time::timeout(Duration::from_secs(5), RealtimeClient::new(client).subscribe("tasks"))
        .await
        .expect("subscribe returns");
    match result {
        Err(BackendError::WebSocket(message)) => assert!(message.contains("rejected"), "{message}"),
        other => panic!("expected rejected join, got {other:?}"),
    }

    let closed = tokio::time::timeout(Duration::from_secs(5), closed_rx)
        .await
        .expect("server finished")
        .expect("server result");
    assert!(closed);
}

#[tokio::test]
async fn test_unanswered_join_times_out() {
    let (listener, base) = bind().await;

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let mut ws = accept_async(stream).await.expect("handshake");
        while let Some(Ok(_)) = ws.next().await {}
    });

    let client = assert_ok!(BackendClient::new(&base, "anon"));
    let config = RealtimeConfig {
        join_timeout: Duration::from_millis(100),
        ..RealtimeConfig::default()
    };
    let result = RealtimeClient::with_config(client, config).subscribe("tasks").await;
    assert!(matches!(result, Err(BackendError::WebSocket(ref message)) if message.contains("timed out")));
}

//! End-to-end tests over real sockets.

use futures_util::{SinkExt, StreamExt};
use relay_protocol::{Envelope, EnvelopeKind, WELCOME_TEXT};
use relay_server::{Config, HealthResponse, Server};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

struct Running {
    ws: SocketAddr,
    http: SocketAddr,
}

fn local_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        ws_port: 0,
        http_port: 0,
    }
}

async fn start() -> Running {
    let server = Server::bind(&local_config()).await.unwrap();
    let running = Running {
        ws: server.ws_addr().unwrap(),
        http: server.http_addr().unwrap(),
    };
    tokio::spawn(server.serve());
    running
}

async fn connect(server: &Running) -> Client {
    let (mut client, _) = timeout(WAIT, connect_async(format!("ws://{}", server.ws)))
        .await
        .expect("connect timed out")
        .unwrap();

    let welcome = next_envelope(&mut client).await;
    assert_eq!(welcome.kind, EnvelopeKind::Welcome);
    assert_eq!(welcome.data, WELCOME_TEXT);
    client
}

async fn next_envelope(client: &mut Client) -> Envelope {
    loop {
        let frame = timeout(WAIT, client.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn send(client: &mut Client, text: &str) {
    client.send(Message::Text(text.to_string())).await.unwrap();
}

async fn health(server: &Running) -> HealthResponse {
    reqwest::get(format!("http://{}/health", server.http))
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

async fn wait_for_clients(server: &Running, expected: usize) {
    timeout(WAIT, async {
        while health(server).await.clients != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("client count never settled");
}

fn assert_utc_millis(timestamp: &str) {
    assert_eq!(timestamp.len(), "2024-05-01T12:00:00.123Z".len());
    assert!(timestamp.ends_with('Z'));
    chrono::DateTime::parse_from_rfc3339(timestamp).unwrap();
}

#[tokio::test]
async fn test_two_clients_exchange_messages() {
    let server = start().await;
    assert_eq!(
        health(&server).await,
        HealthResponse {
            status: "ok".to_string(),
            clients: 0
        }
    );

    let mut a = connect(&server).await;
    let mut b = connect(&server).await;
    assert_eq!(health(&server).await.clients, 2);

    send(&mut a, r#"{"message":"hello"}"#).await;

    for client in [&mut a, &mut b] {
        let envelope = next_envelope(client).await;
        assert_eq!(envelope.kind, EnvelopeKind::Message);
        assert_eq!(envelope.data, "hello");
        assert_utc_millis(&envelope.timestamp);
    }

    b.close(None).await.unwrap();
    wait_for_clients(&server, 1).await;
}

#[tokio::test]
async fn test_malformed_message_dropped_connection_kept() {
    let server = start().await;
    let mut a = connect(&server).await;
    let mut b = connect(&server).await;

    send(&mut a, "not json").await;
    send(&mut a, r#"["message","array"]"#).await;
    send(&mut a, r#"{"text":"wrong field"}"#).await;
    a.send(Message::Binary(vec![1, 2, 3])).await.unwrap();
    send(&mut a, r#"{"message":"still here"}"#).await;

    assert_eq!(next_envelope(&mut a).await.data, "still here");
    assert_eq!(next_envelope(&mut b).await.data, "still here");
    assert_eq!(health(&server).await.clients, 2);
}

#[tokio::test]
async fn test_sender_receives_own_message() {
    let server = start().await;
    let mut solo = connect(&server).await;

    send(&mut solo, r#"{"message":"echo","extra":true}"#).await;
    let envelope = next_envelope(&mut solo).await;
    assert_eq!(envelope.kind, EnvelopeKind::Message);
    assert_eq!(envelope.data, "echo");
}

#[tokio::test]
async fn test_messages_arrive_in_send_order() {
    let server = start().await;
    let mut a = connect(&server).await;
    let mut b = connect(&server).await;

    for i in 0..20 {
        send(&mut a, &format!(r#"{{"message":"m{i}"}}"#)).await;
    }

    for client in [&mut a, &mut b] {
        for i in 0..20 {
            assert_eq!(next_envelope(client).await.data, format!("m{i}"));
        }
    }
}

#[tokio::test]
async fn test_disconnect_is_not_fatal_to_others() {
    let server = start().await;
    let mut a = connect(&server).await;
    let b = connect(&server).await;
    wait_for_clients(&server, 2).await;

    // Abrupt drop without a close handshake.
    drop(b);
    wait_for_clients(&server, 1).await;

    send(&mut a, r#"{"message":"after drop"}"#).await;
    assert_eq!(next_envelope(&mut a).await.data, "after drop");
}

#[tokio::test]
async fn test_client_close_gets_close_reply() {
    let server = start().await;
    let mut client = connect(&server).await;

    client.send(Message::Close(None)).await.unwrap();

    let reply = timeout(WAIT, client.next())
        .await
        .expect("timed out waiting for close reply");
    match reply {
        Some(Ok(Message::Close(_))) | None => {}
        other => panic!("expected a close reply, got {:?}", other),
    }

    wait_for_clients(&server, 0).await;
}

#[tokio::test]
async fn test_health_allows_cross_origin() {
    let server = start().await;
    let response = reqwest::Client::new()
        .get(format!("http://{}/health", server.http))
        .header("Origin", "http://example.com")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
    assert_eq!(
        response.text().await.unwrap(),
        r#"{"status":"ok","clients":0}"#
    );
}

#[tokio::test]
async fn test_unknown_route_not_found() {
    let server = start().await;
    let response = reqwest::get(format!("http://{}/nope", server.http))
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bind_conflict_is_an_error() {
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = Config {
        ws_port: taken.local_addr().unwrap().port(),
        ..local_config()
    };

    assert!(Server::bind(&config).await.is_err());
}

#[tokio::test]
async fn test_same_port_rejected() {
    let config = Config {
        ws_port: 9555,
        http_port: 9555,
        ..local_config()
    };

    assert!(Server::bind(&config).await.is_err());
}

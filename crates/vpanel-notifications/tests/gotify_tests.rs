use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use vpanel_notifications::{
    dispatch, GotifyClient, GotifyConfig, Notifier, NotifyError, GOTIFY_KEY_HEADER,
};

type Seen = Arc<Mutex<Vec<(String, Value)>>>;

async fn receive(
    State(seen): State<Seen>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    let key = headers
        .get(GOTIFY_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let status = if key == "bad-key" { StatusCode::UNAUTHORIZED } else { StatusCode::OK };
    seen.lock().unwrap().push((key, body));
    status
}

async fn serve() -> (String, Seen) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new().route("/message", post(receive)).with_state(seen.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), seen)
}

fn config(server: String, keys: &[&str]) -> GotifyConfig {
    GotifyConfig {
        enabled: true,
        server,
        api_keys: keys.iter().map(|k| k.to_string()).collect(),
        priority: 7,
        timeout_secs: 5,
    }
}

#[tokio::test]
async fn one_message_per_key() {
    let (server, seen) = serve().await;
    let client = GotifyClient::new(&config(server, &["key-a", "key-b"])).unwrap();
    client.notify("vmess created", "valid before (2025-12-31) vpn-de-1b42").await.unwrap();

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].0, "key-a");
    assert_eq!(seen[1].0, "key-b");
    assert_eq!(seen[0].1["title"], "vmess created");
    assert_eq!(seen[0].1["message"], "valid before (2025-12-31) vpn-de-1b42");
    assert_eq!(seen[0].1["priority"], 7);
}

#[tokio::test]
async fn failing_key_does_not_stop_others() {
    let (server, seen) = serve().await;
    let client = GotifyClient::new(&config(server, &["bad-key", "key-b"])).unwrap();
    let err = client.notify("t", "m").await.unwrap_err();
    assert!(matches!(err, NotifyError::Partial { failed: 1, total: 2 }));
    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn dispatch_delivers_in_background() {
    let (server, seen) = serve().await;
    let client = Arc::new(GotifyClient::new(&config(server, &["key-a"])).unwrap());
    dispatch(client, "shadowsocks deleted".into(), "****c123".into()).await.unwrap();
    assert_eq!(seen.lock().unwrap()[0].1["title"], "shadowsocks deleted");
}

#[tokio::test]
async fn unreachable_server_is_logged_not_raised() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let server = format!("http://{}", addr);
    let client = Arc::new(GotifyClient::new(&config(server, &["key-a"])).unwrap());
    assert!(client.notify("t", "m").await.is_err());
    dispatch(client, "t".into(), "m".into()).await.unwrap();
}

//! End-to-end calls through `HttpTransport` against a local axum server.

use axum::{
    extract::Query,
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, TimeZone, Utc};
use endpoint_client::cards::{cards_named, CardList};
use endpoint_client::{
    main_context, ClientConfig, Endpoint, EndpointClient, EndpointClientError, HttpMethod,
    ServerError,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

fn app() -> Router {
    Router::new()
        .route("/v1/cards", get(list_cards))
        .route("/v1/broken", get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }))
        .route("/v1/missing", get(|| async { (StatusCode::NOT_FOUND, "card not found") }))
        .route("/v1/gone", get(|| async { StatusCode::GONE }))
        .route("/v1/created", get(|| async { (StatusCode::CREATED, Json(json!({"name": "Mox Pearl"}))) }))
        .route("/v1/slow", get(slow))
        .route("/v1/dated", get(dated))
        .route("/v1/decks", post(echo_deck).put(|| async { StatusCode::OK }))
}

async fn list_cards(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let name = params.get("name").cloned().unwrap_or_default();
    Json(json!({"cards": [{"name": name, "set": "LEA", "type": "Artifact"}]}))
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(3)).await;
    Json(json!({"name": "Time Walk"}))
}

async fn dated() -> Json<Value> {
    Json(json!({"name": "Alpha", "released_at": "1993-08-05 00:00:00+0000"}))
}

async fn echo_deck(headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    Json(json!({"content_type": content_type, "received": body}))
}

async fn start_server() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app()).await.unwrap() });
    addr
}

fn client_for(addr: SocketAddr) -> EndpointClient {
    EndpointClient::new(ClientConfig::new(format!("http://{addr}"))).unwrap()
}

/// Server that answers every request with a 200 status line and a body
/// that stops short of its declared length.
async fn start_stalling_server() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut request = [0u8; 1024];
                let _ = socket.read(&mut request).await;
                let head = "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 100\r\n\r\n{\"na";
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.flush().await;
                tokio::time::sleep(Duration::from_secs(5)).await;
            });
        }
    });
    addr
}

/// Address with nothing listening on it.
fn refused_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

#[derive(Debug, Deserialize, PartialEq)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Release {
    name: String,
    #[serde(with = "endpoint_client::web_date")]
    released_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct DeckEcho {
    content_type: String,
    received: Value,
}

#[tokio::test]
async fn status_200_decodes_payload() {
    let client = client_for(start_server().await);
    let completion = client.execute_typed(&cards_named("Black Lotus")).await;

    let response = completion.response.as_ref().unwrap();
    assert_eq!(response.status, reqwest::StatusCode::OK);
    assert!(response.headers.contains_key(reqwest::header::CONTENT_TYPE));

    let list: CardList = completion.into_result().unwrap();
    assert_eq!(list.cards.len(), 1);
    assert_eq!(list.cards[0].name, "Black Lotus");
    assert_eq!(list.cards[0].set.as_deref(), Some("LEA"));
}

#[tokio::test]
async fn status_500_is_server_fail() {
    let client = client_for(start_server().await);
    let completion = client
        .execute_typed(&Endpoint::<Named>::typed(HttpMethod::Get, "/v1/broken"))
        .await;
    assert_eq!(
        completion.result,
        Err(EndpointClientError::Server(ServerError::ServerFail))
    );

    let result = client
        .execute_empty(&Endpoint::empty(HttpMethod::Get, "/v1/broken"))
        .await;
    assert_eq!(result, Err(EndpointClientError::Server(ServerError::ServerFail)));
}

#[tokio::test]
async fn other_status_with_body_is_invalid_request() {
    let client = client_for(start_server().await);
    let result = client
        .execute_empty(&Endpoint::empty(HttpMethod::Get, "/v1/missing"))
        .await;
    assert_eq!(
        result,
        Err(EndpointClientError::Server(ServerError::InvalidRequest {
            code: 404,
            message: "card not found".into()
        }))
    );
}

#[tokio::test]
async fn other_status_without_body_is_server_fail() {
    let client = client_for(start_server().await);
    let result = client
        .execute_empty(&Endpoint::empty(HttpMethod::Get, "/v1/gone"))
        .await;
    assert_eq!(result, Err(EndpointClientError::Server(ServerError::ServerFail)));
}

#[tokio::test]
async fn non_200_success_status_is_not_success() {
    let client = client_for(start_server().await);
    let completion = client
        .execute_typed(&Endpoint::<Named>::typed(HttpMethod::Get, "/v1/created"))
        .await;
    assert!(matches!(
        completion.result,
        Err(EndpointClientError::Server(ServerError::InvalidRequest { code: 201, .. }))
    ));
}

#[tokio::test]
async fn mismatched_payload_is_parsing_error() {
    let client = client_for(start_server().await);
    let completion = client
        .execute_typed(&Endpoint::<Named>::typed(HttpMethod::Get, "/v1/cards"))
        .await;
    assert_eq!(completion.result, Err(EndpointClientError::ParsingError));
    assert!(completion.response.is_some());
}

#[tokio::test]
async fn dates_decode_with_web_api_format() {
    let client = client_for(start_server().await);
    let release = client
        .execute_typed(&Endpoint::<Release>::typed(HttpMethod::Get, "/v1/dated"))
        .await
        .into_result()
        .unwrap();
    assert_eq!(release.name, "Alpha");
    assert_eq!(release.released_at, Utc.with_ymd_and_hms(1993, 8, 5, 0, 0, 0).unwrap());
}

#[tokio::test]
async fn post_sends_json_parameters() {
    let client = client_for(start_server().await);
    let endpoint = Endpoint::<DeckEcho>::typed(HttpMethod::Post, "/v1/decks")
        .parameter("name", "Power Nine")
        .parameter("cards", ["Black Lotus", "Ancestral Recall"]);
    let echo = client.execute_typed(&endpoint).await.into_result().unwrap();
    assert_eq!(echo.content_type, "application/json");
    assert_eq!(
        echo.received,
        json!({"name": "Power Nine", "cards": ["Black Lotus", "Ancestral Recall"]})
    );
}

#[tokio::test]
async fn put_without_payload_succeeds() {
    let client = client_for(start_server().await);
    let result = client
        .execute_empty(&Endpoint::empty(HttpMethod::Put, "/v1/decks"))
        .await;
    assert_eq!(result, Ok(()));
}

#[tokio::test]
async fn connection_refused_is_network_problem() {
    let client = client_for(refused_addr());
    let result = client
        .execute_empty(&Endpoint::empty(HttpMethod::Get, "/v1/cards"))
        .await;
    assert_eq!(result, Err(EndpointClientError::Server(ServerError::NetworkProblem)));
}

#[tokio::test]
async fn custom_timeout_waits_for_connectivity_then_fails() {
    let client = client_for(refused_addr());
    let started = Instant::now();
    let result = client
        .execute_empty(
            &Endpoint::empty(HttpMethod::Get, "/v1/cards").timeout(Duration::from_millis(1500)),
        )
        .await;
    assert_eq!(result, Err(EndpointClientError::Server(ServerError::NetworkProblem)));
    assert!(started.elapsed() >= Duration::from_millis(900));
}

#[tokio::test]
async fn expired_timeout_is_network_problem() {
    let client = client_for(start_server().await);
    let started = Instant::now();
    let completion = client
        .execute_typed(
            &Endpoint::<Named>::typed(HttpMethod::Get, "/v1/slow").timeout(Duration::from_millis(300)),
        )
        .await;
    assert_eq!(
        completion.result,
        Err(EndpointClientError::Server(ServerError::NetworkProblem))
    );
    assert!(completion.response.is_none());
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn timeout_while_reading_body_is_network_problem() {
    let client = client_for(start_stalling_server().await);
    let started = Instant::now();

    let typed = client
        .execute_typed(
            &Endpoint::<Named>::typed(HttpMethod::Get, "/v1/cards").timeout(Duration::from_millis(300)),
        )
        .await;
    assert_eq!(
        typed.result,
        Err(EndpointClientError::Server(ServerError::NetworkProblem))
    );
    assert!(typed.response.is_none());

    let empty = client
        .execute_empty(
            &Endpoint::empty(HttpMethod::Get, "/v1/cards").timeout(Duration::from_millis(300)),
        )
        .await;
    assert_eq!(
        empty,
        Err(EndpointClientError::Server(ServerError::NetworkProblem))
    );
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn callbacks_run_on_main_loop_thread() {
    let client = client_for(start_server().await);
    let main_thread = std::thread::current().id();
    let (dispatcher, mut main_loop) = main_context();

    let (tx, rx) = std::sync::mpsc::channel();
    let typed_tx = tx.clone();
    client.spawn_typed(cards_named("Mox Jet"), &dispatcher, move |completion| {
        let name = completion.into_result().map(|list| list.cards[0].name.clone());
        typed_tx.send((std::thread::current().id(), format!("{name:?}"))).unwrap();
    });
    client.spawn_empty(
        Endpoint::empty(HttpMethod::Get, "/v1/broken"),
        &dispatcher,
        move |result| {
            tx.send((std::thread::current().id(), format!("{result:?}"))).unwrap();
        },
    );

    assert!(main_loop.turn().await);
    assert!(main_loop.turn().await);

    let mut delivered: Vec<_> = rx.try_iter().collect();
    assert_eq!(delivered.len(), 2);
    assert!(delivered.iter().all(|(thread, _)| *thread == main_thread));
    delivered.sort_by(|a, b| a.1.cmp(&b.1));
    assert_eq!(delivered[0].1, r#"Err(Server(ServerFail))"#);
    assert_eq!(delivered[1].1, r#"Ok("Mox Jet")"#);
}

#[tokio::test]
async fn cancelled_call_never_calls_back() {
    let client = client_for(start_server().await);
    let (dispatcher, main_loop) = main_context();
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();

    let handle = client.spawn_typed(
        Endpoint::<Named>::typed(HttpMethod::Get, "/v1/slow"),
        &dispatcher,
        move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        },
    );
    handle.cancel();
    drop(dispatcher);

    tokio::time::timeout(Duration::from_secs(2), main_loop.run())
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

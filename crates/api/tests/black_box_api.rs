use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::json;

use stockroom_api::app::services::AppServices;
use stockroom_infra::ConcurrencyMode;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, backed by in-memory wiring, on an
        // ephemeral port.
        let services = Arc::new(AppServices::in_memory(ConcurrencyMode::default()));
        let app = stockroom_api::app::build_app_with(services);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn provision(
    client: &reqwest::Client,
    server: &TestServer,
    product_id: &str,
    warehouse_id: &str,
) -> serde_json::Value {
    let res = client
        .post(server.url("/api/v1/inventory"))
        .json(&json!({
            "product_id": product_id,
            "warehouse_id": warehouse_id,
            "owner_id": "owner-1",
            "unit_of_measure": "EACH",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json().await.unwrap()
}

async fn command(
    client: &reqwest::Client,
    server: &TestServer,
    path: &str,
    product_id: &str,
    warehouse_id: &str,
    quantity: i64,
) -> reqwest::Response {
    client
        .post(server.url(path))
        .json(&json!({
            "product_id": product_id,
            "warehouse_id": warehouse_id,
            "quantity": quantity,
            "unit_of_measure": "EACH",
        }))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn provision_receive_reserve_and_read_back() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let created = provision(&client, &server, "prod-1", "wh-1").await;
    let stock_id = created["stock_id"].as_str().unwrap().to_string();
    assert_eq!(created["on_hand"], 0);

    let res = command(&client, &server, "/api/v1/inventory/receive", "prod-1", "wh-1", 100).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["on_hand"], 100);

    let res = command(&client, &server, "/api/v1/inventory/reserve", "prod-1", "wh-1", 15).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["reserved"], 15);
    assert_eq!(body["available_to_promise"], 85);

    let res = client
        .get(server.url(&format!("/api/v1/inventory/{stock_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["stock_id"], stock_id.as_str());
    assert_eq!(body["on_hand"], 100);
    assert_eq!(body["reserved"], 15);
    assert_eq!(body["unit_of_measure"], "EACH");

    let res = client
        .get(server.url(
            "/api/v1/inventory/lookup?product_id=prod-1&warehouse_id=wh-1",
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["stock_id"], stock_id.as_str());
}

#[tokio::test]
async fn full_order_lifecycle_over_http() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    provision(&client, &server, "prod-2", "wh-1").await;
    command(&client, &server, "/api/v1/inventory/receive", "prod-2", "wh-1", 50).await;

    let res = command(&client, &server, "/api/v1/inventory/reserve", "prod-2", "wh-1", 20).await;
    assert_eq!(res.status(), StatusCode::OK);
    let res = command(&client, &server, "/api/v1/inventory/allocate", "prod-2", "wh-1", 20).await;
    assert_eq!(res.status(), StatusCode::OK);
    let res = command(&client, &server, "/api/v1/inventory/ship", "prod-2", "wh-1", 20).await;
    assert_eq!(res.status(), StatusCode::OK);

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["on_hand"], 30);
    assert_eq!(body["reserved"], 0);
    assert_eq!(body["allocated"], 0);
}

#[tokio::test]
async fn over_reservation_is_rejected_with_amounts() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    provision(&client, &server, "prod-3", "wh-1").await;
    command(&client, &server, "/api/v1/inventory/receive", "prod-3", "wh-1", 10).await;

    let res = command(&client, &server, "/api/v1/inventory/reserve", "prod-3", "wh-1", 50).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "insufficient_stock");
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("requested 50 EACH"), "message: {message}");
    assert!(message.contains("available 10 EACH"), "message: {message}");
}

#[tokio::test]
async fn shipping_unpicked_stock_is_an_invalid_transition() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    provision(&client, &server, "prod-4", "wh-1").await;
    command(&client, &server, "/api/v1/inventory/receive", "prod-4", "wh-1", 10).await;

    let res = command(&client, &server, "/api/v1/inventory/ship", "prod-4", "wh-1", 5).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_transition");
}

#[tokio::test]
async fn unknown_records_are_not_found() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = command(&client, &server, "/api/v1/inventory/reserve", "ghost", "wh-1", 1).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .get(server.url(&format!(
            "/api/v1/inventory/{}",
            uuid_like_unknown_id()
        )))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_requests_are_bad_requests() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    provision(&client, &server, "prod-5", "wh-1").await;

    // Unknown unit of measure.
    let res = client
        .post(server.url("/api/v1/inventory/reserve"))
        .json(&json!({
            "product_id": "prod-5",
            "warehouse_id": "wh-1",
            "quantity": 1,
            "unit_of_measure": "BUSHEL",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Negative quantity.
    let res = command(&client, &server, "/api/v1/inventory/reserve", "prod-5", "wh-1", -3).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Garbage record id.
    let res = client
        .get(server.url("/api/v1/inventory/not-a-uuid"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Duplicate provisioning conflicts.
    let res = client
        .post(server.url("/api/v1/inventory"))
        .json(&json!({
            "product_id": "prod-5",
            "warehouse_id": "wh-1",
            "owner_id": "owner-2",
            "unit_of_measure": "EACH",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

fn uuid_like_unknown_id() -> String {
    // Valid v7-shaped uuid that was never provisioned.
    "0190b7f0-0000-7000-8000-000000000000".to_string()
}

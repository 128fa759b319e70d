use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use base64::Engine as _;
use http_body_util::BodyExt;
use migration::MigratorTrait;
use sea_orm::Database;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use engine::{Credits, Engine};
use server::{AdminCredentials, ServerState, router};

struct TestApp {
    state: ServerState,
    data: TempDir,
    _temp: TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        let data = TempDir::new().unwrap();
        let temp = TempDir::new().unwrap();
        let engine = Engine::builder()
            .database(db)
            .data_dir(data.path())
            .temp_dir(temp.path())
            .build()
            .await
            .unwrap();
        let admin = AdminCredentials {
            username: "admin".to_string(),
            password: "secret".to_string(),
        };
        Self {
            state: ServerState::new(engine, Some(admin)),
            data,
            _temp: temp,
        }
    }

    fn router(&self) -> Router {
        router(self.state.clone())
    }

    fn engine(&self) -> &Engine {
        &self.state.engine
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, headers, body)
    }
}

fn admin_auth() -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode("admin:secret");
    format!("Basic {encoded}")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_as(uri: &str, user_id: i64) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-user-id", user_id.to_string())
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn admin_get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, admin_auth())
        .body(Body::empty())
        .unwrap()
}

fn admin_post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::AUTHORIZATION, admin_auth())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn download_charges_or_returns_402() {
    let app = TestApp::new().await;
    let author = app.engine().create_user("author", "Author", None).await.unwrap();
    let rich = app.engine().create_user("rich", "Rich", None).await.unwrap();
    let poor = app.engine().create_user("poor", "Poor", None).await.unwrap();
    app.engine()
        .purchase_credits(rich.id, Credits::whole(500))
        .await
        .unwrap();
    app.engine()
        .purchase_credits(poor.id, Credits::whole(10))
        .await
        .unwrap();
    let pack = app
        .engine()
        .publish_pack(author.id, "Cohorts", "per_use", 25)
        .await
        .unwrap();

    let (status, headers, body) = app
        .send(get_as(&format!("/download/{}", pack.id), rich.id))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["remaining_balance"], "475.00");
    assert_eq!(body["charged"], "25.00");
    let license: Value =
        serde_json::from_str(headers["x-usage-license"].to_str().unwrap()).unwrap();
    assert_eq!(license["pricing_model"], "per_use");
    assert_eq!(license["remaining_uses"], 1);

    let (status, _, body) = app
        .send(get_as(&format!("/download/{}", pack.id), poor.id))
        .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert!(body["error"].as_str().unwrap().contains("Insufficient balance"));

    let (status, _, body) = app.send(get_as("/credits/balance", poor.id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance"], "10.00");

    let (status, _, _) = app.send(get_as("/download/999", rich.id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = app.send(get(&format!("/download/{}", pack.id))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn purchase_and_history() {
    let app = TestApp::new().await;
    let user = app.engine().create_user("buyer", "Buyer", None).await.unwrap();

    let mut request = post_json("/credits/purchase", json!({"amount": "12.50"}));
    request
        .headers_mut()
        .insert("x-user-id", user.id.to_string().parse().unwrap());
    let (status, _, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance"], "12.50");

    let (_, _, body) = app.send(get_as("/credits/transactions", user.id)).await;
    let transactions = body["transactions"].as_array().unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0]["transaction_type"], "purchase");
    assert_eq!(transactions[0]["amount"], "12.50");
}

#[tokio::test]
async fn admin_routes_require_credentials() {
    let app = TestApp::new().await;

    let (status, _, _) = app
        .send(get("/admin/api/storefront-support/get-threshold"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let wrong = Request::builder()
        .uri("/admin/api/storefront-support/get-threshold")
        .header(
            header::AUTHORIZATION,
            format!(
                "Basic {}",
                base64::engine::general_purpose::STANDARD.encode("admin:nope")
            ),
        )
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = app.send(wrong).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, body) = app
        .send(admin_get("/admin/api/storefront-support/get-threshold"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["threshold"], 1000);
}

#[tokio::test]
async fn threshold_rejects_malformed_values() {
    let app = TestApp::new().await;

    let (status, _, body) = app
        .send(admin_post(
            "/admin/api/storefront-support/set-threshold",
            json!({"threshold": "7"}),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["threshold"], 7);

    for bad in [json!({"threshold": "3.14"}), json!({"threshold": -1}), json!({})] {
        let (status, _, _) = app
            .send(admin_post("/admin/api/storefront-support/set-threshold", bad))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (_, _, body) = app
        .send(admin_get("/admin/api/storefront-support/get-threshold"))
        .await;
    assert_eq!(body["threshold"], 7);
}

#[tokio::test]
async fn support_list_validates_filters() {
    let app = TestApp::new().await;

    let (status, _, body) = app
        .send(admin_get(
            "/admin/api/storefront-support/list?date_from=2025-06-01&date_to=2025-01-01",
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _, _) = app
        .send(admin_get("/admin/api/storefront-support/list?sort_order=sideways"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, body) = app
        .send(admin_get("/admin/api/storefront-support/list?page=abc&status="))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page"], 1);
    assert_eq!(body["total"], 0);
    assert_eq!(body["page_size"], 50);
}

#[tokio::test]
async fn support_application_and_review() {
    let app = TestApp::new().await;
    app.engine().set_support_threshold(1).await.unwrap();
    let author = app.engine().create_user("author", "Author", None).await.unwrap();
    let buyer = app.engine().create_user("buyer", "Buyer", None).await.unwrap();
    app.engine()
        .purchase_credits(buyer.id, Credits::whole(10))
        .await
        .unwrap();
    let pack = app
        .engine()
        .publish_pack(author.id, "Cohorts", "per_use", 5)
        .await
        .unwrap();
    app.engine().charge_for_download(buyer.id, pack.id).await.unwrap();
    let store = app
        .engine()
        .create_storefront(author.id, "cohort-lab", "Cohort Lab")
        .await
        .unwrap();

    let mut request = post_json(
        "/storefront-support/apply",
        json!({"storefront_id": store.id, "software_name": "Analytics"}),
    );
    request
        .headers_mut()
        .insert("x-user-id", author.id.to_string().parse().unwrap());
    let (status, _, body) = app.send(request).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    let id = body["id"].as_i64().unwrap();

    let (status, _, body) = app
        .send(admin_get("/admin/api/storefront-support/list?search=COHORT"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["username"], "author");

    let (status, _, _) = app
        .send(admin_post(
            &format!("/admin/api/storefront-support/{id}/reenable"),
            json!({}),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, body) = app
        .send(admin_post(
            &format!("/admin/api/storefront-support/{id}/approve"),
            json!({}),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");

    let (status, _, body) = app
        .send(admin_post(
            &format!("/admin/api/storefront-support/{id}/disable"),
            json!({"reason": "abuse"}),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "disabled");
    assert_eq!(body["disable_reason"], "abuse");
}

#[tokio::test]
async fn export_and_has_data_endpoints() {
    let app = TestApp::new().await;

    let (status, _, body) = app.send(get("/components/metrics/metrics-0/has-data")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hasData"], false);

    let (status, _, _) = app.send(get("/components/gauge/gauge-0/has-data")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, _, layout) = app.send(get("/layout/default")).await;
    let export = json!({"layoutConfig": layout, "format": "json", "userId": "u1"});

    let (status, _, _) = app.send(post_json("/export", export.clone())).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    std::fs::write(app.data.path().join("datasources.json"), r#"[{"id": "orders"}]"#).unwrap();
    let (status, _, body) = app
        .send(post_json(
            "/components/has-data",
            json!({"metrics-0": "metrics", "image-0": "image"}),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"metrics-0": true, "image-0": false}));

    let (status, _, body) = app.send(post_json("/export", export)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["includedComponents"], json!(["metrics-0", "table-0"]));
    assert_eq!(body["totalComponents"], 5);
    assert!(std::path::Path::new(body["filePath"].as_str().unwrap()).is_file());

    let bad_format = json!({"layoutConfig": layout, "format": "pdf", "userId": "u1"});
    let (status, _, _) = app.send(post_json("/export", bad_format)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn layout_load_and_save() {
    let app = TestApp::new().await;

    let (status, _, body) = app.send(get("/layout?user=u1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "default");
    assert_eq!(body["userId"], "u1");

    let mut layout = body.clone();
    layout["isLocked"] = json!(true);
    let (status, _, saved) = app.send(post_json("/layout?user=u1", layout)).await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(saved["id"], "default");

    let (_, _, loaded) = app.send(get("/layout?user=u1")).await;
    assert_eq!(loaded["id"], saved["id"]);
    assert_eq!(loaded["isLocked"], true);

    let (status, _, _) = app.send(get("/layout")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn files_are_listed_and_served() {
    let app = TestApp::new().await;
    std::fs::create_dir_all(app.data.path().join("files")).unwrap();
    std::fs::write(app.data.path().join("files/report.csv"), "a,b\n").unwrap();

    let (status, _, body) = app.send(get("/files")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["name"], "report.csv");
    assert_eq!(body[0]["downloadUrl"], "/files/download/report.csv");

    let (status, _, body) = app.send(get("/files?category=user_request_related")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, _, _) = app.send(get("/files?category=secret")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, headers, body) = app.send(get("/files/download/report.csv")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/octet-stream");
    assert_eq!(body, Value::String("a,b\n".to_string()));

    let (status, _, _) = app.send(get("/files/download/missing.csv")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn usage_license_survives_non_ascii_pack_names() {
    let app = TestApp::new().await;
    let author = app.engine().create_user("author", "Author", None).await.unwrap();
    let buyer = app.engine().create_user("buyer", "Buyer", None).await.unwrap();
    app.engine()
        .purchase_credits(buyer.id, Credits::whole(100))
        .await
        .unwrap();
    let pack = app
        .engine()
        .publish_pack(author.id, "Café Kohorten", "subscription", 100)
        .await
        .unwrap();

    let (status, headers, body) = app
        .send(get_as(&format!("/download/{}", pack.id), buyer.id))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["remaining_balance"], "0.00");

    let raw = headers["x-usage-license"].to_str().unwrap();
    assert!(raw.is_ascii());
    let license: Value = serde_json::from_str(raw).unwrap();
    assert_eq!(license["pack_name"], "Café Kohorten");
    assert_eq!(license["pricing_model"], "subscription");
    assert_eq!(license["subscription_months"], 1);
    assert_eq!(body["usage_license"], license);
}

#[tokio::test]
async fn unknown_component_types_are_bad_requests() {
    let app = TestApp::new().await;
    std::fs::write(app.data.path().join("datasources.json"), r#"[{"id": "orders"}]"#).unwrap();

    let (_, _, mut layout) = app.send(get("/layout?user=u1")).await;
    layout["items"][0]["type"] = json!("chart");

    let export = json!({"layoutConfig": layout, "format": "json", "userId": "u1"});
    let (status, _, body) = app.send(post_json("/export", export)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _, _) = app.send(post_json("/layout?user=u1", layout)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let buyer = app.engine().create_user("buyer", "Buyer", None).await.unwrap();
    let mut request = post_json("/credits/purchase", json!({"amount": 5}));
    request
        .headers_mut()
        .insert("x-user-id", buyer.id.to_string().parse().unwrap());
    let (status, _, _) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn download_names_are_quoted_in_disposition() {
    let app = TestApp::new().await;
    std::fs::create_dir_all(app.data.path().join("files")).unwrap();
    std::fs::write(app.data.path().join("files/q\"uote é.csv"), "x\n").unwrap();

    let (status, headers, _) = app
        .send(get("/files/download/q%22uote%20%C3%A9.csv"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"q_uote _.csv\"; filename*=UTF-8''q%22uote%20%C3%A9.csv"
    );
}

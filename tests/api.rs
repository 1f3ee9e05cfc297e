//! HTTP-level tests against the full router

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

use showfloor::api::{build_router, AppState};
use showfloor::config::Config;
use showfloor::db::{create_test_pool, migrations};
use showfloor::storage::LocalObjectStore;

const ADMIN_PASSWORD: &str = "booth-and-banner-42";
const PNG: &[u8] = b"\x89PNG\r\n\x1a\nnot really a png";
const SVG: &[u8] = b"<svg xmlns=\"http://www.w3.org/2000/svg\"><script>alert(1)</script></svg>";

async fn setup() -> (TempDir, TestServer) {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.storage.path = dir.path().to_path_buf();
    config.admin.password = Some(ADMIN_PASSWORD.to_string());

    let pool = create_test_pool().await.expect("Failed to create test pool");
    migrations::run_migrations(&pool).await.expect("Failed to run migrations");

    let store = LocalObjectStore::new(&config.storage);
    store.ensure_buckets().await.unwrap();

    let admin = config.admin.clone();
    let state = AppState::new(config, pool, Arc::new(store));
    state.user_service.bootstrap_admin(&admin).await.unwrap();

    let server = TestServer::builder()
        .save_cookies()
        .build(build_router(state))
        .unwrap();
    (dir, server)
}

async fn login(server: &TestServer) -> String {
    let response = server
        .post("/api/auth/login")
        .json(&json!({ "username": "admin", "password": ADMIN_PASSWORD }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    response.json::<Value>()["token"].as_str().unwrap().to_string()
}

fn event_body(title: &str, published: bool) -> Value {
    json!({
        "title": title,
        "summary": "Three halls of industrial automation",
        "venue": "Hall 4",
        "city": "Hannover",
        "starts_at": "2031-04-14",
        "ends_at": "2031-04-16",
        "is_published": published,
    })
}

#[tokio::test]
async fn test_health() {
    let (_dir, server) = setup().await;
    let response = server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["status"], "ok");
}

#[tokio::test]
async fn test_admin_routes_require_session() {
    let (_dir, server) = setup().await;
    let response = server.post("/api/events").json(&event_body("Expo", true)).await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["error"]["code"], "UNAUTHORIZED");

    let response = server
        .get("/api/admin/events")
        .authorization_bearer("not-a-session")
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_me_logout() {
    let (_dir, server) = setup().await;

    let response = server
        .post("/api/auth/login")
        .json(&json!({ "username": "admin", "password": "wrong" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let token = login(&server).await;
    let me = server.get("/api/auth/me").authorization_bearer(&token).await;
    assert_eq!(me.status_code(), StatusCode::OK);
    assert_eq!(me.json::<Value>()["username"], "admin");

    let response = server.post("/api/auth/logout").authorization_bearer(&token).await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);

    let me = server.get("/api/auth/me").authorization_bearer(&token).await;
    assert_eq!(me.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_repeated_failed_logins_throttled() {
    let (_dir, server) = setup().await;

    for _ in 0..5 {
        let response = server
            .post("/api/auth/login")
            .json(&json!({ "username": "admin", "password": "guess" }))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }

    // Even the right password is refused until the window passes
    let response = server
        .post("/api/auth/login")
        .json(&json!({ "username": "Admin", "password": ADMIN_PASSWORD }))
        .await;
    assert_eq!(response.status_code(), StatusCode::TOO_MANY_REQUESTS);
    let body = response.json::<Value>();
    assert_eq!(body["error"]["code"], "RATE_LIMIT");
    assert!(body["error"]["details"]["retry_after"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_login_requests_throttled_per_address() {
    let (_dir, server) = setup().await;

    for _ in 0..10 {
        let response = server
            .post("/api/auth/login")
            .add_header("x-forwarded-for", "203.0.113.20")
            .json(&json!({ "username": "admin", "password": ADMIN_PASSWORD }))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);
    }
    let response = server
        .post("/api/auth/login")
        .add_header("x-forwarded-for", "203.0.113.20")
        .json(&json!({ "username": "admin", "password": ADMIN_PASSWORD }))
        .await;
    assert_eq!(response.status_code(), StatusCode::TOO_MANY_REQUESTS);

    let response = server
        .post("/api/auth/login")
        .add_header("x-forwarded-for", "203.0.113.21")
        .json(&json!({ "username": "admin", "password": ADMIN_PASSWORD }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_session_cookie_authenticates() {
    let (_dir, server) = setup().await;
    login(&server).await;

    // The saved `session` cookie is sent without any Authorization header
    let me = server.get("/api/auth/me").await;
    assert_eq!(me.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_draft_event_hidden_until_published() {
    let (_dir, server) = setup().await;
    let token = login(&server).await;

    let created = server
        .post("/api/events")
        .authorization_bearer(&token)
        .json(&event_body("Automation Expo", false))
        .await;
    assert_eq!(created.status_code(), StatusCode::CREATED);
    let created = created.json::<Value>();
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["slug"], "automation-expo");
    assert_eq!(created["date_label"], "APRIL 14 - APRIL 16, 2031");

    assert_eq!(
        server.get("/api/events/automation-expo").await.status_code(),
        StatusCode::NOT_FOUND
    );
    let admin = server
        .get(&format!("/api/admin/events/{}", id))
        .authorization_bearer(&token)
        .await;
    assert_eq!(admin.status_code(), StatusCode::OK);

    let updated = server
        .put(&format!("/api/events/{}", id))
        .authorization_bearer(&token)
        .json(&event_body("Automation Expo", true))
        .await;
    assert_eq!(updated.status_code(), StatusCode::OK);

    let public = server.get("/api/events/automation-expo").await;
    assert_eq!(public.status_code(), StatusCode::OK);
    assert_eq!(public.json::<Value>()["id"], id);

    let list = server.get("/api/events").add_query_param("upcoming", true).await;
    let list = list.json::<Value>();
    assert_eq!(list["total"], 1);
    assert_eq!(list["items"][0]["title"], "Automation Expo");
}

#[tokio::test]
async fn test_invalid_dates_rejected_with_error_notice() {
    let (_dir, server) = setup().await;
    let token = login(&server).await;

    let mut body = event_body("Backwards", true);
    body["ends_at"] = json!("2031-04-01");
    let response = server.post("/api/events").authorization_bearer(&token).json(&body).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"]["code"], "VALIDATION_ERROR");

    let notices = server
        .get("/api/admin/notifications")
        .authorization_bearer(&token)
        .await
        .json::<Vec<Value>>();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0]["kind"], "error");

    let id = notices[0]["id"].as_u64().unwrap();
    let response = server
        .delete(&format!("/api/admin/notifications/{}", id))
        .authorization_bearer(&token)
        .await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_successful_save_pushes_notice() {
    let (_dir, server) = setup().await;
    let token = login(&server).await;

    server
        .post("/api/events")
        .authorization_bearer(&token)
        .json(&event_body("Harbour Days", true))
        .await;

    let notices = server
        .get("/api/admin/notifications")
        .authorization_bearer(&token)
        .await
        .json::<Vec<Value>>();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0]["kind"], "success");
}

#[tokio::test]
async fn test_staged_cover_committed_on_save() {
    let (_dir, server) = setup().await;
    let token = login(&server).await;

    let form = MultipartForm::new()
        .add_text("bucket", "event-images")
        .add_part("file", Part::bytes(PNG.to_vec()).file_name("cover.png").mime_type("image/png"));
    let staged = server
        .post("/api/admin/staging")
        .authorization_bearer(&token)
        .multipart(form)
        .await;
    assert_eq!(staged.status_code(), StatusCode::CREATED);
    let staged = staged.json::<Value>();
    let preview_url = staged["preview_url"].as_str().unwrap().to_string();

    let preview = server.get(&preview_url).authorization_bearer(&token).await;
    assert_eq!(preview.status_code(), StatusCode::OK);
    assert_eq!(preview.header("content-type"), "image/png");
    assert_eq!(preview.as_bytes().as_ref(), PNG);

    // Nothing is in the bucket before the event is saved
    let listed = server
        .get("/api/images")
        .add_query_param("bucket", "event-images")
        .authorization_bearer(&token)
        .await
        .json::<Vec<Value>>();
    assert!(listed.is_empty());

    let mut body = event_body("Cover Show", true);
    body["cover_image"] = json!({ "state": "pending", "token": staged["token"] });
    let created = server
        .post("/api/events")
        .authorization_bearer(&token)
        .json(&body)
        .await
        .json::<Value>();
    let cover_url = created["cover_image_url"].as_str().unwrap().to_string();
    assert!(cover_url.starts_with("/storage/event-images/covers/"));

    let object = server.get(&cover_url).await;
    assert_eq!(object.status_code(), StatusCode::OK);
    assert_eq!(object.as_bytes().as_ref(), PNG);

    // The token was consumed by the save
    let preview = server.get(&preview_url).authorization_bearer(&token).await;
    assert_eq!(preview.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_svg_served_sandboxed() {
    let (_dir, server) = setup().await;
    let token = login(&server).await;

    let form = MultipartForm::new()
        .add_text("bucket", "event-images")
        .add_part("file", Part::bytes(SVG.to_vec()).file_name("logo.svg").mime_type("image/svg+xml"));
    let staged = server
        .post("/api/admin/staging")
        .authorization_bearer(&token)
        .multipart(form)
        .await
        .json::<Value>();

    let preview = server
        .get(staged["preview_url"].as_str().unwrap())
        .authorization_bearer(&token)
        .await;
    assert_eq!(preview.status_code(), StatusCode::OK);
    assert!(preview.header("content-security-policy").to_str().unwrap().starts_with("sandbox"));
    assert_eq!(preview.header("x-content-type-options"), "nosniff");

    let mut body = event_body("Vector Show", true);
    body["cover_image"] = json!({ "state": "pending", "token": staged["token"] });
    let created = server
        .post("/api/events")
        .authorization_bearer(&token)
        .json(&body)
        .await
        .json::<Value>();
    let cover_url = created["cover_image_url"].as_str().unwrap().to_string();
    assert!(cover_url.ends_with(".svg"));

    let object = server.get(&cover_url).await;
    assert_eq!(object.status_code(), StatusCode::OK);
    assert!(object.header("content-security-policy").to_str().unwrap().starts_with("sandbox"));
    assert_eq!(object.header("x-content-type-options"), "nosniff");

    // Other responses carry no sandbox policy
    let health = server.get("/health").await;
    assert!(health.maybe_header("content-security-policy").is_none());
}

#[tokio::test]
async fn test_staging_rejects_disallowed_type() {
    let (_dir, server) = setup().await;
    let token = login(&server).await;

    let form = MultipartForm::new()
        .add_text("bucket", "blog-images")
        .add_part("file", Part::text("#!/bin/sh").file_name("run.sh").mime_type("text/x-shellscript"));
    let response = server
        .post("/api/admin/staging")
        .authorization_bearer(&token)
        .multipart(form)
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rpc_procedures() {
    let (_dir, server) = setup().await;

    let response = server.post("/api/rpc/get_event_categories").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.json::<Value>().is_array());

    let response = server.get("/api/rpc/get_about_dedication_section").await;
    assert_eq!(response.json::<Vec<Value>>().len(), 0);

    let response = server.get("/api/rpc/drop_everything").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_section_save_and_read() {
    let (_dir, server) = setup().await;
    let token = login(&server).await;

    assert_eq!(
        server.get("/api/sections/nowhere").await.status_code(),
        StatusCode::NOT_FOUND
    );

    let saved = server
        .put("/api/sections/conference_management")
        .authorization_bearer(&token)
        .json(&json!({
            "title": "Conference management",
            "items": [
                { "title": "Venue sourcing" },
                { "title": "Registration" },
            ],
        }))
        .await;
    assert_eq!(saved.status_code(), StatusCode::OK);

    let rows = server
        .get("/api/rpc/get_conference_management_services")
        .await
        .json::<Vec<Value>>();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["title"], "Venue sourcing");
}

#[tokio::test]
async fn test_portfolio_replace_all() {
    let (_dir, server) = setup().await;
    let token = login(&server).await;

    let response = server
        .put("/api/portfolio")
        .authorization_bearer(&token)
        .json(&json!([
            { "title": "Trade fair stand" },
            { "title": "Product launch" },
        ]))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let items = server.get("/api/portfolio").await.json::<Vec<Value>>();
    let titles: Vec<&str> = items.iter().filter_map(|i| i["title"].as_str()).collect();
    assert_eq!(titles, vec!["Trade fair stand", "Product launch"]);
}

#[tokio::test]
async fn test_company_profile_roundtrip() {
    let (_dir, server) = setup().await;
    let token = login(&server).await;

    let response = server
        .put("/api/company-profile")
        .authorization_bearer(&token)
        .json(&json!({ "company_name": "Halls & Booths", "email": "hi@example.com" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let profile = server.get("/api/company-profile").await.json::<Value>();
    assert_eq!(profile["company_name"], "Halls & Booths");
}

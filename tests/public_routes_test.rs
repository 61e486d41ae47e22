mod common;

use actix_web::{http::header, test};
use serde_json::json;
use serial_test::serial;

use campsite_api::models::user::UserRole;
use common::{send, TestApp};

#[actix_rt::test]
#[serial]
async fn test_liveness() {
    let test_app = TestApp::new().await;
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let body = test::read_body(resp).await;
    assert_eq!(body, "OK");
}

#[actix_rt::test]
#[serial]
async fn test_cors_headers() {
    let test_app = TestApp::new().await;
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::get()
        .uri("/health")
        .insert_header(("Origin", "http://localhost:3000"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert!(resp.status().is_success());
    assert!(resp
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}

#[actix_rt::test]
#[serial]
async fn test_register_requires_every_field() {
    let test_app = TestApp::new().await;
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/register")
        .set_json(json!({
            "name": "Alice",
            "email": "alice@example.com",
            "password": "secret1"
        }))
        .to_request();
    let (status, body) = send(&app, req).await;

    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "username is required");
}

#[actix_rt::test]
#[serial]
async fn test_register_rejects_short_password() {
    let test_app = TestApp::new().await;
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/register")
        .set_json(json!({
            "name": "Alice",
            "email": "alice@example.com",
            "username": "alice",
            "password": "abc"
        }))
        .to_request();
    let (status, body) = send(&app, req).await;

    assert_eq!(status, 400);
    assert_eq!(body["message"], "Password must be at least 6 characters");
}

#[actix_rt::test]
#[serial]
async fn test_register_rejects_bad_email() {
    let test_app = TestApp::new().await;
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/register")
        .set_json(json!({
            "name": "Alice",
            "email": "not-an-email",
            "username": "alice",
            "password": "secret1"
        }))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, 400);
}

#[actix_rt::test]
#[serial]
async fn test_malformed_json_is_a_validation_error() {
    let test_app = TestApp::new().await;
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/login")
        .insert_header(header::ContentType::json())
        .set_payload("{not json")
        .to_request();
    let (status, body) = send(&app, req).await;

    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
}

#[actix_rt::test]
#[serial]
async fn test_login_requires_password() {
    let test_app = TestApp::new().await;
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/login")
        .set_json(json!({ "username": "alice" }))
        .to_request();
    let (status, body) = send(&app, req).await;

    assert_eq!(status, 400);
    assert_eq!(body["message"], "password is required");
}

#[actix_rt::test]
#[serial]
async fn test_non_numeric_destination_id() {
    let test_app = TestApp::new().await;
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::get()
        .uri("/api/destinations/abc")
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, 400);
}

#[actix_rt::test]
#[serial]
async fn test_availability_rejects_bad_date() {
    let test_app = TestApp::new().await;
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::get()
        .uri("/api/destinations/1/availability?from=tomorrow")
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, 400);
}

#[actix_rt::test]
#[serial]
async fn test_create_destination_without_auth() {
    let test_app = TestApp::new().await;
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/destinations")
        .set_json(json!({ "name": "Pine Hollow" }))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, 401);
}

#[actix_rt::test]
#[serial]
async fn test_destination_writes_need_admin() {
    let test_app = TestApp::new().await;
    let app = test::init_service(test_app.create_app()).await;
    let token = test_app.bearer_for("alice", UserRole::User);

    let req = test::TestRequest::post()
        .uri("/api/destinations")
        .insert_header((header::AUTHORIZATION, token.clone()))
        .set_json(json!({ "name": "Pine Hollow" }))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, 403);
    assert_eq!(body["message"], "Admin access required");

    let req = test::TestRequest::delete()
        .uri("/api/destinations/1")
        .insert_header((header::AUTHORIZATION, token))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, 403);
}

#[actix_rt::test]
#[serial]
async fn test_create_destination_validates_before_storing() {
    let test_app = TestApp::new().await;
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/destinations")
        .insert_header((
            header::AUTHORIZATION,
            test_app.bearer_for("admin", UserRole::Admin),
        ))
        .set_json(json!({ "name": "Pine Hollow", "location": "Oregon" }))
        .to_request();
    let (status, body) = send(&app, req).await;

    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
}

#[actix_rt::test]
#[serial]
async fn test_post_review_without_auth() {
    let test_app = TestApp::new().await;
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/reviews")
        .set_json(json!({ "campsiteId": 1, "rating": 5, "title": "Great", "content": "Loved it" }))
        .to_request();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, 401);
}

#[actix_rt::test]
#[serial]
async fn test_review_rating_out_of_range() {
    let test_app = TestApp::new().await;
    let app = test::init_service(test_app.create_app()).await;

    let req = test::TestRequest::post()
        .uri("/api/reviews")
        .insert_header((header::AUTHORIZATION, test_app.bearer_for("alice", UserRole::User)))
        .set_json(json!({ "campsiteId": 1, "rating": 7, "title": "Great", "content": "Loved it" }))
        .to_request();
    let (status, body) = send(&app, req).await;

    assert_eq!(status, 400);
    assert_eq!(body["message"], "Rating must be between 1 and 5");
}

mod common;

use axum::http::StatusCode;
use chrono::Utc;
use futures::future::join_all;
use serde_json::json;

use common::TestApp;
use ridergo_backend::models::OtpSendState;
use ridergo_backend::repositories::ClientRepository;

#[tokio::test]
async fn test_client_otp_login_is_single_use() {
    let app = TestApp::new();

    let (status, _) = app
        .post("/api/client/register", None, json!({ "phone": "0722000001" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let code = app.otp.code_for("+254722000001").expect("code sent");

    // los códigos generados van de 100000 a 999999
    let (status, _) = app
        .post("/api/client/verify", None, json!({ "phone": "0722000001", "otp": "000000" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post("/api/client/verify", None, json!({ "phone": "+254722000001", "otp": code }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["account"]["phone"], "+254722000001");

    // el mismo código no sirve dos veces
    let (status, _) = app
        .post("/api/client/verify", None, json!({ "phone": "0722000001", "otp": code }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.get("/api/client/profile", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["phone"], "+254722000001");
}

#[tokio::test]
async fn test_immediate_resend_is_throttled() {
    let app = TestApp::new();

    let (status, _) = app
        .post("/api/client/register", None, json!({ "phone": "0722000002" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .post("/api/client/resend-otp", None, json!({ "phone": "0722000002" }))
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS, "{}", body);
    assert_eq!(app.otp.sends(), 1);
}

#[tokio::test]
async fn test_client_login_requires_account() {
    let app = TestApp::new();

    let (status, _) = app
        .post("/api/client/login", None, json!({ "phone": "0722000003" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post("/api/client/register", None, json!({ "phone": "not-a-phone" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rider_register_verify_login() {
    let app = TestApp::new();
    let registration = json!({
        "phone": "0733000001",
        "email": "Otieno@Example.com",
        "first_name": "Brian",
        "last_name": "Otieno",
        "password": "boda-boda-2025"
    });

    let (status, body) = app.post("/api/rider/register", None, registration.clone()).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let rider_id = body["data"]["rider_id"].as_str().unwrap().to_string();

    let (status, _) = app.post("/api/rider/register", None, registration).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let login = json!({ "email": "otieno@example.com", "password": "boda-boda-2025" });
    let (status, _) = app.post("/api/rider/login", None, login.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let code = app.otp.code_for("+254733000001").unwrap();
    let (status, body) = app
        .post("/api/rider/verify", None, json!({ "rider_id": rider_id, "otp": code }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["account"]["is_verified"], true);
    assert!(body["data"]["account"].get("password_hash").is_none());

    let (status, body) = app.post("/api/rider/login", None, login).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["token"].as_str().is_some());

    let (status, _) = app
        .post(
            "/api/rider/login",
            None,
            json!({ "email": "otieno@example.com", "password": "wrong-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_trial_blocks_trip_operations() {
    let app = TestApp::new();
    let (_, token) = app.rider("+254744000001", 10).await;

    let (status, body) = app.get("/api/trips/available", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["message"].as_str().unwrap().contains("KES 100"));

    let (status, body) = app.get("/api/rider/subscription/status", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["active"], false);
    assert_eq!(body["data"]["is_trial_active"], false);
    assert_eq!(body["data"]["can_operate"], false);

    // el perfil y el historial no pasan por el control
    let (status, _) = app
        .request(
            axum::http::Method::PUT,
            "/api/rider/profile",
            Some(token.as_str()),
            Some(json!({ "vehicle_type": "motorbike", "number_plate": "kmfa 123b" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get("/api/trips/mine/history", &token).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_trial_rider_can_operate() {
    let app = TestApp::new();
    let (_, token) = app.rider("+254744000002", 3).await;

    let (status, body) = app.get("/api/rider/subscription/status", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_trial_active"], true);
    assert_eq!(body["data"]["can_operate"], true);

    let (status, _) = app.get("/api/trips/available", &token).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_invalid_token_is_rejected() {
    let app = TestApp::new();

    let (status, _) = app.get("/api/trips/available", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.request(axum::http::Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_concurrent_resends_send_one_code() {
    let app = TestApp::new();
    app.client("+254722000009").await;

    let body = json!({ "phone": "0722000009" });
    let results = join_all(vec![
        app.post("/api/client/resend-otp", None, body.clone()),
        app.post("/api/client/resend-otp", None, body.clone()),
    ])
    .await;

    let sent = results.iter().filter(|(s, _)| *s == StatusCode::OK).count();
    let throttled = results.iter().filter(|(s, _)| *s == StatusCode::TOO_MANY_REQUESTS).count();
    assert_eq!((sent, throttled), (1, 1));
}

#[tokio::test]
async fn test_send_slot_is_claimed_once() {
    let app = TestApp::new();
    let (client_id, _) = app.client("+254722000010").await;

    let now = Utc::now();
    let previous = OtpSendState::default();
    let next = OtpSendState {
        last_sent_at: Some(now),
        window_started_at: Some(now),
        sends_in_window: 1,
    };

    assert!(ClientRepository::record_otp_sent(&*app.store, client_id, &previous, &next)
        .await
        .unwrap());
    // el segundo con la misma lectura pierde
    assert!(!ClientRepository::record_otp_sent(&*app.store, client_id, &previous, &next)
        .await
        .unwrap());
}

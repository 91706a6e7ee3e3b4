mod common;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use common::{delivery_body, FakeGateway, TestApp};
use ridergo_backend::models::payment::PaymentStatus;
use ridergo_backend::repositories::PaymentRepository;

fn paid_callback(checkout: Option<&str>, receipt: &str, amount: i64, phone: u64) -> Value {
    let mut callback = json!({
        "MerchantRequestID": "mr-1",
        "ResultCode": 0,
        "ResultDesc": "The service request is processed successfully.",
        "CallbackMetadata": {
            "Item": [
                { "Name": "Amount", "Value": amount },
                { "Name": "MpesaReceiptNumber", "Value": receipt },
                { "Name": "TransactionDate", "Value": 20250301101500u64 },
                { "Name": "PhoneNumber", "Value": phone }
            ]
        }
    });
    if let Some(checkout) = checkout {
        callback["CheckoutRequestID"] = json!(checkout);
    }
    json!({ "Body": { "stkCallback": callback } })
}

#[tokio::test]
async fn test_subscription_payment_is_applied_once() {
    let app = TestApp::new();
    let (rider_id, token) = app.rider("+254755000001", 10).await;

    let (status, _) = app.get("/api/trips/available", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .request(Method::POST, "/api/payments/initiate", Some(token.as_str()), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["amount"], 100);
    let checkout = body["data"]["checkout_request_id"].as_str().unwrap().to_string();

    let pushes = app.gateway.pushes();
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].msisdn, "254755000001");
    assert_eq!(pushes[0].amount, 100);

    let callback = paid_callback(Some(checkout.as_str()), "RGO1SUB001", 100, 254755000001);
    let (status, body) = app.post("/api/payments/callback", None, callback.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Payment processed");

    let rider = app.find_rider(rider_id).await;
    assert!(rider.subscription_active);
    assert_eq!(rider.last_payment_ref.as_deref(), Some("RGO1SUB001"));
    let expiry = rider.subscription_expires_at.unwrap();
    let days = (expiry - chrono::Utc::now()).num_days();
    assert!((29..=30).contains(&days));

    let (status, _) = app.get("/api/trips/available", &token).await;
    assert_eq!(status, StatusCode::OK);

    // segunda entrega del mismo recibo
    let (status, body) = app.post("/api/payments/callback", None, callback).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Payment already processed");
    assert_eq!(app.find_rider(rider_id).await.subscription_expires_at, Some(expiry));

    let intent = PaymentRepository::find_by_checkout(&*app.store, &checkout)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(intent.status, PaymentStatus::Completed);
    assert_eq!(intent.receipt_number.as_deref(), Some("RGO1SUB001"));
}

#[tokio::test]
async fn test_callback_resolves_rider_by_phone() {
    let app = TestApp::new();
    let (rider_id, _) = app.rider("+254755000002", 10).await;

    let callback = paid_callback(None, "RGO1SUB002", 100, 254755000002);
    let (status, _) = app.post("/api/payments/callback", None, callback).await;
    assert_eq!(status, StatusCode::OK);

    assert!(app.find_rider(rider_id).await.subscription_active);
}

#[tokio::test]
async fn test_callback_without_target_is_not_found() {
    let app = TestApp::new();

    let callback = paid_callback(None, "RGO1SUB003", 100, 254799999999);
    let (status, _) = app.post("/api/payments/callback", None, callback).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_failed_and_malformed_callbacks() {
    let app = TestApp::new();
    let (_, token) = app.rider("+254755000004", 0).await;

    let (_, body) = app
        .request(Method::POST, "/api/payments/initiate", Some(token.as_str()), None)
        .await;
    let checkout = body["data"]["checkout_request_id"].as_str().unwrap().to_string();

    let cancelled = json!({
        "Body": { "stkCallback": {
            "MerchantRequestID": "mr-1",
            "CheckoutRequestID": checkout,
            "ResultCode": 1032,
            "ResultDesc": "Request cancelled by user"
        }}
    });
    let (status, _) = app.post("/api/payments/callback", None, cancelled).await;
    assert_eq!(status, StatusCode::OK);

    let intent = PaymentRepository::find_by_checkout(&*app.store, &checkout)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(intent.status, PaymentStatus::Failed);
    assert_eq!(intent.result_code, Some(1032));

    let (status, _) = app
        .post("/api/payments/callback", None, json!({ "unexpected": true }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut no_receipt = paid_callback(Some(checkout.as_str()), "X", 100, 254755000004);
    no_receipt["Body"]["stkCallback"]["CallbackMetadata"]["Item"] =
        json!([{ "Name": "PhoneNumber", "Value": 254755000004u64 }]);
    let (status, _) = app.post("/api/payments/callback", None, no_receipt).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_gateway_failure_records_nothing() {
    let app = TestApp::with_gateway(FakeGateway::failing());
    let (_, token) = app.rider("+254755000005", 0).await;

    let (status, body) = app
        .request(Method::POST, "/api/payments/initiate", Some(token.as_str()), None)
        .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "UPSTREAM_ERROR");
}

#[tokio::test]
async fn test_wallet_load_and_ledger() {
    let app = TestApp::new();
    let (_, token) = app.client("+254766000001").await;

    let (status, body) = app.get("/api/wallet/balance", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["balance"], 0);

    let (status, _) = app
        .post("/api/wallet/load", Some(token.as_str()), json!({ "amount": 100, "reference": "cash-1" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app.post("/api/wallet/load", Some(token.as_str()), json!({ "amount": 50 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["balance"], 150);

    let (status, _) = app.post("/api/wallet/load", Some(token.as_str()), json!({ "amount": 0 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app.get("/api/wallet/balance", &token).await;
    assert_eq!(body["data"]["balance"], 150);

    let (_, body) = app.get("/api/wallet/transactions", &token).await;
    let ledger = body["data"].as_array().unwrap();
    assert_eq!(ledger.len(), 2);
    assert_eq!(ledger[0]["amount"], 50);
    assert_eq!(ledger[1]["reference"], "cash-1");
    assert_eq!(ledger[1]["direction"], "credit");
}

#[tokio::test]
async fn test_posting_fee_debit_is_all_or_nothing() {
    let app = TestApp::new();
    let (_, token) = app.client("+254766000002").await;

    let mut paid = delivery_body();
    paid["pay_posting_fee_from_wallet"] = json!(true);

    // sin monedero no se crea nada
    let (status, _) = app.post("/api/trips", Some(token.as_str()), paid.clone()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (_, trips) = app.get("/api/client/trips", &token).await;
    assert!(trips["data"].as_array().unwrap().is_empty());

    app.post("/api/wallet/load", Some(token.as_str()), json!({ "amount": 150 })).await;

    let (status, body) = app.post("/api/trips", Some(token.as_str()), paid.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["posting_fee_paid"], true);
    assert_eq!(body["data"]["client_wallet_used"], 100);

    let (_, balance) = app.get("/api/wallet/balance", &token).await;
    assert_eq!(balance["data"]["balance"], 50);

    let (status, _) = app.post("/api/trips", Some(token.as_str()), paid).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, balance) = app.get("/api/wallet/balance", &token).await;
    assert_eq!(balance["data"]["balance"], 50);
    let (_, ledger) = app.get("/api/wallet/transactions", &token).await;
    assert_eq!(ledger["data"].as_array().unwrap().len(), 2);
    assert_eq!(ledger["data"][0]["direction"], "debit");
    let (_, trips) = app.get("/api/client/trips", &token).await;
    assert_eq!(trips["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_wallet_top_up_via_mpesa() {
    let app = TestApp::new();
    let (_, token) = app.client("+254766000003").await;

    let (status, body) = app
        .post("/api/wallet/topup", Some(token.as_str()), json!({ "amount": 500 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let checkout = body["data"]["checkout_request_id"].as_str().unwrap().to_string();

    let callback = paid_callback(Some(checkout.as_str()), "RGO1TOP001", 500, 254766000003);
    let (status, _) = app.post("/api/payments/callback", None, callback.clone()).await;
    assert_eq!(status, StatusCode::OK);
    app.post("/api/payments/callback", None, callback).await;

    let (_, balance) = app.get("/api/wallet/balance", &token).await;
    assert_eq!(balance["data"]["balance"], 500);
    let (_, ledger) = app.get("/api/wallet/transactions", &token).await;
    assert_eq!(ledger["data"].as_array().unwrap().len(), 1);
    assert_eq!(ledger["data"][0]["reference"], "RGO1TOP001");
}

#[tokio::test]
async fn test_callback_amount_must_match_intent() {
    let app = TestApp::new();
    let (_, token) = app.client("+254766000004").await;

    let (_, body) = app
        .post("/api/wallet/topup", Some(token.as_str()), json!({ "amount": 500 }))
        .await;
    let checkout = body["data"]["checkout_request_id"].as_str().unwrap().to_string();

    for amount in [1_000_000, -5, 499] {
        let callback = paid_callback(Some(checkout.as_str()), "RGO1TOP002", amount, 254766000004);
        let (status, _) = app.post("/api/payments/callback", None, callback).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "amount {}", amount);
    }

    let (_, balance) = app.get("/api/wallet/balance", &token).await;
    assert_eq!(balance["data"]["balance"], 0);
    let intent = PaymentRepository::find_by_checkout(&*app.store, &checkout)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(intent.status, PaymentStatus::Initiated);

    // sin monto se liquida lo solicitado
    let mut no_amount = paid_callback(Some(checkout.as_str()), "RGO1TOP002", 500, 254766000004);
    no_amount["Body"]["stkCallback"]["CallbackMetadata"]["Item"] = json!([
        { "Name": "MpesaReceiptNumber", "Value": "RGO1TOP002" },
        { "Name": "PhoneNumber", "Value": 254766000004u64 }
    ]);
    let (status, _) = app.post("/api/payments/callback", None, no_amount).await;
    assert_eq!(status, StatusCode::OK);

    let (_, balance) = app.get("/api/wallet/balance", &token).await;
    assert_eq!(balance["data"]["balance"], 500);
}

#[tokio::test]
async fn test_partial_payment_without_intent_does_not_subscribe() {
    let app = TestApp::new();
    let (rider_id, _) = app.rider("+254755000006", 10).await;

    let callback = paid_callback(None, "RGO1SUB006", 1, 254755000006);
    let (status, _) = app.post("/api/payments/callback", None, callback).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut no_amount = paid_callback(None, "RGO1SUB006", 100, 254755000006);
    no_amount["Body"]["stkCallback"]["CallbackMetadata"]["Item"] = json!([
        { "Name": "MpesaReceiptNumber", "Value": "RGO1SUB006" },
        { "Name": "PhoneNumber", "Value": 254755000006u64 }
    ]);
    let (status, _) = app.post("/api/payments/callback", None, no_amount).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let rider = app.find_rider(rider_id).await;
    assert!(!rider.subscription_active);
    assert!(rider.last_payment_ref.is_none());
}

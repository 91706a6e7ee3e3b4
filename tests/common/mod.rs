#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

use ridergo_backend::build_router;
use ridergo_backend::config::EnvironmentConfig;
use ridergo_backend::models::rider::{NewRider, Rider};
use ridergo_backend::repositories::{ClientRepository, MemoryStore, RiderRepository};
use ridergo_backend::services::messaging_service::OtpSender;
use ridergo_backend::services::mpesa_service::{PaymentGateway, StkPushAck, StkPushRequest};
use ridergo_backend::state::AppState;
use ridergo_backend::utils::errors::{AppError, AppResult};
use ridergo_backend::utils::jwt::{generate_token, PrincipalRole};

/// Transporte que guarda el último código por teléfono
#[derive(Default)]
pub struct CapturingSender {
    codes: Mutex<HashMap<String, String>>,
    sends: AtomicUsize,
}

impl CapturingSender {
    pub fn code_for(&self, phone: &str) -> Option<String> {
        self.codes.lock().unwrap().get(phone).cloned()
    }

    pub fn sends(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OtpSender for CapturingSender {
    async fn send_otp(&self, phone: &str, code: &str) -> AppResult<()> {
        self.codes.lock().unwrap().insert(phone.to_string(), code.to_string());
        self.sends.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "capturing"
    }
}

/// Gateway que acepta cada push con un checkout secuencial
#[derive(Default)]
pub struct FakeGateway {
    pushes: Mutex<Vec<StkPushRequest>>,
    pub fail: bool,
}

impl FakeGateway {
    pub fn failing() -> Self {
        Self {
            pushes: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn pushes(&self) -> Vec<StkPushRequest> {
        self.pushes.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn stk_push(&self, request: &StkPushRequest) -> AppResult<StkPushAck> {
        if self.fail {
            return Err(AppError::Upstream {
                message: "M-Pesa request failed".to_string(),
                details: None,
            });
        }

        let mut pushes = self.pushes.lock().unwrap();
        pushes.push(request.clone());
        let n = pushes.len();

        Ok(StkPushAck {
            merchant_request_id: Some(format!("mr-{}", n)),
            checkout_request_id: format!("ws_CO_{}", n),
            response_code: Some("0".to_string()),
            response_description: Some("Success. Request accepted for processing".to_string()),
            customer_message: Some("Success. Request accepted for processing".to_string()),
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub otp: Arc<CapturingSender>,
    pub gateway: Arc<FakeGateway>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_gateway(FakeGateway::default())
    }

    pub fn with_gateway(gateway: FakeGateway) -> Self {
        let config = EnvironmentConfig {
            rate_limit_requests: 10_000,
            ..EnvironmentConfig::default()
        };
        let store = Arc::new(MemoryStore::new());
        let otp = Arc::new(CapturingSender::default());
        let gateway = Arc::new(gateway);

        let state = AppState::with_store(store.clone(), config, gateway.clone(), otp.clone());
        let router = build_router(state.clone());

        Self {
            router,
            state,
            store,
            otp,
            gateway,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    /// Cliente existente con su token
    pub async fn client(&self, phone: &str) -> (Uuid, String) {
        let (client, _) = ClientRepository::find_or_create_by_phone(&*self.store, phone, Utc::now())
            .await
            .unwrap();
        let token = generate_token(client.id, PrincipalRole::Client, &self.state.jwt).unwrap();
        (client.id, token)
    }

    /// Rider verificado dado de alta hace `age_days` días, sin suscripción
    pub async fn rider(&self, phone: &str, age_days: i64) -> (Uuid, String) {
        let now = Utc::now();
        let mut rider = Rider::new(
            NewRider {
                phone: phone.to_string(),
                email: format!("{}@riders.test", phone.trim_start_matches('+')),
                first_name: "Test".to_string(),
                last_name: "Rider".to_string(),
                password_hash: "not-a-real-hash".to_string(),
            },
            now,
        );
        rider.is_verified = true;
        rider.created_at = Some(now - Duration::days(age_days));

        RiderRepository::insert(&*self.store, &rider).await.unwrap();
        let token = generate_token(rider.id, PrincipalRole::Rider, &self.state.jwt).unwrap();
        (rider.id, token)
    }

    pub async fn find_rider(&self, id: Uuid) -> Rider {
        RiderRepository::find_by_id(&*self.store, id).await.unwrap().unwrap()
    }
}

/// Entrega Nairobi CBD → South B
pub fn delivery_body() -> Value {
    serde_json::json!({
        "service_type": "delivery",
        "pickup": { "address": "Kenyatta Avenue, Nairobi", "lat": -1.2921, "lng": 36.8219 },
        "dropoff": { "address": "South B, Nairobi", "lat": -1.3032, "lng": 36.8442 },
        "package_description": "Documents",
        "recipient_name": "Wanjiku",
        "recipient_phone": "0712345678"
    })
}

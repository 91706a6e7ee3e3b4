//! Cliente M-Pesa (Daraja STK push)
//!
//! El gateway se inyecta como trait para poder sustituirlo en tests. La
//! confirmación del pago llega después por el callback; aquí solo se pide
//! el push y se interpreta el callback.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

use crate::config::{EnvironmentConfig, MpesaConfig};
use crate::dto::payment_dto::StkCallback;
use crate::utils::errors::{upstream_error, AppError, AppResult};
use crate::utils::validation::{mask_phone, normalize_phone};

const EAT_OFFSET_SECONDS: i32 = 3 * 3600;

/// Datos de un STK push
#[derive(Debug, Clone)]
pub struct StkPushRequest {
    /// Teléfono en formato MSISDN (`2547…`)
    pub msisdn: String,
    pub amount: i64,
    pub account_reference: String,
    pub description: String,
}

/// Acuse del gateway
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StkPushAck {
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: Option<String>,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    #[serde(rename = "ResponseCode")]
    pub response_code: Option<String>,
    #[serde(rename = "ResponseDescription")]
    pub response_description: Option<String>,
    #[serde(rename = "CustomerMessage")]
    pub customer_message: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Devuelve éxito solo cuando el gateway aceptó el push
    async fn stk_push(&self, request: &StkPushRequest) -> AppResult<StkPushAck>;
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct StkPushBody<'a> {
    business_short_code: &'a str,
    password: String,
    timestamp: String,
    transaction_type: &'static str,
    amount: i64,
    party_a: &'a str,
    party_b: &'a str,
    phone_number: &'a str,
    #[serde(rename = "CallBackURL")]
    callback_url: &'a str,
    account_reference: &'a str,
    transaction_desc: &'a str,
}

pub struct MpesaClient {
    client: reqwest::Client,
    config: MpesaConfig,
}

impl MpesaClient {
    pub fn new(config: MpesaConfig, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn from_config(config: &EnvironmentConfig) -> AppResult<Self> {
        Self::new(
            config.mpesa.clone(),
            Duration::from_secs(config.upstream_timeout_secs),
        )
    }

    async fn access_token(&self) -> AppResult<String> {
        let url = format!(
            "{}/oauth/v1/generate?grant_type=client_credentials",
            self.config.base_url
        );

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.config.consumer_key, Some(&self.config.consumer_secret))
            .send()
            .await
            .map_err(|e| upstream_error("M-Pesa", e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("❌ M-Pesa OAuth failed: {} {}", status, body);
            return Err(upstream_error("M-Pesa", format!("oauth status {}: {}", status, body)));
        }

        let token: AccessTokenResponse = response
            .json()
            .await
            .map_err(|e| upstream_error("M-Pesa", e.to_string()))?;
        Ok(token.access_token)
    }
}

/// Timestamp `YYYYMMDDHHMMSS` en hora de África Oriental (UTC+3)
pub fn daraja_timestamp(now: DateTime<Utc>) -> String {
    let eat = FixedOffset::east_opt(EAT_OFFSET_SECONDS).unwrap_or(Utc.fix());
    now.with_timezone(&eat).format("%Y%m%d%H%M%S").to_string()
}

/// Password del STK push: base64(shortcode + passkey + timestamp)
pub fn stk_password(short_code: &str, passkey: &str, timestamp: &str) -> String {
    STANDARD.encode(format!("{}{}{}", short_code, passkey, timestamp))
}

#[async_trait]
impl PaymentGateway for MpesaClient {
    async fn stk_push(&self, request: &StkPushRequest) -> AppResult<StkPushAck> {
        let token = self.access_token().await?;
        let timestamp = daraja_timestamp(Utc::now());

        let body = StkPushBody {
            business_short_code: &self.config.short_code,
            password: stk_password(&self.config.short_code, &self.config.passkey, &timestamp),
            timestamp,
            transaction_type: "CustomerPayBillOnline",
            amount: request.amount,
            party_a: &request.msisdn,
            party_b: &self.config.short_code,
            phone_number: &request.msisdn,
            callback_url: &self.config.callback_url,
            account_reference: &request.account_reference,
            transaction_desc: &request.description,
        };

        let response = self
            .client
            .post(format!("{}/mpesa/stkpush/v1/processrequest", self.config.base_url))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| upstream_error("M-Pesa", e.to_string()))?;

        let status = response.status();
        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| upstream_error("M-Pesa", e.to_string()))?;

        if !status.is_success() {
            error!("❌ M-Pesa STK push rejected: {} {}", status, payload);
            return Err(AppError::Upstream {
                message: "M-Pesa request failed".to_string(),
                details: Some(payload),
            });
        }

        let ack: StkPushAck = serde_json::from_value(payload.clone()).map_err(|_| AppError::Upstream {
            message: "M-Pesa returned an unexpected response".to_string(),
            details: Some(payload),
        })?;

        info!(
            "📲 STK push enviado a {} (checkout {})",
            mask_phone(&request.msisdn),
            ack.checkout_request_id
        );
        Ok(ack)
    }
}

/// Callback interpretado
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    Paid {
        checkout_request_id: Option<String>,
        receipt: String,
        /// Monto declarado por Daraja; `None` si no viene
        amount: Option<i64>,
        /// Teléfono normalizado (`+254…`)
        phone: String,
    },
    Failed {
        checkout_request_id: Option<String>,
        result_code: i32,
        result_desc: String,
    },
}

/// Interpretar el callback; pagos sin recibo o teléfono son inválidos
pub fn interpret_callback(callback: &StkCallback) -> AppResult<CallbackOutcome> {
    if callback.result_code != 0 {
        return Ok(CallbackOutcome::Failed {
            checkout_request_id: callback.checkout_request_id.clone(),
            result_code: callback.result_code,
            result_desc: callback.result_desc.clone(),
        });
    }

    let receipt = callback
        .item_string("MpesaReceiptNumber")
        .ok_or_else(|| AppError::BadRequest("Receipt number missing".to_string()))?;
    let raw_phone = callback
        .item_string("PhoneNumber")
        .ok_or_else(|| AppError::BadRequest("Phone number missing".to_string()))?;
    let phone = normalize_phone(&raw_phone)
        .map_err(|_| AppError::BadRequest("Phone number invalid".to_string()))?;
    let amount = callback.item_amount();

    Ok(CallbackOutcome::Paid {
        checkout_request_id: callback.checkout_request_id.clone(),
        receipt,
        amount,
        phone,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::payment_dto::MpesaCallbackEnvelope;
    use chrono::TimeZone;
    use serde_json::json;

    fn envelope(value: serde_json::Value) -> StkCallback {
        serde_json::from_value::<MpesaCallbackEnvelope>(value).unwrap().body.stk_callback
    }

    #[test]
    fn test_timestamp_is_east_africa_time() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 22, 15, 30).unwrap();
        assert_eq!(daraja_timestamp(now), "20250302011530");
    }

    #[test]
    fn test_password_encoding() {
        let password = stk_password("174379", "passkey", "20250302011530");
        let decoded = STANDARD.decode(password).unwrap();
        assert_eq!(String::from_utf8(decoded).unwrap(), "174379passkey20250302011530");
    }

    #[test]
    fn test_successful_callback() {
        let callback = envelope(json!({
            "Body": { "stkCallback": {
                "MerchantRequestID": "29115-34620561-1",
                "CheckoutRequestID": "ws_CO_191220191020363925",
                "ResultCode": 0,
                "ResultDesc": "The service request is processed successfully.",
                "CallbackMetadata": { "Item": [
                    { "Name": "Amount", "Value": 100.0 },
                    { "Name": "MpesaReceiptNumber", "Value": "NLJ7RT61SV" },
                    { "Name": "TransactionDate", "Value": 20191219102115u64 },
                    { "Name": "PhoneNumber", "Value": 254708374149u64 }
                ]}
            }}
        }));

        assert_eq!(
            interpret_callback(&callback).unwrap(),
            CallbackOutcome::Paid {
                checkout_request_id: Some("ws_CO_191220191020363925".into()),
                receipt: "NLJ7RT61SV".into(),
                amount: Some(100),
                phone: "+254708374149".into(),
            }
        );
    }

    #[test]
    fn test_cancelled_callback() {
        let callback = envelope(json!({
            "Body": { "stkCallback": {
                "MerchantRequestID": "29115-34620561-1",
                "CheckoutRequestID": "ws_CO_1",
                "ResultCode": 1032,
                "ResultDesc": "Request cancelled by user"
            }}
        }));

        match interpret_callback(&callback).unwrap() {
            CallbackOutcome::Failed { result_code, .. } => assert_eq!(result_code, 1032),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_success_without_phone_is_rejected() {
        let callback = envelope(json!({
            "Body": { "stkCallback": {
                "CheckoutRequestID": "ws_CO_2",
                "ResultCode": 0,
                "ResultDesc": "ok",
                "CallbackMetadata": { "Item": [
                    { "Name": "MpesaReceiptNumber", "Value": "QWE123" }
                ]}
            }}
        }));

        assert!(matches!(interpret_callback(&callback), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_missing_amount_is_reported_as_unknown() {
        let callback = envelope(json!({
            "Body": { "stkCallback": {
                "CheckoutRequestID": "ws_CO_3",
                "ResultCode": 0,
                "ResultDesc": "ok",
                "CallbackMetadata": { "Item": [
                    { "Name": "MpesaReceiptNumber", "Value": "QWE124" },
                    { "Name": "PhoneNumber", "Value": 254708374149u64 }
                ]}
            }}
        }));

        match interpret_callback(&callback).unwrap() {
            CallbackOutcome::Paid { amount, .. } => assert_eq!(amount, None),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}

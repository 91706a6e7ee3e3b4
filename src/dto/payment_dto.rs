use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::validation::validate_phone;

/// Iniciar el pago de la suscripción (teléfono opcional, por defecto el del rider)
#[derive(Debug, Default, Deserialize, Validate)]
pub struct InitiatePaymentRequest {
    #[validate(custom = "validate_phone")]
    pub phone: Option<String>,
}

/// Recarga del monedero por STK push
#[derive(Debug, Deserialize, Validate)]
pub struct WalletTopUpRequest {
    #[validate(range(min = 1, max = 150000))]
    pub amount: i64,
    #[validate(custom = "validate_phone")]
    pub phone: Option<String>,
}

/// Respuesta tras aceptar el STK push
#[derive(Debug, Serialize)]
pub struct PaymentInitiatedResponse {
    pub checkout_request_id: String,
    pub merchant_request_id: Option<String>,
    pub amount: i64,
    pub phone: String,
    pub customer_message: Option<String>,
}

/// Cuerpo del callback de Daraja
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MpesaCallbackEnvelope {
    #[serde(rename = "Body")]
    pub body: MpesaCallbackBody,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MpesaCallbackBody {
    #[serde(rename = "stkCallback")]
    pub stk_callback: StkCallback,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StkCallback {
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: Option<String>,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: Option<String>,
    #[serde(rename = "ResultCode")]
    pub result_code: i32,
    #[serde(rename = "ResultDesc", default)]
    pub result_desc: String,
    #[serde(rename = "CallbackMetadata")]
    pub callback_metadata: Option<CallbackMetadata>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CallbackMetadata {
    #[serde(rename = "Item", default)]
    pub items: Vec<CallbackItem>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CallbackItem {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Value")]
    pub value: Option<serde_json::Value>,
}

impl StkCallback {
    /// Buscar un elemento de metadata por nombre
    pub fn item(&self, name: &str) -> Option<&serde_json::Value> {
        self.callback_metadata
            .as_ref()?
            .items
            .iter()
            .find(|item| item.name == name)?
            .value
            .as_ref()
    }

    /// Valor como texto; M-Pesa envía teléfonos y recibos como número o string
    pub fn item_string(&self, name: &str) -> Option<String> {
        match self.item(name)? {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn item_amount(&self) -> Option<i64> {
        match self.item("Amount")? {
            serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.round() as i64),
            _ => None,
        }
    }
}

/// Respuesta al gateway
#[derive(Debug, Serialize)]
pub struct CallbackAck {
    pub message: String,
}

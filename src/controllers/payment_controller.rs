//! Pagos M-Pesa: inicio del STK push y liquidación del callback

use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::dto::payment_dto::{
    CallbackAck, InitiatePaymentRequest, MpesaCallbackEnvelope, PaymentInitiatedResponse,
    WalletTopUpRequest,
};
use crate::models::client::Client;
use crate::models::payment::{
    NewPaymentIntent, PaymentIntent, PaymentPurpose, Settlement, SettlementOutcome,
    SettlementTarget,
};
use crate::models::rider::Rider;
use crate::repositories::{PaymentRepository, RiderRepository};
use crate::services::mpesa_service::{interpret_callback, CallbackOutcome, PaymentGateway, StkPushRequest};
use crate::state::AppState;
use crate::utils::errors::{AppError, AppResult};
use crate::utils::validation::{mask_phone, normalize_phone, to_msisdn};

pub struct PaymentController {
    gateway: Arc<dyn PaymentGateway>,
    payments: Arc<dyn PaymentRepository>,
    riders: Arc<dyn RiderRepository>,
    subscription_price: i64,
    subscription_days: i64,
    account_reference: String,
}

impl PaymentController {
    pub fn new(state: &AppState) -> Self {
        Self {
            gateway: state.gateway.clone(),
            payments: state.payments.clone(),
            riders: state.riders.clone(),
            subscription_price: state.config.subscription_price,
            subscription_days: state.config.subscription_days,
            account_reference: state.config.mpesa.account_reference.clone(),
        }
    }

    /// Cobrar la suscripción mensual del rider
    pub async fn initiate_subscription(
        &self,
        rider: &Rider,
        request: InitiatePaymentRequest,
    ) -> AppResult<PaymentInitiatedResponse> {
        request.validate()?;
        let phone = match request.phone {
            Some(phone) => normalize_phone(&phone)?,
            None => rider.phone.clone(),
        };

        self.push(
            PaymentPurpose::Subscription,
            rider.id,
            phone,
            self.subscription_price,
            "RiderGo subscription",
        )
        .await
    }

    /// Recargar el monedero del cliente
    pub async fn initiate_wallet_top_up(
        &self,
        client: &Client,
        request: WalletTopUpRequest,
    ) -> AppResult<PaymentInitiatedResponse> {
        request.validate()?;
        let phone = match request.phone {
            Some(phone) => normalize_phone(&phone)?,
            None => client.phone.clone(),
        };

        self.push(
            PaymentPurpose::WalletTopUp,
            client.id,
            phone,
            request.amount,
            "RiderGo wallet top-up",
        )
        .await
    }

    /// El intento solo se registra cuando el gateway aceptó el push
    async fn push(
        &self,
        purpose: PaymentPurpose,
        account_id: Uuid,
        phone: String,
        amount: i64,
        description: &str,
    ) -> AppResult<PaymentInitiatedResponse> {
        let ack = self
            .gateway
            .stk_push(&StkPushRequest {
                msisdn: to_msisdn(&phone),
                amount,
                account_reference: self.account_reference.clone(),
                description: description.to_string(),
            })
            .await
            .map_err(|e| {
                error!("❌ STK push rechazado para {}: {}", mask_phone(&phone), e);
                e
            })?;

        let intent = PaymentIntent::new(
            NewPaymentIntent {
                checkout_request_id: ack.checkout_request_id.clone(),
                merchant_request_id: ack.merchant_request_id.clone(),
                purpose,
                account_id,
                phone: phone.clone(),
                amount,
            },
            Utc::now(),
        );
        self.payments.record_intent(&intent).await?;

        info!(
            "💳 Pago {} iniciado ({}, KES {})",
            intent.checkout_request_id,
            purpose.as_str(),
            amount
        );

        Ok(PaymentInitiatedResponse {
            checkout_request_id: ack.checkout_request_id,
            merchant_request_id: ack.merchant_request_id,
            amount,
            phone,
            customer_message: ack.customer_message,
        })
    }

    /// Procesar el callback de Daraja
    pub async fn handle_callback(&self, envelope: MpesaCallbackEnvelope) -> AppResult<CallbackAck> {
        let callback = envelope.body.stk_callback;
        let now = Utc::now();

        match interpret_callback(&callback)? {
            CallbackOutcome::Failed {
                checkout_request_id,
                result_code,
                result_desc,
            } => {
                warn!("⚠️ Pago fallido ({}): {}", result_code, result_desc);
                if let Some(checkout) = checkout_request_id {
                    self.payments
                        .mark_failed(&checkout, result_code, &result_desc, now)
                        .await?;
                }
                Ok(CallbackAck {
                    message: "Payment failure recorded".to_string(),
                })
            }
            CallbackOutcome::Paid {
                checkout_request_id,
                receipt,
                amount,
                phone,
            } => {
                let (target, amount) = self
                    .resolve_target(checkout_request_id.as_deref(), &phone, amount)
                    .await?;

                let settlement = Settlement {
                    checkout_request_id,
                    receipt: receipt.clone(),
                    amount,
                    phone,
                    target,
                    now,
                };

                match self.payments.settle(&settlement).await? {
                    SettlementOutcome::Applied => {
                        info!("✅ Pago {} aplicado ({})", receipt, target.purpose().as_str());
                        Ok(CallbackAck {
                            message: "Payment processed".to_string(),
                        })
                    }
                    SettlementOutcome::AlreadyProcessed => {
                        info!("🔁 Recibo {} ya procesado", receipt);
                        Ok(CallbackAck {
                            message: "Payment already processed".to_string(),
                        })
                    }
                }
            }
        }
    }

    /// Destino y monto del pago: el intento registrado o, en su defecto, el
    /// rider dueño del teléfono pagador. El monto liquidado nunca sale del
    /// callback cuando hay intento.
    async fn resolve_target(
        &self,
        checkout_request_id: Option<&str>,
        phone: &str,
        amount: Option<i64>,
    ) -> AppResult<(SettlementTarget, i64)> {
        if let Some(checkout) = checkout_request_id {
            if let Some(intent) = self.payments.find_by_checkout(checkout).await? {
                if let Some(reported) = amount {
                    if reported != intent.amount {
                        warn!(
                            "⚠️ Monto del callback {} no coincide con el intento ({} != {})",
                            checkout, reported, intent.amount
                        );
                        return Err(AppError::BadRequest(
                            "Payment amount does not match the request".to_string(),
                        ));
                    }
                }
                let target = match intent.purpose {
                    PaymentPurpose::Subscription => SettlementTarget::Subscription {
                        rider_id: intent.account_id,
                        days: self.subscription_days,
                    },
                    PaymentPurpose::WalletTopUp => SettlementTarget::WalletTopUp {
                        client_id: intent.account_id,
                    },
                };
                return Ok((target, intent.amount));
            }
        }

        // sin intento solo se acepta el pago completo de la suscripción
        let amount = match amount {
            Some(amount) if amount >= self.subscription_price => amount,
            _ => {
                warn!("⚠️ Pago sin intento por debajo de la suscripción de {}", mask_phone(phone));
                return Err(AppError::BadRequest(
                    "Payment amount does not cover the subscription".to_string(),
                ));
            }
        };

        let rider = self.riders.find_by_phone(phone).await?.ok_or_else(|| {
            warn!("❓ Callback sin destino para {}", mask_phone(phone));
            AppError::NotFound("No account matches this payment".to_string())
        })?;

        Ok((
            SettlementTarget::Subscription {
                rider_id: rider.id,
                days: self.subscription_days,
            },
            amount,
        ))
    }
}

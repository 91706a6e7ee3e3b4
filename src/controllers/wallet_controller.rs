use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::dto::wallet_dto::{LoadWalletRequest, WalletBalance};
use crate::models::wallet::{Wallet, WalletTransaction};
use crate::repositories::WalletRepository;
use crate::state::AppState;
use crate::utils::errors::AppResult;

/// Monedero del cliente
pub struct WalletController {
    wallets: Arc<dyn WalletRepository>,
}

impl WalletController {
    pub fn new(state: &AppState) -> Self {
        Self {
            wallets: state.wallets.clone(),
        }
    }

    /// Abonar saldo; crea el monedero en el primer abono
    pub async fn load(&self, client_id: Uuid, request: LoadWalletRequest) -> AppResult<Wallet> {
        request.validate()?;
        let reference = request
            .reference
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());

        let wallet = self
            .wallets
            .credit(client_id, request.amount, reference, Utc::now())
            .await?;

        log::info!("👛 Wallet de {} +{} (saldo {})", client_id, request.amount, wallet.balance);
        Ok(wallet)
    }

    /// Sin monedero el saldo es 0
    pub async fn balance(&self, client_id: Uuid) -> AppResult<WalletBalance> {
        Ok(match self.wallets.find_by_client(client_id).await? {
            Some(wallet) => WalletBalance {
                balance: wallet.balance,
                last_transaction_at: wallet.last_transaction_at,
            },
            None => WalletBalance {
                balance: 0,
                last_transaction_at: None,
            },
        })
    }

    pub async fn transactions(&self, client_id: Uuid) -> AppResult<Vec<WalletTransaction>> {
        self.wallets.transactions(client_id).await
    }
}

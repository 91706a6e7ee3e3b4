//! Almacenamiento en memoria
//!
//! Implementa todos los repositorios sobre un único mutex. Se usa en
//! desarrollo sin `DATABASE_URL`/`REDIS_URL` y en los tests de integración.
//! Cada operación toma el lock una sola vez, así que las transiciones
//! condicionales son atómicas igual que en PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::client::{Client, ClientProfileChanges};
use crate::models::message::Message;
use crate::models::otp::{OtpRecord, OtpSendState};
use crate::models::payment::{
    extended_expiry, PaymentIntent, PaymentStatus, Settlement, SettlementOutcome, SettlementTarget,
};
use crate::models::rider::{Rider, RiderProfileChanges};
use crate::models::trip::{LiveLocation, Trip, TripStatus};
use crate::models::wallet::{Direction, Wallet, WalletTransaction};
use crate::repositories::{
    ClientRepository, MessageRepository, OtpRepository, PaymentRepository, RiderRepository,
    TripActor, TripRepository, WalletRepository,
};
use crate::utils::errors::{not_found_error, AppError, AppResult};

#[derive(Default)]
struct Tables {
    trips: HashMap<Uuid, Trip>,
    riders: HashMap<Uuid, Rider>,
    clients: HashMap<Uuid, Client>,
    wallets: HashMap<Uuid, Wallet>,
    wallet_transactions: Vec<WalletTransaction>,
    messages: Vec<Message>,
    payments: HashMap<String, PaymentIntent>,
    receipts: HashSet<String>,
    otps: HashMap<String, OtpRecord>,
}

impl Tables {
    fn credit(&mut self, client_id: Uuid, amount: i64, reference: Option<String>, now: DateTime<Utc>) -> Wallet {
        let wallet = self
            .wallets
            .entry(client_id)
            .or_insert_with(|| Wallet::new(client_id, now));
        wallet.balance += amount;
        wallet.last_transaction_at = Some(now);
        wallet.updated_at = now;
        let wallet = wallet.clone();

        self.wallet_transactions.push(WalletTransaction {
            id: Uuid::new_v4(),
            wallet_id: wallet.id,
            amount,
            direction: Direction::Credit,
            reference,
            created_at: now,
        });
        wallet
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(mut trips: Vec<Trip>) -> Vec<Trip> {
    trips.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    trips
}

#[async_trait]
impl TripRepository for MemoryStore {
    async fn insert(&self, trip: &Trip) -> AppResult<()> {
        self.tables.lock().await.trips.insert(trip.id, trip.clone());
        Ok(())
    }

    async fn insert_with_wallet_debit(&self, trip: &Trip, amount: i64) -> AppResult<()> {
        let mut tables = self.tables.lock().await;

        let wallet = match tables.wallets.get_mut(&trip.client_id) {
            Some(wallet) if wallet.balance >= amount => wallet,
            _ => return Err(AppError::Conflict("Insufficient wallet balance".to_string())),
        };
        wallet.balance -= amount;
        wallet.last_transaction_at = Some(trip.created_at);
        wallet.updated_at = trip.created_at;
        let wallet_id = wallet.id;

        tables.wallet_transactions.push(WalletTransaction {
            id: Uuid::new_v4(),
            wallet_id,
            amount,
            direction: Direction::Debit,
            reference: Some(format!("trip:{}", trip.id)),
            created_at: trip.created_at,
        });
        tables.trips.insert(trip.id, trip.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Trip>> {
        Ok(self.tables.lock().await.trips.get(&id).cloned())
    }

    async fn list_open(&self, rider_id: Uuid) -> AppResult<Vec<Trip>> {
        let tables = self.tables.lock().await;
        let open = tables
            .trips
            .values()
            .filter(|t| t.is_available_for(rider_id))
            .cloned()
            .collect();
        Ok(newest_first(open))
    }

    async fn try_assign(&self, trip_id: Uuid, rider_id: Uuid, now: DateTime<Utc>) -> AppResult<Option<Trip>> {
        let mut tables = self.tables.lock().await;
        match tables.trips.get_mut(&trip_id) {
            Some(trip) if trip.is_available_for(rider_id) => {
                trip.rider_id = Some(rider_id);
                trip.status = TripStatus::Accepted;
                trip.updated_at = now;
                Ok(Some(trip.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn transition(
        &self,
        trip_id: Uuid,
        actor: TripActor,
        from: &[TripStatus],
        to: TripStatus,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Trip>> {
        let mut tables = self.tables.lock().await;
        match tables.trips.get_mut(&trip_id) {
            Some(trip) if actor.may_act_on(trip) && from.contains(&trip.status) => {
                trip.status = to;
                trip.updated_at = now;
                Ok(Some(trip.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn add_rejection(&self, trip_id: Uuid, rider_id: Uuid, now: DateTime<Utc>) -> AppResult<Option<Trip>> {
        let mut tables = self.tables.lock().await;
        match tables.trips.get_mut(&trip_id) {
            Some(trip) if trip.status == TripStatus::INITIAL && trip.rider_id.is_none() => {
                if !trip.was_rejected_by(rider_id) {
                    trip.rejected_riders.push(rider_id);
                }
                trip.updated_at = now;
                Ok(Some(trip.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn update_location(&self, trip_id: Uuid, rider_id: Uuid, location: LiveLocation) -> AppResult<Option<Trip>> {
        let mut tables = self.tables.lock().await;
        match tables.trips.get_mut(&trip_id) {
            Some(trip) if trip.is_assigned_to(rider_id) => {
                trip.current_location = Some(location);
                trip.updated_at = location.updated_at;
                Ok(Some(trip.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn list_for_rider(&self, rider_id: Uuid, statuses: &[TripStatus]) -> AppResult<Vec<Trip>> {
        let tables = self.tables.lock().await;
        let trips = tables
            .trips
            .values()
            .filter(|t| t.is_assigned_to(rider_id) && statuses.contains(&t.status))
            .cloned()
            .collect();
        Ok(newest_first(trips))
    }

    async fn list_for_client(&self, client_id: Uuid) -> AppResult<Vec<Trip>> {
        let tables = self.tables.lock().await;
        let trips = tables
            .trips
            .values()
            .filter(|t| t.is_requested_by(client_id))
            .cloned()
            .collect();
        Ok(newest_first(trips))
    }
}

#[async_trait]
impl RiderRepository for MemoryStore {
    async fn insert(&self, rider: &Rider) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        let duplicate = tables
            .riders
            .values()
            .any(|r| r.phone == rider.phone || r.email.eq_ignore_ascii_case(&rider.email));
        if duplicate {
            return Err(AppError::Conflict(
                "Rider with this phone or email already exists".to_string(),
            ));
        }
        tables.riders.insert(rider.id, rider.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Rider>> {
        Ok(self.tables.lock().await.riders.get(&id).cloned())
    }

    async fn find_by_phone(&self, phone: &str) -> AppResult<Option<Rider>> {
        let tables = self.tables.lock().await;
        Ok(tables.riders.values().find(|r| r.phone == phone).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Rider>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .riders
            .values()
            .find(|r| r.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn mark_verified(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<Option<Rider>> {
        let mut tables = self.tables.lock().await;
        Ok(tables.riders.get_mut(&id).map(|rider| {
            rider.is_verified = true;
            rider.updated_at = now;
            rider.clone()
        }))
    }

    async fn record_otp_sent(&self, id: Uuid, previous: &OtpSendState, next: &OtpSendState) -> AppResult<bool> {
        let mut tables = self.tables.lock().await;
        match tables.riders.get_mut(&id) {
            Some(rider) if rider.otp_send_state() == *previous => {
                rider.apply_otp_send_state(next);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: RiderProfileChanges,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Rider>> {
        let mut tables = self.tables.lock().await;
        Ok(tables.riders.get_mut(&id).map(|rider| {
            rider.apply_profile(changes);
            rider.updated_at = now;
            rider.clone()
        }))
    }
}

#[async_trait]
impl ClientRepository for MemoryStore {
    async fn find_or_create_by_phone(&self, phone: &str, now: DateTime<Utc>) -> AppResult<(Client, bool)> {
        let mut tables = self.tables.lock().await;
        if let Some(existing) = tables.clients.values().find(|c| c.phone == phone) {
            return Ok((existing.clone(), false));
        }
        let client = Client::new(phone.to_string(), now);
        tables.clients.insert(client.id, client.clone());
        Ok((client, true))
    }

    async fn find_by_phone(&self, phone: &str) -> AppResult<Option<Client>> {
        let tables = self.tables.lock().await;
        Ok(tables.clients.values().find(|c| c.phone == phone).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Client>> {
        Ok(self.tables.lock().await.clients.get(&id).cloned())
    }

    async fn record_otp_sent(&self, id: Uuid, previous: &OtpSendState, next: &OtpSendState) -> AppResult<bool> {
        let mut tables = self.tables.lock().await;
        match tables.clients.get_mut(&id) {
            Some(client) if client.otp_send_state() == *previous => {
                client.apply_otp_send_state(next);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: ClientProfileChanges,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Client>> {
        let mut tables = self.tables.lock().await;
        Ok(tables.clients.get_mut(&id).map(|client| {
            client.apply_profile(changes);
            client.updated_at = now;
            client.clone()
        }))
    }
}

#[async_trait]
impl WalletRepository for MemoryStore {
    async fn credit(
        &self,
        client_id: Uuid,
        amount: i64,
        reference: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<Wallet> {
        Ok(self.tables.lock().await.credit(client_id, amount, reference, now))
    }

    async fn find_by_client(&self, client_id: Uuid) -> AppResult<Option<Wallet>> {
        Ok(self.tables.lock().await.wallets.get(&client_id).cloned())
    }

    async fn transactions(&self, client_id: Uuid) -> AppResult<Vec<WalletTransaction>> {
        let tables = self.tables.lock().await;
        let Some(wallet) = tables.wallets.get(&client_id) else {
            return Ok(Vec::new());
        };
        let mut entries: Vec<WalletTransaction> = tables
            .wallet_transactions
            .iter()
            .filter(|t| t.wallet_id == wallet.id)
            .cloned()
            .collect();
        entries.reverse();
        Ok(entries)
    }
}

#[async_trait]
impl MessageRepository for MemoryStore {
    async fn insert(&self, message: &Message) -> AppResult<()> {
        self.tables.lock().await.messages.push(message.clone());
        Ok(())
    }

    async fn list_for_trip(&self, trip_id: Uuid) -> AppResult<Vec<Message>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .messages
            .iter()
            .filter(|m| m.trip_id == trip_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PaymentRepository for MemoryStore {
    async fn record_intent(&self, intent: &PaymentIntent) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        tables
            .payments
            .insert(intent.checkout_request_id.clone(), intent.clone());
        Ok(())
    }

    async fn find_by_checkout(&self, checkout_request_id: &str) -> AppResult<Option<PaymentIntent>> {
        Ok(self.tables.lock().await.payments.get(checkout_request_id).cloned())
    }

    async fn mark_failed(
        &self,
        checkout_request_id: &str,
        result_code: i32,
        result_desc: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        if let Some(intent) = tables.payments.get_mut(checkout_request_id) {
            if intent.status == PaymentStatus::Initiated {
                intent.status = PaymentStatus::Failed;
                intent.result_code = Some(result_code);
                intent.result_desc = Some(result_desc.to_string());
                intent.updated_at = now;
            }
        }
        Ok(())
    }

    async fn settle(&self, settlement: &Settlement) -> AppResult<SettlementOutcome> {
        let mut tables = self.tables.lock().await;
        if tables.receipts.contains(&settlement.receipt) {
            return Ok(SettlementOutcome::AlreadyProcessed);
        }

        match settlement.target {
            SettlementTarget::Subscription { rider_id, days } => {
                let rider = tables
                    .riders
                    .get_mut(&rider_id)
                    .ok_or_else(|| not_found_error("Rider", &rider_id.to_string()))?;
                rider.subscription_active = true;
                rider.subscription_expires_at =
                    Some(extended_expiry(rider.subscription_expires_at, settlement.now, days));
                rider.last_payment_ref = Some(settlement.receipt.clone());
                rider.updated_at = settlement.now;
            }
            SettlementTarget::WalletTopUp { client_id } => {
                tables.credit(
                    client_id,
                    settlement.amount,
                    Some(settlement.receipt.clone()),
                    settlement.now,
                );
            }
        }

        if let Some(checkout_request_id) = &settlement.checkout_request_id {
            if let Some(intent) = tables.payments.get_mut(checkout_request_id) {
                intent.status = PaymentStatus::Completed;
                intent.receipt_number = Some(settlement.receipt.clone());
                intent.result_code = Some(0);
                intent.updated_at = settlement.now;
            }
        }

        tables.receipts.insert(settlement.receipt.clone());
        Ok(SettlementOutcome::Applied)
    }
}

#[async_trait]
impl OtpRepository for MemoryStore {
    async fn replace(&self, record: &OtpRecord) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        tables.otps.insert(record.phone.clone(), record.clone());
        Ok(())
    }

    async fn find(&self, phone: &str) -> AppResult<Option<OtpRecord>> {
        Ok(self.tables.lock().await.otps.get(phone).cloned())
    }

    async fn consume(&self, phone: &str, code: &str) -> AppResult<bool> {
        let mut tables = self.tables.lock().await;
        match tables.otps.get(phone) {
            Some(record) if record.code == code => {
                tables.otps.remove(phone);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn purge(&self, phone: &str) -> AppResult<()> {
        self.tables.lock().await.otps.remove(phone);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::trip::{NewTrip, Place, ServiceType, TripDetails};
    use std::sync::Arc;

    fn trip(client_id: Uuid, now: DateTime<Utc>) -> Trip {
        Trip::new(
            NewTrip {
                client_id,
                service_type: ServiceType::Delivery,
                pickup: Place { address: "Ngong Rd".into(), latitude: None, longitude: None },
                dropoff: Place { address: "Karen".into(), latitude: None, longitude: None },
                price: 200,
                posting_fee_amount: 100,
                details: TripDetails::Delivery {
                    package_description: "Parcel".into(),
                    recipient_name: None,
                    recipient_phone: None,
                    special_instructions: None,
                },
            },
            now,
        )
    }

    #[tokio::test]
    async fn test_try_assign_only_once() {
        let store = MemoryStore::new();
        let trip = trip(Uuid::new_v4(), Utc::now());
        TripRepository::insert(&store, &trip).await.unwrap();

        let first = store.try_assign(trip.id, Uuid::new_v4(), Utc::now()).await.unwrap();
        let second = store.try_assign(trip.id, Uuid::new_v4(), Utc::now()).await.unwrap();

        assert!(first.is_some());
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_wallet_debit_is_all_or_nothing() {
        let store = Arc::new(MemoryStore::new());
        let client_id = Uuid::new_v4();
        let now = Utc::now();
        store.credit(client_id, 50, None, now).await.unwrap();

        let trip = trip(client_id, now).with_posting_fee_from_wallet();
        let result = store.insert_with_wallet_debit(&trip, 100).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert!(TripRepository::find_by_id(store.as_ref(), trip.id).await.unwrap().is_none());
        assert_eq!(store.find_by_client(client_id).await.unwrap().unwrap().balance, 50);

        store.credit(client_id, 50, None, now).await.unwrap();
        store.insert_with_wallet_debit(&trip, 100).await.unwrap();
        assert_eq!(store.find_by_client(client_id).await.unwrap().unwrap().balance, 0);
        assert_eq!(store.transactions(client_id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_otp_consume_is_single_use() {
        let store = MemoryStore::new();
        let record = OtpRecord {
            phone: "+254700000001".into(),
            code: "123456".into(),
            expires_at: Utc::now(),
        };
        store.replace(&record).await.unwrap();

        assert!(!store.consume(&record.phone, "000000").await.unwrap());
        assert!(store.consume(&record.phone, "123456").await.unwrap());
        assert!(!store.consume(&record.phone, "123456").await.unwrap());
    }
}

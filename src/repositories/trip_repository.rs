//! Repositorio de viajes
//!
//! Todas las mutaciones se expresan como UPDATE condicionales: la condición
//! de estado y de propiedad viaja en el WHERE, de modo que dos peticiones
//! concurrentes nunca aplican la misma transición.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgConnection;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::trip::{LiveLocation, Trip, TripRow, TripStatus};
use crate::models::wallet::Direction;
use crate::utils::errors::{AppError, AppResult};

/// Quién intenta mutar el viaje
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripActor {
    Client(Uuid),
    Rider(Uuid),
}

impl TripActor {
    pub fn may_act_on(&self, trip: &Trip) -> bool {
        match self {
            TripActor::Client(id) => trip.is_requested_by(*id),
            TripActor::Rider(id) => trip.is_assigned_to(*id),
        }
    }
}

#[async_trait]
pub trait TripRepository: Send + Sync {
    async fn insert(&self, trip: &Trip) -> AppResult<()>;

    /// Insertar el viaje y debitar el monedero del cliente en una sola
    /// transacción. Saldo insuficiente: `Conflict` y no se escribe nada.
    async fn insert_with_wallet_debit(&self, trip: &Trip, amount: i64) -> AppResult<()>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Trip>>;

    /// Viajes abiertos sin rider, más recientes primero, sin los rechazados
    /// por `rider_id`
    async fn list_open(&self, rider_id: Uuid) -> AppResult<Vec<Trip>>;

    /// Asignar atómicamente si el viaje sigue `pending` y sin rider
    async fn try_assign(&self, trip_id: Uuid, rider_id: Uuid, now: DateTime<Utc>) -> AppResult<Option<Trip>>;

    /// Transición condicionada al estado actual y al actor
    async fn transition(
        &self,
        trip_id: Uuid,
        actor: TripActor,
        from: &[TripStatus],
        to: TripStatus,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Trip>>;

    /// Registrar el rechazo de un viaje todavía abierto
    async fn add_rejection(&self, trip_id: Uuid, rider_id: Uuid, now: DateTime<Utc>) -> AppResult<Option<Trip>>;

    /// Sobrescribir la última posición; solo el rider asignado
    async fn update_location(&self, trip_id: Uuid, rider_id: Uuid, location: LiveLocation) -> AppResult<Option<Trip>>;

    async fn list_for_rider(&self, rider_id: Uuid, statuses: &[TripStatus]) -> AppResult<Vec<Trip>>;

    async fn list_for_client(&self, client_id: Uuid) -> AppResult<Vec<Trip>>;
}

pub struct PgTripRepository {
    pool: PgPool,
}

impl PgTripRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn status_strings(statuses: &[TripStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

fn into_trips(rows: Vec<TripRow>) -> AppResult<Vec<Trip>> {
    rows.into_iter().map(Trip::try_from).collect()
}

async fn insert_trip(conn: &mut PgConnection, trip: &Trip) -> AppResult<()> {
    let (current_lat, current_lng, location_updated_at) = match trip.current_location {
        Some(loc) => (Some(loc.latitude), Some(loc.longitude), Some(loc.updated_at)),
        None => (None, None, None),
    };

    sqlx::query(
        r#"
        INSERT INTO trips (
            id, client_id, rider_id, service_type, status,
            pickup_address, pickup_lat, pickup_lng,
            dropoff_address, dropoff_lat, dropoff_lng,
            current_lat, current_lng, location_updated_at,
            price, posting_fee_paid, posting_fee_amount, client_wallet_used,
            extra_wallet_stored, rider_cash_expected, details, rejected_riders,
            created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                $15, $16, $17, $18, $19, $20, $21, $22, $23, $24)
        "#,
    )
    .bind(trip.id)
    .bind(trip.client_id)
    .bind(trip.rider_id)
    .bind(trip.service_type.as_str())
    .bind(trip.status.as_str())
    .bind(&trip.pickup.address)
    .bind(trip.pickup.latitude)
    .bind(trip.pickup.longitude)
    .bind(&trip.dropoff.address)
    .bind(trip.dropoff.latitude)
    .bind(trip.dropoff.longitude)
    .bind(current_lat)
    .bind(current_lng)
    .bind(location_updated_at)
    .bind(trip.price)
    .bind(trip.posting_fee_paid)
    .bind(trip.posting_fee_amount)
    .bind(trip.client_wallet_used)
    .bind(trip.extra_wallet_stored)
    .bind(trip.rider_cash_expected)
    .bind(Json(&trip.details))
    .bind(&trip.rejected_riders)
    .bind(trip.created_at)
    .bind(trip.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[async_trait]
impl TripRepository for PgTripRepository {
    async fn insert(&self, trip: &Trip) -> AppResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert_trip(&mut conn, trip).await
    }

    async fn insert_with_wallet_debit(&self, trip: &Trip, amount: i64) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let wallet_id: Option<(Uuid,)> = sqlx::query_as(
            r#"
            UPDATE wallets
            SET balance = balance - $2, last_transaction_at = $3, updated_at = $3
            WHERE client_id = $1 AND balance >= $2
            RETURNING id
            "#,
        )
        .bind(trip.client_id)
        .bind(amount)
        .bind(trip.created_at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((wallet_id,)) = wallet_id else {
            tx.rollback().await?;
            return Err(AppError::Conflict("Insufficient wallet balance".to_string()));
        };

        sqlx::query(
            r#"
            INSERT INTO wallet_transactions (id, wallet_id, amount, direction, reference, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(wallet_id)
        .bind(amount)
        .bind(Direction::Debit.as_str())
        .bind(format!("trip:{}", trip.id))
        .bind(trip.created_at)
        .execute(&mut *tx)
        .await?;

        insert_trip(&mut tx, trip).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Trip>> {
        let row = sqlx::query_as::<_, TripRow>("SELECT * FROM trips WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Trip::try_from).transpose()
    }

    async fn list_open(&self, rider_id: Uuid) -> AppResult<Vec<Trip>> {
        let rows = sqlx::query_as::<_, TripRow>(
            r#"
            SELECT * FROM trips
            WHERE status = $1 AND rider_id IS NULL AND NOT ($2 = ANY(rejected_riders))
            ORDER BY created_at DESC
            "#,
        )
        .bind(TripStatus::INITIAL.as_str())
        .bind(rider_id)
        .fetch_all(&self.pool)
        .await?;

        into_trips(rows)
    }

    async fn try_assign(&self, trip_id: Uuid, rider_id: Uuid, now: DateTime<Utc>) -> AppResult<Option<Trip>> {
        let row = sqlx::query_as::<_, TripRow>(
            r#"
            UPDATE trips
            SET rider_id = $2, status = $3, updated_at = $4
            WHERE id = $1
              AND status = $5
              AND rider_id IS NULL
              AND NOT ($2 = ANY(rejected_riders))
            RETURNING *
            "#,
        )
        .bind(trip_id)
        .bind(rider_id)
        .bind(TripStatus::Accepted.as_str())
        .bind(now)
        .bind(TripStatus::INITIAL.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Trip::try_from).transpose()
    }

    async fn transition(
        &self,
        trip_id: Uuid,
        actor: TripActor,
        from: &[TripStatus],
        to: TripStatus,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Trip>> {
        let (column, actor_id) = match actor {
            TripActor::Client(id) => ("client_id", id),
            TripActor::Rider(id) => ("rider_id", id),
        };

        let sql = format!(
            r#"
            UPDATE trips
            SET status = $2, updated_at = $3
            WHERE id = $1 AND {} = $4 AND status = ANY($5)
            RETURNING *
            "#,
            column
        );

        let row = sqlx::query_as::<_, TripRow>(&sql)
            .bind(trip_id)
            .bind(to.as_str())
            .bind(now)
            .bind(actor_id)
            .bind(status_strings(from))
            .fetch_optional(&self.pool)
            .await?;

        row.map(Trip::try_from).transpose()
    }

    async fn add_rejection(&self, trip_id: Uuid, rider_id: Uuid, now: DateTime<Utc>) -> AppResult<Option<Trip>> {
        let row = sqlx::query_as::<_, TripRow>(
            r#"
            UPDATE trips
            SET rejected_riders = CASE
                    WHEN $2 = ANY(rejected_riders) THEN rejected_riders
                    ELSE array_append(rejected_riders, $2)
                END,
                updated_at = $3
            WHERE id = $1 AND status = $4 AND rider_id IS NULL
            RETURNING *
            "#,
        )
        .bind(trip_id)
        .bind(rider_id)
        .bind(now)
        .bind(TripStatus::INITIAL.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Trip::try_from).transpose()
    }

    async fn update_location(&self, trip_id: Uuid, rider_id: Uuid, location: LiveLocation) -> AppResult<Option<Trip>> {
        let row = sqlx::query_as::<_, TripRow>(
            r#"
            UPDATE trips
            SET current_lat = $3, current_lng = $4, location_updated_at = $5, updated_at = $5
            WHERE id = $1 AND rider_id = $2
            RETURNING *
            "#,
        )
        .bind(trip_id)
        .bind(rider_id)
        .bind(location.latitude)
        .bind(location.longitude)
        .bind(location.updated_at)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Trip::try_from).transpose()
    }

    async fn list_for_rider(&self, rider_id: Uuid, statuses: &[TripStatus]) -> AppResult<Vec<Trip>> {
        let rows = sqlx::query_as::<_, TripRow>(
            r#"
            SELECT * FROM trips
            WHERE rider_id = $1 AND status = ANY($2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(rider_id)
        .bind(status_strings(statuses))
        .fetch_all(&self.pool)
        .await?;

        into_trips(rows)
    }

    async fn list_for_client(&self, client_id: Uuid) -> AppResult<Vec<Trip>> {
        let rows = sqlx::query_as::<_, TripRow>(
            "SELECT * FROM trips WHERE client_id = $1 ORDER BY created_at DESC",
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;

        into_trips(rows)
    }
}

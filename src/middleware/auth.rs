//! Middleware de autenticación JWT
//!
//! Este módulo resuelve el principal del token bearer (cliente o rider),
//! carga su cuenta y la inyecta en las extensions de la request.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{
    models::{client::Client, rider::Rider},
    repositories::TripActor,
    state::AppState,
    utils::{
        errors::AppError,
        jwt::{extract_token_from_header, verify_token, JwtClaims, PrincipalRole},
    },
};

/// Cliente autenticado
#[derive(Debug, Clone)]
pub struct AuthenticatedClient(pub Client);

/// Rider autenticado
#[derive(Debug, Clone)]
pub struct AuthenticatedRider(pub Rider);

/// Cualquier participante de un viaje
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub role: PrincipalRole,
}

impl Principal {
    pub fn actor(&self) -> TripActor {
        match self.role {
            PrincipalRole::Client => TripActor::Client(self.id),
            PrincipalRole::Rider => TripActor::Rider(self.id),
        }
    }
}

/// Decodificar el token de la request
fn claims_from_request(state: &AppState, request: &Request) -> Result<JwtClaims, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Not authorized, no token".to_string()))?;

    let token = extract_token_from_header(auth_header)?;
    verify_token(token, &state.jwt)
}

async fn load_client(state: &AppState, id: Uuid) -> Result<Client, AppError> {
    state
        .clients
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Client not found".to_string()))
}

async fn load_rider(state: &AppState, id: Uuid) -> Result<Rider, AppError> {
    state
        .riders
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Rider not found".to_string()))
}

/// Solo clientes
pub async fn require_client(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = claims_from_request(&state, &request)?;
    if claims.role != PrincipalRole::Client {
        return Err(AppError::Forbidden("Client account required".to_string()));
    }

    let client = load_client(&state, claims.subject_id()?).await?;
    request.extensions_mut().insert(Principal {
        id: client.id,
        role: PrincipalRole::Client,
    });
    request.extensions_mut().insert(AuthenticatedClient(client));

    Ok(next.run(request).await)
}

/// Solo riders
pub async fn require_rider(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = claims_from_request(&state, &request)?;
    if claims.role != PrincipalRole::Rider {
        return Err(AppError::Forbidden("Rider account required".to_string()));
    }

    let rider = load_rider(&state, claims.subject_id()?).await?;
    request.extensions_mut().insert(Principal {
        id: rider.id,
        role: PrincipalRole::Rider,
    });
    request.extensions_mut().insert(AuthenticatedRider(rider));

    Ok(next.run(request).await)
}

/// Cliente o rider; la propiedad del viaje se comprueba en el controller
pub async fn require_participant(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = claims_from_request(&state, &request)?;
    let id = claims.subject_id()?;

    let principal = match claims.role {
        PrincipalRole::Client => {
            let client = load_client(&state, id).await?;
            request.extensions_mut().insert(AuthenticatedClient(client));
            Principal { id, role: PrincipalRole::Client }
        }
        PrincipalRole::Rider => {
            let rider = load_rider(&state, id).await?;
            request.extensions_mut().insert(AuthenticatedRider(rider));
            Principal { id, role: PrincipalRole::Rider }
        }
    };
    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}

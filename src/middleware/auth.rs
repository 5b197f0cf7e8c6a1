// src/middleware/auth.rs
//
// La autenticación es de otro servicio: acá solo se valida el JWT que
// aquél emitió y se extraen identidad y rol. Los permisos por operación
// los chequea cada handler con `CurrentUser::require`.

use axum::{
    extract::{FromRequestParts, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::{
    common::error::AppError,
    config::AppState,
    models::auth::{Claims, CurrentUser},
};

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok());

    let Some(token) = auth_header.and_then(|h| h.strip_prefix("Bearer ")) else {
        return Err(AppError::InvalidToken);
    };

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::InvalidToken)?;

    let user = CurrentUser {
        id: token_data.claims.sub,
        username: token_data.claims.username,
        role: token_data.claims.role,
    };
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Extractor del usuario autenticado para los handlers.
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AppError::InvalidToken)
    }
}

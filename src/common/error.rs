// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// Nuestro tipo de error, con `thiserror` para mejor ergonomía.
// Los mensajes 4xx llegan tal cual al cliente; los 5xx se loguean y el
// cliente recibe un mensaje genérico.
#[derive(Debug, Error)]
pub enum AppError {
    // Regla de negocio violada: el mensaje nombra la restricción y, cuando
    // corresponde, el producto/monto ofensivo.
    #[error("{0}")]
    Validation(String),

    #[error("Error de validación")]
    PayloadValidation(#[from] validator::ValidationErrors),

    // Transición desde un estado terminal o incompatible.
    #[error("{0}")]
    StateConflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Token de autenticación inválido o ausente")]
    InvalidToken,

    #[error("No tiene permisos para realizar esta operación")]
    Forbidden,

    // No debería verse en operación normal; si aparece es un bug.
    #[error("Error de integridad: {0}")]
    Integrity(String),

    #[error("Error de base de datos")]
    Database(#[from] sqlx::Error),

    #[error("Error interno del servidor")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Devolvemos todos los detalles de la validación de payload.
            AppError::PayloadValidation(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Uno o más campos son inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::Validation(ref msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::StateConflict(ref msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::NotFound(ref msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "Token de autenticación inválido o ausente.".to_string(),
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "No tiene permisos para realizar esta operación.".to_string(),
            ),
            AppError::Database(sqlx::Error::RowNotFound) => (
                StatusCode::NOT_FOUND,
                "Recurso no encontrado.".to_string(),
            ),

            // Todo lo demás (Database, Integrity, Internal) es un 500.
            // `tracing` registra el detalle que nos dio `thiserror`.
            ref e => {
                tracing::error!("Error interno del servidor: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Ocurrió un error inesperado.".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

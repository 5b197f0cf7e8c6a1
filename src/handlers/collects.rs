// src/handlers/collects.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    db::collects_repo::CollectListFilter,
    models::{
        auth::{CurrentUser, Operation},
        collects::Collect,
    },
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCollectPayload {
    pub customer_id: Uuid,
    pub date: Option<DateTime<Utc>>,
    #[schema(example = "2500.00")]
    pub total: Decimal,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct CollectListQuery {
    pub customer_id: Option<Uuid>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

// POST /api/collects
#[utoipa::path(
    post,
    path = "/api/collects",
    tag = "Collects",
    request_body = CreateCollectPayload,
    responses(
        (status = 201, description = "Cobro registrado", body = Collect)
    ),
    security(("api_jwt" = []))
)]
pub async fn create_collect(
    State(app_state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<CreateCollectPayload>,
) -> Result<impl IntoResponse, AppError> {
    user.require(Operation::ManageCollects)?;
    payload.validate()?;

    let collect = app_state
        .collect_service
        .create_collect(
            &app_state.db_pool,
            user.id,
            payload.customer_id,
            payload.date,
            payload.total,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(collect)))
}

// GET /api/collects
#[utoipa::path(
    get,
    path = "/api/collects",
    tag = "Collects",
    params(CollectListQuery),
    responses(
        (status = 200, description = "Listado de cobros", body = [Collect])
    ),
    security(("api_jwt" = []))
)]
pub async fn list_collects(
    State(app_state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<CollectListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = CollectListFilter {
        customer_id: query.customer_id,
        start_date: query.start_date,
        end_date: query.end_date,
    };
    let collects = app_state
        .collect_service
        .list_collects(&app_state.db_pool, &filter)
        .await?;

    Ok(Json(collects))
}

// GET /api/collects/{id}
#[utoipa::path(
    get,
    path = "/api/collects/{id}",
    tag = "Collects",
    params(("id" = Uuid, Path, description = "ID del cobro")),
    responses(
        (status = 200, description = "Cobro", body = Collect),
        (status = 404, description = "Cobro no encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_collect(
    State(app_state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let collect = app_state
        .collect_service
        .get_collect(&app_state.db_pool, id)
        .await?;
    Ok(Json(collect))
}

// DELETE /api/collects/{id}
#[utoipa::path(
    delete,
    path = "/api/collects/{id}",
    tag = "Collects",
    params(("id" = Uuid, Path, description = "ID del cobro")),
    responses(
        (status = 204, description = "Cobro eliminado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_collect(
    State(app_state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    user.require(Operation::ManageCollects)?;
    app_state
        .collect_service
        .delete_collect(&app_state.db_pool, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// src/handlers/returns.rs

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
    db::returns_repo::ReturnListFilter,
    models::{
        auth::{CurrentUser, Operation},
        returns::ReturnResponse,
    },
    services::return_service::{ReturnInput, ReturnLineInput},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReturnLinePayload {
    pub product_id: Uuid,
    #[schema(example = "1.000")]
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReturnPayload {
    pub sale_id: Uuid,
    pub date: Option<DateTime<Utc>>,
    pub details: Vec<ReturnLinePayload>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateReturnPayload {
    pub details: Vec<ReturnLinePayload>,
}

fn to_lines(details: Vec<ReturnLinePayload>) -> Vec<ReturnLineInput> {
    details
        .into_iter()
        .map(|line| ReturnLineInput {
            product_id: line.product_id,
            quantity: line.quantity,
        })
        .collect()
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ReturnListQuery {
    pub sale_id: Option<Uuid>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

// POST /api/returns
#[utoipa::path(
    post,
    path = "/api/returns",
    tag = "Returns",
    request_body = CreateReturnPayload,
    responses(
        (status = 201, description = "Devolución registrada", body = ReturnResponse),
        (status = 400, description = "Tope de devolución excedido")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_return(
    State(app_state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<CreateReturnPayload>,
) -> Result<impl IntoResponse, AppError> {
    user.require(Operation::ManageReturns)?;
    payload.validate()?;

    let input = ReturnInput {
        sale_id: payload.sale_id,
        date: payload.date,
        details: to_lines(payload.details),
    };
    let return_order = app_state
        .return_service
        .create_return(&app_state.db_pool, user.id, input)
        .await?;

    Ok((StatusCode::CREATED, Json(return_order)))
}

// GET /api/returns
#[utoipa::path(
    get,
    path = "/api/returns",
    tag = "Returns",
    params(ReturnListQuery),
    responses(
        (status = 200, description = "Listado de devoluciones", body = [ReturnResponse])
    ),
    security(("api_jwt" = []))
)]
pub async fn list_returns(
    State(app_state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<ReturnListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = ReturnListFilter {
        sale_id: query.sale_id,
        start_date: query.start_date,
        end_date: query.end_date,
    };
    let returns = app_state
        .return_service
        .list_returns(&app_state.db_pool, &filter)
        .await?;

    Ok(Json(returns))
}

// GET /api/returns/{id}
#[utoipa::path(
    get,
    path = "/api/returns/{id}",
    tag = "Returns",
    params(("id" = Uuid, Path, description = "ID de la devolución")),
    responses(
        (status = 200, description = "Devolución", body = ReturnResponse),
        (status = 404, description = "Devolución no encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_return(
    State(app_state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let return_order = app_state
        .return_service
        .get_return(&app_state.db_pool, id)
        .await?;
    Ok(Json(return_order))
}

// PUT /api/returns/{id}
#[utoipa::path(
    put,
    path = "/api/returns/{id}",
    tag = "Returns",
    request_body = UpdateReturnPayload,
    params(("id" = Uuid, Path, description = "ID de la devolución")),
    responses(
        (status = 200, description = "Devolución actualizada", body = ReturnResponse),
        (status = 400, description = "Tope de devolución excedido")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_return(
    State(app_state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateReturnPayload>,
) -> Result<impl IntoResponse, AppError> {
    user.require(Operation::ManageReturns)?;
    payload.validate()?;

    let return_order = app_state
        .return_service
        .update_return(&app_state.db_pool, id, to_lines(payload.details))
        .await?;
    Ok(Json(return_order))
}

// DELETE /api/returns/{id}
#[utoipa::path(
    delete,
    path = "/api/returns/{id}",
    tag = "Returns",
    params(("id" = Uuid, Path, description = "ID de la devolución")),
    responses(
        (status = 204, description = "Devolución eliminada")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_return(
    State(app_state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    user.require(Operation::ManageReturns)?;
    app_state
        .return_service
        .delete_return(&app_state.db_pool, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// src/handlers/standing_orders.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::{
        auth::{CurrentUser, Operation},
        standing_orders::StandingOrderResponse,
    },
    services::standing_order_service::StandingOrderLineInput,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StandingOrderLinePayload {
    pub product_id: Uuid,
    #[schema(example = "10.000")]
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateStandingOrderPayload {
    pub customer_id: Uuid,
    /// 0 = lunes .. 6 = domingo.
    #[validate(range(min = 0, max = 6, message = "debe estar entre 0 y 6"))]
    #[schema(example = 0)]
    pub day_of_week: i16,
    pub details: Vec<StandingOrderLinePayload>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateStandingOrderPayload {
    pub details: Vec<StandingOrderLinePayload>,
}

fn to_lines(details: Vec<StandingOrderLinePayload>) -> Vec<StandingOrderLineInput> {
    details
        .into_iter()
        .map(|line| StandingOrderLineInput {
            product_id: line.product_id,
            quantity: line.quantity,
        })
        .collect()
}

// POST /api/standing-orders
#[utoipa::path(
    post,
    path = "/api/standing-orders",
    tag = "StandingOrders",
    request_body = CreateStandingOrderPayload,
    responses(
        (status = 201, description = "Pedido fijo creado", body = StandingOrderResponse),
        (status = 400, description = "El cliente ya tiene un pedido fijo para ese día")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_standing_order(
    State(app_state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<CreateStandingOrderPayload>,
) -> Result<impl IntoResponse, AppError> {
    user.require(Operation::ManageStandingOrders)?;
    payload.validate()?;

    let standing_order = app_state
        .standing_order_service
        .create(
            &app_state.db_pool,
            payload.customer_id,
            payload.day_of_week,
            to_lines(payload.details),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(standing_order)))
}

// GET /api/standing-orders
#[utoipa::path(
    get,
    path = "/api/standing-orders",
    tag = "StandingOrders",
    responses(
        (status = 200, description = "Listado de pedidos fijos", body = [StandingOrderResponse])
    ),
    security(("api_jwt" = []))
)]
pub async fn list_standing_orders(
    State(app_state): State<AppState>,
    _user: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let orders = app_state
        .standing_order_service
        .list(&app_state.db_pool)
        .await?;
    Ok(Json(orders))
}

// GET /api/standing-orders/{id}
#[utoipa::path(
    get,
    path = "/api/standing-orders/{id}",
    tag = "StandingOrders",
    params(("id" = Uuid, Path, description = "ID del pedido fijo")),
    responses(
        (status = 200, description = "Pedido fijo", body = StandingOrderResponse),
        (status = 404, description = "Pedido fijo no encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_standing_order(
    State(app_state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let standing_order = app_state
        .standing_order_service
        .get(&app_state.db_pool, id)
        .await?;
    Ok(Json(standing_order))
}

// PUT /api/standing-orders/{id}
#[utoipa::path(
    put,
    path = "/api/standing-orders/{id}",
    tag = "StandingOrders",
    request_body = UpdateStandingOrderPayload,
    params(("id" = Uuid, Path, description = "ID del pedido fijo")),
    responses(
        (status = 200, description = "Pedido fijo actualizado", body = StandingOrderResponse)
    ),
    security(("api_jwt" = []))
)]
pub async fn update_standing_order(
    State(app_state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStandingOrderPayload>,
) -> Result<impl IntoResponse, AppError> {
    user.require(Operation::ManageStandingOrders)?;
    payload.validate()?;

    let standing_order = app_state
        .standing_order_service
        .update(&app_state.db_pool, id, to_lines(payload.details))
        .await?;
    Ok(Json(standing_order))
}

// DELETE /api/standing-orders/{id}
#[utoipa::path(
    delete,
    path = "/api/standing-orders/{id}",
    tag = "StandingOrders",
    params(("id" = Uuid, Path, description = "ID del pedido fijo")),
    responses(
        (status = 204, description = "Pedido fijo eliminado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_standing_order(
    State(app_state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    user.require(Operation::ManageStandingOrders)?;
    app_state
        .standing_order_service
        .delete(&app_state.db_pool, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/standing-orders/generate
#[utoipa::path(
    post,
    path = "/api/standing-orders/generate",
    tag = "Scheduler",
    responses(
        (status = 200, description = "Cantidad de ventas generadas a partir de pedidos fijos")
    ),
    security(("api_jwt" = []))
)]
pub async fn generate_standing_orders(
    State(app_state): State<AppState>,
    user: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    user.require(Operation::RunScheduler)?;
    let generated = app_state
        .standing_order_service
        .generate_today(&app_state.db_pool, user.id)
        .await?;
    Ok(Json(json!({ "generated": generated })))
}

// src/handlers/sales.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    db::sales_repo::SaleListFilter,
    models::{
        auth::{CurrentUser, Operation},
        catalog::SaleType,
        sales::{PaymentMethod, SaleResponse, SaleState},
    },
    services::sale_service::{SaleInput, SaleLineInput},
};

// =============================================================================
//  PAYLOADS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SaleLinePayload {
    pub product_id: Uuid,
    #[schema(example = "2.000")]
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SalePayload {
    pub customer_id: Option<Uuid>,
    pub date: Option<DateTime<Utc>>,
    /// Total explícito para ventas rápidas sin detalle.
    #[schema(example = "1500.00")]
    pub total: Option<Decimal>,
    pub sale_type: SaleType,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub needs_delivery: bool,
    #[serde(default)]
    pub details: Vec<SaleLinePayload>,
}

impl SalePayload {
    fn into_input(self) -> SaleInput {
        SaleInput {
            customer_id: self.customer_id,
            date: self.date,
            total: self.total,
            sale_type: self.sale_type,
            payment_method: self.payment_method,
            needs_delivery: self.needs_delivery,
            details: self
                .details
                .into_iter()
                .map(|line| SaleLineInput {
                    product_id: line.product_id,
                    quantity: line.quantity,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PartialChargePayload {
    #[schema(example = "40.00")]
    pub amount: Decimal,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SaleListQuery {
    pub state: Option<SaleState>,
    pub customer_id: Option<Uuid>,
    pub sale_type: Option<SaleType>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub min_total: Option<Decimal>,
    pub max_total: Option<Decimal>,
}

impl SaleListQuery {
    fn into_filter(self) -> SaleListFilter {
        SaleListFilter {
            state: self.state,
            customer_id: self.customer_id,
            sale_type: self.sale_type,
            start_date: self.start_date,
            end_date: self.end_date,
            min_total: self.min_total,
            max_total: self.max_total,
        }
    }
}

// El cobro lo hace tanto el mostrador como el reparto.
fn require_charge_capability(user: &CurrentUser) -> Result<(), AppError> {
    if user.role.can(Operation::ManageSales) || user.role.can(Operation::DeliverSales) {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

// =============================================================================
//  CRUD
// =============================================================================

// POST /api/sales
#[utoipa::path(
    post,
    path = "/api/sales",
    tag = "Sales",
    request_body = SalePayload,
    responses(
        (status = 201, description = "Venta creada", body = SaleResponse)
    ),
    security(("api_jwt" = []))
)]
pub async fn create_sale(
    State(app_state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<SalePayload>,
) -> Result<impl IntoResponse, AppError> {
    user.require(Operation::ManageSales)?;
    payload.validate()?;

    let sale = app_state
        .sale_service
        .create_sale(&app_state.db_pool, user.id, payload.into_input())
        .await?;

    Ok((StatusCode::CREATED, Json(sale)))
}

// GET /api/sales
#[utoipa::path(
    get,
    path = "/api/sales",
    tag = "Sales",
    params(SaleListQuery),
    responses(
        (status = 200, description = "Listado de ventas", body = [SaleResponse])
    ),
    security(("api_jwt" = []))
)]
pub async fn list_sales(
    State(app_state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<SaleListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let sales = app_state
        .sale_service
        .list_sales(&app_state.db_pool, &query.into_filter())
        .await?;

    Ok(Json(sales))
}

// GET /api/sales/{id}
#[utoipa::path(
    get,
    path = "/api/sales/{id}",
    tag = "Sales",
    params(("id" = Uuid, Path, description = "ID de la venta")),
    responses(
        (status = 200, description = "Venta", body = SaleResponse),
        (status = 404, description = "Venta no encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_sale(
    State(app_state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let sale = app_state.sale_service.get_sale(&app_state.db_pool, id).await?;
    Ok(Json(sale))
}

// PUT /api/sales/{id}
#[utoipa::path(
    put,
    path = "/api/sales/{id}",
    tag = "Sales",
    request_body = SalePayload,
    params(("id" = Uuid, Path, description = "ID de la venta")),
    responses(
        (status = 200, description = "Venta actualizada", body = SaleResponse),
        (status = 409, description = "El estado actual no admite edición")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_sale(
    State(app_state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SalePayload>,
) -> Result<impl IntoResponse, AppError> {
    user.require(Operation::ManageSales)?;
    payload.validate()?;

    let sale = app_state
        .sale_service
        .update_sale(&app_state.db_pool, id, payload.into_input())
        .await?;

    Ok(Json(sale))
}

// DELETE /api/sales/{id}
#[utoipa::path(
    delete,
    path = "/api/sales/{id}",
    tag = "Sales",
    params(("id" = Uuid, Path, description = "ID de la venta")),
    responses(
        (status = 204, description = "Venta eliminada"),
        (status = 400, description = "La venta tiene devoluciones activas")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_sale(
    State(app_state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    user.require(Operation::ManageSales)?;
    app_state.sale_service.delete_sale(&app_state.db_pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  TRANSICIONES
// =============================================================================

// POST /api/sales/{id}/cancel
#[utoipa::path(
    post,
    path = "/api/sales/{id}/cancel",
    tag = "Sales",
    params(("id" = Uuid, Path, description = "ID de la venta")),
    responses(
        (status = 200, description = "Venta cancelada o anulada", body = SaleResponse),
        (status = 409, description = "La venta ya estaba cancelada o anulada")
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_sale(
    State(app_state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    user.require(Operation::ManageSales)?;
    let sale = app_state.sale_service.cancel(&app_state.db_pool, id).await?;
    Ok(Json(sale))
}

// POST /api/sales/{id}/mark-as-delivered
#[utoipa::path(
    post,
    path = "/api/sales/{id}/mark-as-delivered",
    tag = "Sales",
    params(("id" = Uuid, Path, description = "ID de la venta")),
    responses(
        (status = 200, description = "Venta entregada", body = SaleResponse),
        (status = 409, description = "El estado actual no admite la entrega")
    ),
    security(("api_jwt" = []))
)]
pub async fn mark_as_delivered(
    State(app_state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    user.require(Operation::DeliverSales)?;
    let sale = app_state
        .sale_service
        .mark_as_delivered(&app_state.db_pool, id)
        .await?;
    Ok(Json(sale))
}

// POST /api/sales/{id}/mark-as-charged
#[utoipa::path(
    post,
    path = "/api/sales/{id}/mark-as-charged",
    tag = "Sales",
    params(("id" = Uuid, Path, description = "ID de la venta")),
    responses(
        (status = 200, description = "Venta cobrada", body = SaleResponse),
        (status = 409, description = "La venta ya estaba cobrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn mark_as_charged(
    State(app_state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_charge_capability(&user)?;
    let sale = app_state
        .sale_service
        .mark_as_charged(&app_state.db_pool, id)
        .await?;
    Ok(Json(sale))
}

// POST /api/sales/{id}/mark-as-partially-charged
#[utoipa::path(
    post,
    path = "/api/sales/{id}/mark-as-partially-charged",
    tag = "Sales",
    request_body = PartialChargePayload,
    params(("id" = Uuid, Path, description = "ID de la venta")),
    responses(
        (status = 200, description = "Cobro parcial registrado", body = SaleResponse),
        (status = 400, description = "El monto supera el saldo pendiente")
    ),
    security(("api_jwt" = []))
)]
pub async fn mark_as_partially_charged(
    State(app_state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<PartialChargePayload>,
) -> Result<impl IntoResponse, AppError> {
    require_charge_capability(&user)?;
    payload.validate()?;

    let sale = app_state
        .sale_service
        .mark_as_partially_charged(&app_state.db_pool, id, payload.amount)
        .await?;
    Ok(Json(sale))
}

// =============================================================================
//  SCHEDULER
// =============================================================================

// POST /api/sales/{id}/advance-delivery
#[utoipa::path(
    post,
    path = "/api/sales/{id}/advance-delivery",
    tag = "Scheduler",
    params(("id" = Uuid, Path, description = "ID de la venta")),
    responses(
        (status = 200, description = "Resultado del avance; no-op si la venta ya no está creada")
    ),
    security(("api_jwt" = []))
)]
pub async fn advance_delivery(
    State(app_state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    user.require(Operation::RunScheduler)?;
    let advanced = app_state
        .sale_service
        .advance_to_pending_delivery(&app_state.db_pool, id)
        .await?;
    Ok(Json(json!({ "advanced": advanced })))
}

// POST /api/sales/check-delivery
#[utoipa::path(
    post,
    path = "/api/sales/check-delivery",
    tag = "Scheduler",
    responses(
        (status = 200, description = "Cantidad de ventas avanzadas a pendiente de entrega")
    ),
    security(("api_jwt" = []))
)]
pub async fn check_delivery(
    State(app_state): State<AppState>,
    user: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    user.require(Operation::RunScheduler)?;
    let advanced = app_state
        .sale_service
        .check_sales_for_delivery(&app_state.db_pool)
        .await?;
    Ok(Json(json!({ "advanced": advanced })))
}

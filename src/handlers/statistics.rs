// src/handlers/statistics.rs

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    common::error::AppError,
    config::AppState,
    models::{
        auth::{CurrentUser, Operation},
        statistics::StatisticsResponse,
    },
    services::statistics_service::StatisticsQuery,
};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct StatisticsParams {
    /// Preset de rango: today, week, month o year.
    pub period: Option<String>,
    /// Inicio explícito, YYYY-MM-DD. Requiere end_date.
    pub start_date: Option<String>,
    /// Fin explícito (inclusive), YYYY-MM-DD. Requiere start_date.
    pub end_date: Option<String>,
    /// Limita el reporte de cantidades a un producto.
    pub product_slug: Option<String>,
}

// GET /api/sales/statistics
#[utoipa::path(
    get,
    path = "/api/sales/statistics",
    tag = "Statistics",
    params(StatisticsParams),
    responses(
        (status = 200, description = "Reporte de estadísticas", body = StatisticsResponse),
        (status = 400, description = "Selector de rango inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_statistics(
    State(app_state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<StatisticsParams>,
) -> Result<impl IntoResponse, AppError> {
    user.require(Operation::ViewStatistics)?;

    let query = StatisticsQuery {
        period: params.period,
        start_date: params.start_date,
        end_date: params.end_date,
        product_slug: params.product_slug,
    };
    let report = app_state
        .statistics_service
        .compute(&app_state.db_pool, &query)
        .await?;

    Ok(Json(report))
}

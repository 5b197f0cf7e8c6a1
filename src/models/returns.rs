// src/models/returns.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Devolución: siempre trazada a exactamente una venta de origen.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Return {
    pub id: Uuid,
    pub user_id: Uuid,
    pub sale_id: Uuid,
    pub date: DateTime<Utc>,
    #[schema(example = "300.00")]
    pub total: Option<Decimal>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ReturnDetail {
    pub id: Uuid,
    pub return_id: Uuid,
    pub product_id: Uuid,
    #[schema(example = "1.000")]
    pub quantity: Decimal,
    // Derivado del precio mayorista del producto.
    #[schema(example = "120.00")]
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReturnResponse {
    #[serde(rename = "return")]
    pub return_order: Return,
    pub details: Vec<ReturnDetail>,
}

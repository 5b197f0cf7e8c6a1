// src/models/collects.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Cobro a nivel cliente, independiente de una venta puntual. Registra la
/// liquidación de cuenta corriente mayorista; no tiene máquina de estados.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Collect {
    pub id: Uuid,
    pub user_id: Uuid,
    pub customer_id: Uuid,
    pub date: DateTime<Utc>,
    #[schema(example = "2500.00")]
    pub total: Decimal,
    pub is_active: bool,
}

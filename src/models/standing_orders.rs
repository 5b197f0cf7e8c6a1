// src/models/standing_orders.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Pedido fijo semanal de un cliente. El scheduler lo convierte cada día
/// en una venta mayorista con entrega.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StandingOrder {
    pub id: Uuid,
    pub customer_id: Uuid,
    /// 0 = lunes .. 6 = domingo.
    #[schema(example = 0)]
    pub day_of_week: i16,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StandingOrderDetail {
    pub id: Uuid,
    pub standing_order_id: Uuid,
    pub product_id: Uuid,
    #[schema(example = "10.000")]
    pub quantity: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StandingOrderResponse {
    pub standing_order: StandingOrder,
    pub details: Vec<StandingOrderDetail>,
}

// src/models/statistics.rs
//
// DTOs del motor de estadísticas. Todos los montos salen cuantizados a
// 2 decimales; un rango sin actividad reporta "0.00", nunca null.

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

/// Cantidad neta vendida de un producto (vendido − devuelto).
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ProductQuantity {
    pub product_name: String,
    pub product_slug: String,
    #[schema(example = "25.000")]
    pub total_quantity_sold: Decimal,
}

/// Una fila del desglose por día (rangos no anuales) o por mes (rango
/// anual). Solo se incluyen períodos con alguna actividad.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PeriodBucket {
    /// "2026-08-25" para días, "2026-08" para meses.
    pub period: String,
    pub sales_count: i64,
    #[schema(example = "1500.00")]
    pub total_sales: Decimal,
    #[schema(example = "1200.00")]
    pub total_collected: Decimal,
    #[schema(example = "100.00")]
    pub total_returns: Decimal,
    #[schema(example = "300.00")]
    pub total_expenses: Decimal,
    #[schema(example = "800.00")]
    pub profit: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatisticsResponse {
    pub total_sales_count: i64,
    #[schema(example = "15000.00")]
    pub total_sales: Decimal,
    #[schema(example = "12000.00")]
    pub total_collected: Decimal,
    #[schema(example = "500.00")]
    pub total_returns: Decimal,
    #[schema(example = "3000.00")]
    pub total_expenses: Decimal,
    /// cobrado − devoluciones − gastos.
    #[schema(example = "8500.00")]
    pub total_profit: Decimal,
    /// Top 5 por cantidad neta; ausente cuando se filtra por producto.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_sold_products: Option<Vec<ProductQuantity>>,
    /// Cantidad neta del producto filtrado; ausente sin filtro.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductQuantity>,
    pub breakdown: Vec<PeriodBucket>,
}

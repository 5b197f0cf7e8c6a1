// src/models/catalog.rs
//
// Datos de referencia del catálogo. Este backend los lee, nunca los
// administra: el ABM de productos y clientes vive en otro servicio.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Tipo de venta / tipo de cliente. Determina qué precio del producto se
/// usa al resolver un detalle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "customer_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SaleType {
    Minorista,
    Mayorista,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub barcode: String,
    pub name: String,
    pub slug: String,
    #[schema(example = "150.00")]
    pub retail_price: Decimal,
    #[schema(example = "120.00")]
    pub wholesale_price: Decimal,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub customer_type: SaleType,
    pub is_active: bool,
}

// src/models/sales.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::catalog::SaleType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Efectivo,
    Tarjeta,
    Transferencia,
    Qr,
    CuentaCorriente,
}

/// Estados del ciclo de vida de una venta.
///
/// `Cancelada` es la salida antes de cobrar; `Anulada` es la salida una vez
/// cobrada (total o parcialmente). Nunca al revés.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "sale_state", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SaleState {
    Creada,
    PendienteEntrega,
    Entregada,
    Cobrada,
    CobradaParcial,
    Cancelada,
    Anulada,
}

impl SaleState {
    pub fn label(self) -> &'static str {
        match self {
            SaleState::Creada => "Creada",
            SaleState::PendienteEntrega => "Pendiente de Entrega",
            SaleState::Entregada => "Entregada",
            SaleState::Cobrada => "Cobrada",
            SaleState::CobradaParcial => "Cobrada Parcialmente",
            SaleState::Cancelada => "Cancelada",
            SaleState::Anulada => "Anulada",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SaleState::Cancelada | SaleState::Anulada)
    }

    /// Guardas para marcar como entregada.
    pub fn ensure_can_deliver(self) -> Result<(), AppError> {
        match self {
            SaleState::Cancelada => Err(AppError::StateConflict(
                "La venta ya ha sido cancelada.".into(),
            )),
            SaleState::Anulada => Err(AppError::StateConflict(
                "La venta ya ha sido anulada.".into(),
            )),
            SaleState::Entregada => Err(AppError::StateConflict(
                "La venta ya ha sido marcada como entregada.".into(),
            )),
            SaleState::Cobrada => Err(AppError::StateConflict(
                "La venta ya ha sido cobrada.".into(),
            )),
            _ => Ok(()),
        }
    }

    /// Guardas para cobrar, total o parcialmente.
    pub fn ensure_can_charge(self) -> Result<(), AppError> {
        match self {
            SaleState::Cancelada => Err(AppError::StateConflict(
                "La venta ya ha sido cancelada.".into(),
            )),
            SaleState::Anulada => Err(AppError::StateConflict(
                "La venta ya ha sido anulada.".into(),
            )),
            SaleState::Cobrada => Err(AppError::StateConflict(
                "La venta ya ha sido marcada como cobrada.".into(),
            )),
            _ => Ok(()),
        }
    }

    /// Estado destino al cancelar: `Cancelada` antes de cobrar, `Anulada`
    /// después de cobrar.
    pub fn cancel_target(self) -> Result<SaleState, AppError> {
        match self {
            SaleState::Creada | SaleState::PendienteEntrega | SaleState::Entregada => {
                Ok(SaleState::Cancelada)
            }
            SaleState::Cobrada | SaleState::CobradaParcial => Ok(SaleState::Anulada),
            SaleState::Cancelada => Err(AppError::StateConflict(
                "La venta ya ha sido cancelada.".into(),
            )),
            SaleState::Anulada => Err(AppError::StateConflict(
                "La venta ya ha sido anulada.".into(),
            )),
        }
    }

    /// ¿Las líneas de la venta siguen siendo editables en este estado?
    pub fn allows_line_edits(self) -> bool {
        matches!(
            self,
            SaleState::Creada | SaleState::PendienteEntrega | SaleState::Entregada
        )
    }
}

impl std::fmt::Display for SaleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Sale {
    pub id: Uuid,
    pub user_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub date: DateTime<Utc>,
    #[schema(example = "1500.00")]
    pub total: Option<Decimal>,
    #[schema(example = "500.00")]
    pub total_collected: Option<Decimal>,
    pub sale_type: SaleType,
    pub payment_method: PaymentMethod,
    pub needs_delivery: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SaleDetail {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub product_id: Uuid,
    #[schema(example = "2.000")]
    pub quantity: Decimal,
    // Derivado del catálogo según el sale_type, nunca del cliente.
    #[schema(example = "150.00")]
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StateChange {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub state: SaleState,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Venta completa tal como sale por la API: cabecera, estado actual,
/// detalles y el log de estados.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SaleResponse {
    pub sale: Sale,
    pub state: Option<SaleState>,
    pub details: Vec<SaleDetail>,
    pub state_changes: Vec<StateChange>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelar_antes_de_cobrar_da_cancelada() {
        for state in [
            SaleState::Creada,
            SaleState::PendienteEntrega,
            SaleState::Entregada,
        ] {
            assert_eq!(state.cancel_target().unwrap(), SaleState::Cancelada);
        }
    }

    #[test]
    fn cancelar_despues_de_cobrar_da_anulada() {
        assert_eq!(
            SaleState::Cobrada.cancel_target().unwrap(),
            SaleState::Anulada
        );
        assert_eq!(
            SaleState::CobradaParcial.cancel_target().unwrap(),
            SaleState::Anulada
        );
    }

    #[test]
    fn cancelar_dos_veces_se_rechaza() {
        assert!(SaleState::Cancelada.cancel_target().is_err());
        assert!(SaleState::Anulada.cancel_target().is_err());
    }

    #[test]
    fn entregar_se_rechaza_desde_estados_incompatibles() {
        assert!(SaleState::Cancelada.ensure_can_deliver().is_err());
        assert!(SaleState::Anulada.ensure_can_deliver().is_err());
        assert!(SaleState::Entregada.ensure_can_deliver().is_err());
        assert!(SaleState::Cobrada.ensure_can_deliver().is_err());
        assert!(SaleState::Creada.ensure_can_deliver().is_ok());
        assert!(SaleState::PendienteEntrega.ensure_can_deliver().is_ok());
        // Se puede entregar una venta cobrada parcialmente por adelantado.
        assert!(SaleState::CobradaParcial.ensure_can_deliver().is_ok());
    }

    #[test]
    fn cobrar_dos_veces_se_rechaza() {
        let err = SaleState::Cobrada.ensure_can_charge().unwrap_err();
        assert!(err.to_string().contains("ya ha sido marcada como cobrada"));
        assert!(SaleState::CobradaParcial.ensure_can_charge().is_ok());
        assert!(SaleState::Entregada.ensure_can_charge().is_ok());
    }

    #[test]
    fn estados_terminales() {
        assert!(SaleState::Cancelada.is_terminal());
        assert!(SaleState::Anulada.is_terminal());
        assert!(!SaleState::Cobrada.is_terminal());
    }

    #[test]
    fn lineas_editables_solo_antes_de_cobrar() {
        assert!(SaleState::Creada.allows_line_edits());
        assert!(SaleState::Entregada.allows_line_edits());
        assert!(!SaleState::Cobrada.allows_line_edits());
        assert!(!SaleState::CobradaParcial.allows_line_edits());
        assert!(!SaleState::Cancelada.allows_line_edits());
    }
}

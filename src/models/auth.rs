// src/models/auth.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Administrador,
    Vendedor,
    Repartidor,
    // Identidad con la que el scheduler externo invoca sus operaciones.
    Scheduler,
}

/// Operaciones que el núcleo expone. Los handlers chequean capacidades
/// contra esta tabla, nunca comparan nombres de rol directamente.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ManageSales,
    DeliverSales,
    ManageReturns,
    ManageCollects,
    ManageStandingOrders,
    ViewStatistics,
    RunScheduler,
}

impl UserRole {
    pub fn can(self, operation: Operation) -> bool {
        match self {
            UserRole::Administrador => true,
            UserRole::Vendedor => matches!(
                operation,
                Operation::ManageSales | Operation::ManageStandingOrders
            ),
            UserRole::Repartidor => matches!(
                operation,
                Operation::DeliverSales | Operation::ManageReturns | Operation::ManageCollects
            ),
            UserRole::Scheduler => matches!(operation, Operation::RunScheduler),
        }
    }
}

// Claims del JWT emitido por el servicio de auth externo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub role: UserRole,
    pub exp: usize,
}

/// Usuario autenticado, insertado en las extensions por el middleware.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
    pub role: UserRole,
}

impl CurrentUser {
    pub fn require(&self, operation: Operation) -> Result<(), AppError> {
        if self.role.can(operation) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn administrador_puede_todo() {
        for op in [
            Operation::ManageSales,
            Operation::DeliverSales,
            Operation::ManageReturns,
            Operation::ManageCollects,
            Operation::ManageStandingOrders,
            Operation::ViewStatistics,
            Operation::RunScheduler,
        ] {
            assert!(UserRole::Administrador.can(op));
        }
    }

    #[test]
    fn vendedor_gestiona_ventas_pero_no_entregas() {
        assert!(UserRole::Vendedor.can(Operation::ManageSales));
        assert!(UserRole::Vendedor.can(Operation::ManageStandingOrders));
        assert!(!UserRole::Vendedor.can(Operation::DeliverSales));
        assert!(!UserRole::Vendedor.can(Operation::ViewStatistics));
    }

    #[test]
    fn repartidor_entrega_y_registra_devoluciones() {
        assert!(UserRole::Repartidor.can(Operation::DeliverSales));
        assert!(UserRole::Repartidor.can(Operation::ManageReturns));
        assert!(UserRole::Repartidor.can(Operation::ManageCollects));
        assert!(!UserRole::Repartidor.can(Operation::ManageSales));
    }

    #[test]
    fn scheduler_solo_corre_tareas() {
        assert!(UserRole::Scheduler.can(Operation::RunScheduler));
        assert!(!UserRole::Scheduler.can(Operation::ManageSales));
        assert!(!UserRole::Scheduler.can(Operation::ViewStatistics));
    }
}

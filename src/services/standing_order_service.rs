// src/services/standing_order_service.rs
//
// Pedidos fijos semanales. La generación diaria los materializa como
// ventas mayoristas con entrega a cuenta corriente; es idempotente por
// cliente y día, correr el job dos veces no duplica ventas.

use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use sqlx::{Acquire, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CatalogRepository, SalesRepository, StandingOrdersRepository},
    models::{
        catalog::SaleType,
        sales::PaymentMethod,
        standing_orders::{StandingOrder, StandingOrderResponse},
    },
    services::sale_service::{today_range, SaleInput, SaleLineInput, SaleService},
};

#[derive(Debug, Clone)]
pub struct StandingOrderLineInput {
    pub product_id: Uuid,
    pub quantity: Decimal,
}

fn validate_lines(details: &[StandingOrderLineInput]) -> Result<(), AppError> {
    if details.is_empty() {
        return Err(AppError::Validation(
            "El pedido fijo debe tener al menos un detalle.".into(),
        ));
    }
    let mut seen = Vec::with_capacity(details.len());
    for line in details {
        if line.quantity <= Decimal::ZERO {
            return Err(AppError::Validation(
                "La cantidad debe ser mayor a cero.".into(),
            ));
        }
        if seen.contains(&line.product_id) {
            return Err(AppError::Validation("No se pueden repetir productos.".into()));
        }
        seen.push(line.product_id);
    }
    Ok(())
}

#[derive(Clone)]
pub struct StandingOrderService {
    standing_repo: StandingOrdersRepository,
    sales_repo: SalesRepository,
    catalog_repo: CatalogRepository,
    sale_service: SaleService,
}

impl StandingOrderService {
    pub fn new(
        standing_repo: StandingOrdersRepository,
        sales_repo: SalesRepository,
        catalog_repo: CatalogRepository,
        sale_service: SaleService,
    ) -> Self {
        Self {
            standing_repo,
            sales_repo,
            catalog_repo,
            sale_service,
        }
    }

    pub async fn create<'a, A>(
        &self,
        conn: A,
        customer_id: Uuid,
        day_of_week: i16,
        details: Vec<StandingOrderLineInput>,
    ) -> Result<StandingOrderResponse, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        if !(0..=6).contains(&day_of_week) {
            return Err(AppError::Validation(
                "El día de la semana debe estar entre 0 (lunes) y 6 (domingo).".into(),
            ));
        }
        validate_lines(&details)?;

        let mut tx = conn.begin().await?;

        self.catalog_repo
            .get_customer(&mut *tx, customer_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Cliente no encontrado.".into()))?;

        if self
            .standing_repo
            .exists_for_customer_day(&mut *tx, customer_id, day_of_week)
            .await?
        {
            return Err(AppError::Validation(
                "El cliente ya tiene un pedido fijo para ese día.".into(),
            ));
        }

        let standing_order = self
            .standing_repo
            .create(&mut *tx, customer_id, day_of_week)
            .await?;
        self.insert_lines(&mut tx, standing_order.id, &details).await?;

        let response = self.load_response(&mut *tx, standing_order).await?;
        tx.commit().await?;

        Ok(response)
    }

    /// Reemplaza las líneas del pedido. Cambiar de día es borrar y crear.
    pub async fn update<'a, A>(
        &self,
        conn: A,
        standing_order_id: Uuid,
        details: Vec<StandingOrderLineInput>,
    ) -> Result<StandingOrderResponse, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        validate_lines(&details)?;

        let mut tx = conn.begin().await?;

        let standing_order = self
            .standing_repo
            .get(&mut *tx, standing_order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Pedido fijo no encontrado.".into()))?;

        self.standing_repo
            .delete_details(&mut *tx, standing_order.id)
            .await?;
        self.insert_lines(&mut tx, standing_order.id, &details).await?;

        let response = self.load_response(&mut *tx, standing_order).await?;
        tx.commit().await?;

        Ok(response)
    }

    pub async fn get<'a, A>(
        &self,
        conn: A,
        standing_order_id: Uuid,
    ) -> Result<StandingOrderResponse, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = conn.acquire().await?;
        let standing_order = self
            .standing_repo
            .get(&mut *conn, standing_order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Pedido fijo no encontrado.".into()))?;
        self.load_response(&mut *conn, standing_order).await
    }

    pub async fn list<'a, A>(&self, conn: A) -> Result<Vec<StandingOrderResponse>, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = conn.acquire().await?;
        let orders = self.standing_repo.list_all(&mut *conn).await?;

        let mut responses = Vec::with_capacity(orders.len());
        for order in orders {
            responses.push(self.load_response(&mut *conn, order).await?);
        }
        Ok(responses)
    }

    pub async fn delete<'a, A>(&self, conn: A, standing_order_id: Uuid) -> Result<(), AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut tx = conn.begin().await?;

        self.standing_repo
            .get(&mut *tx, standing_order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Pedido fijo no encontrado.".into()))?;

        self.standing_repo
            .soft_delete(&mut *tx, standing_order_id)
            .await?;
        tx.commit().await?;

        Ok(())
    }

    /// Job diario: genera las ventas del día a partir de los pedidos
    /// fijos. Se saltea a los clientes que ya tienen una venta con
    /// entrega hoy. Devuelve cuántas ventas creó.
    pub async fn generate_today<'a, A>(&self, conn: A, user_id: Uuid) -> Result<usize, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let now = Utc::now();
        let day_of_week = now.date_naive().weekday().num_days_from_monday() as i16;
        let (start, end) = today_range(now);

        let mut tx = conn.begin().await?;
        let orders = self.standing_repo.list_for_day(&mut *tx, day_of_week).await?;

        let mut generated = 0;
        for order in orders {
            if self
                .sales_repo
                .customer_has_delivery_sale_between(&mut *tx, order.customer_id, start, end)
                .await?
            {
                continue;
            }

            let details = self.standing_repo.list_details(&mut *tx, order.id).await?;
            if details.is_empty() {
                continue;
            }

            let input = SaleInput {
                customer_id: Some(order.customer_id),
                date: None,
                total: None,
                sale_type: SaleType::Mayorista,
                payment_method: PaymentMethod::CuentaCorriente,
                needs_delivery: true,
                details: details
                    .into_iter()
                    .map(|d| SaleLineInput {
                        product_id: d.product_id,
                        quantity: d.quantity,
                    })
                    .collect(),
            };

            self.sale_service.create_sale(&mut *tx, user_id, input).await?;
            generated += 1;
        }
        tx.commit().await?;

        tracing::info!(generated, day_of_week, "pedidos fijos generados");
        Ok(generated)
    }

    // =========================================================================
    //  INTERNOS
    // =========================================================================

    async fn insert_lines(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
        standing_order_id: Uuid,
        details: &[StandingOrderLineInput],
    ) -> Result<(), AppError> {
        for line in details {
            self.catalog_repo
                .get_product(&mut **tx, line.product_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Producto no encontrado.".into()))?;
            self.standing_repo
                .insert_detail(&mut **tx, standing_order_id, line.product_id, line.quantity)
                .await?;
        }
        Ok(())
    }

    async fn load_response(
        &self,
        conn: &mut PgConnection,
        standing_order: StandingOrder,
    ) -> Result<StandingOrderResponse, AppError> {
        let details = self
            .standing_repo
            .list_details(&mut *conn, standing_order.id)
            .await?;
        Ok(StandingOrderResponse {
            standing_order,
            details,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn lineas_del_pedido_fijo_se_validan() {
        assert!(validate_lines(&[]).is_err());

        let id = Uuid::new_v4();
        let duplicated = vec![
            StandingOrderLineInput {
                product_id: id,
                quantity: dec!(5),
            },
            StandingOrderLineInput {
                product_id: id,
                quantity: dec!(3),
            },
        ];
        assert!(validate_lines(&duplicated).is_err());

        let ok = vec![StandingOrderLineInput {
            product_id: Uuid::new_v4(),
            quantity: dec!(10),
        }];
        assert!(validate_lines(&ok).is_ok());
    }
}

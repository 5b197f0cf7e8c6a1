// src/services/return_service.rs
//
// Devoluciones contra ventas cobradas. La validación de topes corre
// contra TODAS las devoluciones activas de la venta dentro de la misma
// transacción que bloquea la fila de la venta, así dos devoluciones
// concurrentes no pueden pasar el chequeo con totales viejos.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Acquire, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::{error::AppError, money::quantize_money, money::quantize_quantity},
    db::{CatalogRepository, ReturnsRepository, SalesRepository},
    db::returns_repo::ReturnListFilter,
    models::{
        returns::{Return, ReturnResponse},
        sales::SaleState,
    },
};

#[derive(Debug, Clone)]
pub struct ReturnLineInput {
    pub product_id: Uuid,
    pub quantity: Decimal,
}

#[derive(Debug, Clone)]
pub struct ReturnInput {
    pub sale_id: Uuid,
    pub date: Option<DateTime<Utc>>,
    pub details: Vec<ReturnLineInput>,
}

/// Una fila del chequeo de topes: cuánto se vendió del producto, cuánto
/// ya se devolvió en otras devoluciones y cuánto se pide ahora.
#[derive(Debug)]
pub struct CapCheck {
    pub product_name: String,
    pub sold: Decimal,
    pub already_returned: Decimal,
    pub requested: Decimal,
}

/// Rechaza si algún producto queda con más devuelto que vendido. El
/// mensaje nombra el producto y los números, el cliente los necesita
/// para corregir el pedido.
pub fn validate_return_caps(checks: &[CapCheck]) -> Result<(), AppError> {
    for check in checks {
        if check.sold <= Decimal::ZERO {
            return Err(AppError::Validation(format!(
                "El producto '{}' no pertenece a la venta.",
                check.product_name
            )));
        }
        let cumulative = check.already_returned + check.requested;
        if cumulative > check.sold {
            let excess = cumulative - check.sold;
            return Err(AppError::Validation(format!(
                "No se pueden devolver {} de '{}': se vendieron {}, ya se devolvieron {} y el excedente es {}.",
                check.requested, check.product_name, check.sold, check.already_returned, excess
            )));
        }
    }
    Ok(())
}

fn validate_lines(details: &[ReturnLineInput]) -> Result<(), AppError> {
    if details.is_empty() {
        return Err(AppError::Validation(
            "La devolución debe tener al menos un detalle.".into(),
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
pub struct ReturnService {
    returns_repo: ReturnsRepository,
    sales_repo: SalesRepository,
    catalog_repo: CatalogRepository,
}

impl ReturnService {
    pub fn new(
        returns_repo: ReturnsRepository,
        sales_repo: SalesRepository,
        catalog_repo: CatalogRepository,
    ) -> Self {
        Self {
            returns_repo,
            sales_repo,
            catalog_repo,
        }
    }

    pub async fn create_return<'a, A>(
        &self,
        conn: A,
        user_id: Uuid,
        input: ReturnInput,
    ) -> Result<ReturnResponse, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        validate_lines(&input.details)?;

        let mut tx = conn.begin().await?;

        let sale = self
            .sales_repo
            .get_sale_for_update(&mut *tx, input.sale_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Venta no encontrada.".into()))?;

        let current = self
            .sales_repo
            .current_state(&mut *tx, sale.id)
            .await?
            .ok_or_else(|| {
                AppError::Integrity(format!("la venta {} no tiene cambios de estado", sale.id))
            })?;
        if current.state != SaleState::Cobrada {
            return Err(AppError::StateConflict(
                "Solo se pueden registrar devoluciones sobre ventas cobradas.".into(),
            ));
        }

        self.check_caps(&mut tx, sale.id, None, &input.details).await?;

        let return_order = self
            .returns_repo
            .create_return(&mut *tx, user_id, sale.id, input.date)
            .await?;
        self.insert_lines(&mut tx, return_order.id, &input.details).await?;
        self.returns_repo
            .recalculate_total(&mut *tx, return_order.id)
            .await?;

        let response = self.load_response_by_id(&mut tx, return_order.id).await?;
        tx.commit().await?;

        Ok(response)
    }

    /// Reemplaza las líneas de una devolución. El tope se valida contra
    /// el estado hipotético post-edición: hermanas + líneas nuevas.
    pub async fn update_return<'a, A>(
        &self,
        conn: A,
        return_id: Uuid,
        details: Vec<ReturnLineInput>,
    ) -> Result<ReturnResponse, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        validate_lines(&details)?;

        let mut tx = conn.begin().await?;

        let return_order = self
            .returns_repo
            .get_return(&mut *tx, return_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Devolución no encontrada.".into()))?;

        self.sales_repo
            .get_sale_for_update(&mut *tx, return_order.sale_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Venta no encontrada.".into()))?;

        self.check_caps(&mut tx, return_order.sale_id, Some(return_id), &details)
            .await?;

        self.returns_repo.delete_details(&mut *tx, return_id).await?;
        self.insert_lines(&mut tx, return_id, &details).await?;
        self.returns_repo.recalculate_total(&mut *tx, return_id).await?;

        let response = self.load_response_by_id(&mut tx, return_id).await?;
        tx.commit().await?;

        Ok(response)
    }

    pub async fn get_return<'a, A>(
        &self,
        conn: A,
        return_id: Uuid,
    ) -> Result<ReturnResponse, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = conn.acquire().await?;
        let return_order = self
            .returns_repo
            .get_return(&mut *conn, return_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Devolución no encontrada.".into()))?;
        self.load_response(&mut *conn, return_order).await
    }

    pub async fn list_returns<'a, A>(
        &self,
        conn: A,
        filter: &ReturnListFilter,
    ) -> Result<Vec<ReturnResponse>, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = conn.acquire().await?;
        let returns = self.returns_repo.list_returns(&mut *conn, filter).await?;

        let mut responses = Vec::with_capacity(returns.len());
        for return_order in returns {
            responses.push(self.load_response(&mut *conn, return_order).await?);
        }
        Ok(responses)
    }

    pub async fn delete_return<'a, A>(&self, conn: A, return_id: Uuid) -> Result<(), AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut tx = conn.begin().await?;

        self.returns_repo
            .get_return(&mut *tx, return_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Devolución no encontrada.".into()))?;

        self.returns_repo.soft_delete(&mut *tx, return_id).await?;
        tx.commit().await?;

        Ok(())
    }

    // =========================================================================
    //  INTERNOS
    // =========================================================================

    async fn check_caps(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
        sale_id: Uuid,
        exclude_return_id: Option<Uuid>,
        details: &[ReturnLineInput],
    ) -> Result<(), AppError> {
        let sold = self.returns_repo.sold_quantities(&mut **tx, sale_id).await?;
        let returned = self
            .returns_repo
            .returned_quantities(&mut **tx, sale_id, exclude_return_id)
            .await?;

        let mut checks = Vec::with_capacity(details.len());
        for line in details {
            let product = self
                .catalog_repo
                .get_product(&mut **tx, line.product_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Producto no encontrado.".into()))?;

            let sold_qty = sold
                .iter()
                .find(|r| r.product_id == line.product_id)
                .map(|r| r.quantity)
                .unwrap_or(Decimal::ZERO);
            let returned_qty = returned
                .iter()
                .find(|r| r.product_id == line.product_id)
                .map(|r| r.quantity)
                .unwrap_or(Decimal::ZERO);

            checks.push(CapCheck {
                product_name: product.name,
                sold: sold_qty,
                already_returned: returned_qty,
                requested: line.quantity,
            });
        }

        validate_return_caps(&checks)
    }

    async fn insert_lines(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
        return_id: Uuid,
        details: &[ReturnLineInput],
    ) -> Result<(), AppError> {
        for line in details {
            let product = self
                .catalog_repo
                .get_product(&mut **tx, line.product_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Producto no encontrado.".into()))?;

            // Las devoluciones se valorizan siempre al precio mayorista.
            if product.wholesale_price <= Decimal::ZERO {
                return Err(AppError::Validation(format!(
                    "El producto '{}' no tiene un precio mayorista válido y no puede devolverse.",
                    product.name
                )));
            }

            self.returns_repo
                .insert_detail(
                    &mut **tx,
                    return_id,
                    product.id,
                    quantize_quantity(line.quantity),
                    quantize_money(product.wholesale_price),
                )
                .await?;
        }
        Ok(())
    }

    async fn load_response_by_id(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
        return_id: Uuid,
    ) -> Result<ReturnResponse, AppError> {
        let return_order = self
            .returns_repo
            .get_return(&mut **tx, return_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Devolución no encontrada.".into()))?;
        self.load_response(&mut **tx, return_order).await
    }

    async fn load_response(
        &self,
        conn: &mut PgConnection,
        return_order: Return,
    ) -> Result<ReturnResponse, AppError> {
        let details = self
            .returns_repo
            .list_details(&mut *conn, return_order.id)
            .await?;
        Ok(ReturnResponse {
            return_order,
            details,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn check(sold: Decimal, already: Decimal, requested: Decimal) -> CapCheck {
        CapCheck {
            product_name: "Factura".into(),
            sold,
            already_returned: already,
            requested,
        }
    }

    #[test]
    fn devolver_dentro_del_tope_pasa() {
        // Vendidas 5, devueltas 3, se piden 2 más: justo en el tope.
        assert!(validate_return_caps(&[check(dec!(5), dec!(3), dec!(2))]).is_ok());
    }

    #[test]
    fn exceder_el_tope_se_rechaza_nombrando_el_producto() {
        let err = validate_return_caps(&[check(dec!(5), dec!(3), dec!(3))]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Factura"));
        assert!(msg.contains("5"));
        assert!(msg.contains("3"));
        assert!(msg.contains("excedente es 1"));
    }

    #[test]
    fn producto_fuera_de_la_venta_se_rechaza() {
        let err = validate_return_caps(&[check(dec!(0), dec!(0), dec!(1))]).unwrap_err();
        assert!(err.to_string().contains("no pertenece a la venta"));
    }

    #[test]
    fn lineas_vacias_o_no_positivas_se_rechazan() {
        assert!(validate_lines(&[]).is_err());
        assert!(validate_lines(&[ReturnLineInput {
            product_id: Uuid::new_v4(),
            quantity: dec!(-1),
        }])
        .is_err());
    }
}

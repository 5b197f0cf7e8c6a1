// src/services/sale_service.rs
//
// Ciclo de vida completo de la venta: creación con detalles o total
// directo, edición de líneas, transiciones de estado y cobro. Toda
// transición corre dentro de una transacción que bloquea la fila de la
// venta, así el leer-cerrar-agregar del log de estados queda serializado
// por venta.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Acquire, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        money::{quantize_money, quantize_quantity, zero_money},
    },
    db::{CatalogRepository, SalesRepository},
    db::sales_repo::SaleListFilter,
    models::{
        catalog::{Product, SaleType},
        sales::{PaymentMethod, Sale, SaleResponse, SaleState, StateChange},
    },
};

#[derive(Debug, Clone)]
pub struct SaleLineInput {
    pub product_id: Uuid,
    pub quantity: Decimal,
}

#[derive(Debug, Clone)]
pub struct SaleInput {
    pub customer_id: Option<Uuid>,
    pub date: Option<DateTime<Utc>>,
    /// Total explícito para ventas rápidas sin detalle.
    pub total: Option<Decimal>,
    pub sale_type: SaleType,
    pub payment_method: PaymentMethod,
    pub needs_delivery: bool,
    pub details: Vec<SaleLineInput>,
}

// =============================================================================
//  FUNCIONES PURAS
// =============================================================================

/// Resuelve el precio de línea según el tipo de venta. Para mayorista se
/// prefiere el precio mayorista y se cae al minorista si aquél no está
/// cargado; ese fallback es intencional.
pub fn resolve_price(product: &Product, sale_type: SaleType) -> Result<Decimal, AppError> {
    let price = match sale_type {
        SaleType::Minorista => product.retail_price,
        SaleType::Mayorista => {
            if product.wholesale_price > Decimal::ZERO {
                product.wholesale_price
            } else {
                product.retail_price
            }
        }
    };

    if price > Decimal::ZERO {
        Ok(quantize_money(price))
    } else {
        Err(AppError::Validation(format!(
            "El producto '{}' no tiene un precio válido para el tipo de venta.",
            product.name
        )))
    }
}

/// Suma precio × cantidad sobre pares (cantidad, precio).
pub fn compute_total(lines: &[(Decimal, Decimal)]) -> Decimal {
    let sum: Decimal = lines.iter().map(|(quantity, price)| quantity * price).sum();
    quantize_money(sum)
}

/// Saldo pendiente de cobro: total menos devoluciones menos lo ya
/// cobrado. Un saldo negativo significa que las devoluciones superan el
/// total y se rechaza.
pub fn compute_collectible(
    total: Decimal,
    returns_total: Decimal,
    collected: Decimal,
) -> Result<Decimal, AppError> {
    let remaining = quantize_money(total - returns_total - collected);
    if remaining < Decimal::ZERO {
        return Err(AppError::Validation(
            "Las devoluciones superan el total de la venta.".into(),
        ));
    }
    Ok(remaining)
}

/// Regla de exactamente-uno: detalles o total explícito, nunca ambos ni
/// ninguno.
pub fn validate_modality(has_details: bool, total: Option<Decimal>) -> Result<(), AppError> {
    match (has_details, total) {
        (false, None) => Err(AppError::Validation(
            "La venta debe tener al menos un detalle o el total.".into(),
        )),
        (true, Some(_)) => Err(AppError::Validation(
            "La venta no puede tener detalles y total a la vez.".into(),
        )),
        _ => Ok(()),
    }
}

fn validate_lines(details: &[SaleLineInput]) -> Result<(), AppError> {
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

/// Rango [00:00 de hoy, 00:00 de mañana) en UTC.
pub fn today_range(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

// =============================================================================
//  SERVICIO
// =============================================================================

#[derive(Clone)]
pub struct SaleService {
    sales_repo: SalesRepository,
    catalog_repo: CatalogRepository,
}

impl SaleService {
    pub fn new(sales_repo: SalesRepository, catalog_repo: CatalogRepository) -> Self {
        Self {
            sales_repo,
            catalog_repo,
        }
    }

    pub async fn create_sale<'a, A>(
        &self,
        conn: A,
        user_id: Uuid,
        input: SaleInput,
    ) -> Result<SaleResponse, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        validate_modality(!input.details.is_empty(), input.total)?;
        validate_lines(&input.details)?;

        let total = match input.total {
            Some(total) if total <= Decimal::ZERO => {
                return Err(AppError::Validation("El total debe ser mayor a cero.".into()));
            }
            Some(total) => Some(quantize_money(total)),
            None => None,
        };

        let mut tx = conn.begin().await?;

        if let Some(customer_id) = input.customer_id {
            self.catalog_repo
                .get_customer(&mut *tx, customer_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Cliente no encontrado.".into()))?;
        }

        let sale = self
            .sales_repo
            .create_sale(
                &mut *tx,
                user_id,
                input.customer_id,
                input.date,
                total,
                input.sale_type,
                input.payment_method,
                input.needs_delivery,
            )
            .await?;

        for line in &input.details {
            let product = self
                .catalog_repo
                .get_product(&mut *tx, line.product_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Producto no encontrado.".into()))?;
            let price = resolve_price(&product, input.sale_type)?;
            self.sales_repo
                .insert_detail(
                    &mut *tx,
                    sale.id,
                    product.id,
                    quantize_quantity(line.quantity),
                    price,
                )
                .await?;
        }

        let total = if input.details.is_empty() {
            total.unwrap_or_else(zero_money)
        } else {
            self.sales_repo.recalculate_total(&mut *tx, sale.id).await?
        };

        // Sin entrega la venta nace cobrada en el mostrador; con entrega
        // arranca creada y el scheduler la empuja al reparto.
        if input.needs_delivery {
            self.sales_repo
                .append_state(&mut *tx, sale.id, SaleState::Creada)
                .await?;
        } else {
            self.sales_repo
                .set_total_collected(&mut *tx, sale.id, total)
                .await?;
            self.sales_repo
                .append_state(&mut *tx, sale.id, SaleState::Cobrada)
                .await?;
        }

        let response = self.load_response_by_id(&mut tx, sale.id).await?;
        tx.commit().await?;

        Ok(response)
    }

    pub async fn get_sale<'a, A>(&self, conn: A, sale_id: Uuid) -> Result<SaleResponse, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = conn.acquire().await?;
        let sale = self
            .sales_repo
            .get_sale(&mut *conn, sale_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Venta no encontrada.".into()))?;
        self.load_response(&mut *conn, sale).await
    }

    pub async fn list_sales<'a, A>(
        &self,
        conn: A,
        filter: &SaleListFilter,
    ) -> Result<Vec<SaleResponse>, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = conn.acquire().await?;
        let sales = self.sales_repo.list_sales(&mut *conn, filter).await?;

        let mut responses = Vec::with_capacity(sales.len());
        for sale in sales {
            responses.push(self.load_response(&mut *conn, sale).await?);
        }
        Ok(responses)
    }

    /// Edita cabecera y líneas. Las líneas se re-resuelven contra el tipo
    /// de venta vigente, así un cambio minorista/mayorista re-precia todo.
    pub async fn update_sale<'a, A>(
        &self,
        conn: A,
        sale_id: Uuid,
        input: SaleInput,
    ) -> Result<SaleResponse, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        validate_modality(!input.details.is_empty(), input.total)?;
        validate_lines(&input.details)?;

        let mut tx = conn.begin().await?;

        let sale = self
            .sales_repo
            .get_sale_for_update(&mut *tx, sale_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Venta no encontrada.".into()))?;

        let state = self.require_state(&mut tx, sale.id).await?;
        if !state.state.allows_line_edits() {
            return Err(AppError::StateConflict(format!(
                "No se puede modificar una venta en estado {}.",
                state.state.label()
            )));
        }

        if let Some(customer_id) = input.customer_id {
            self.catalog_repo
                .get_customer(&mut *tx, customer_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Cliente no encontrado.".into()))?;
        }

        self.sales_repo
            .update_header(
                &mut *tx,
                sale.id,
                input.customer_id,
                input.date.unwrap_or(sale.date),
                input.sale_type,
                input.payment_method,
            )
            .await?;

        let existing = self.sales_repo.list_details(&mut *tx, sale.id).await?;

        if input.details.is_empty() {
            // Pasa a total directo: las líneas viejas se van.
            for detail in &existing {
                self.sales_repo.delete_detail(&mut *tx, detail.id).await?;
            }
            let total = input
                .total
                .filter(|t| *t > Decimal::ZERO)
                .ok_or_else(|| AppError::Validation("El total debe ser mayor a cero.".into()))?;
            self.sales_repo
                .set_total(&mut *tx, sale.id, quantize_money(total))
                .await?;
        } else {
            let mut leftover = existing;
            for line in &input.details {
                let product = self
                    .catalog_repo
                    .get_product(&mut *tx, line.product_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Producto no encontrado.".into()))?;
                let price = resolve_price(&product, input.sale_type)?;
                let quantity = quantize_quantity(line.quantity);

                if let Some(pos) = leftover.iter().position(|d| d.product_id == product.id) {
                    let detail = leftover.swap_remove(pos);
                    self.sales_repo
                        .update_detail(&mut *tx, detail.id, product.id, quantity, price)
                        .await?;
                } else {
                    self.sales_repo
                        .insert_detail(&mut *tx, sale.id, product.id, quantity, price)
                        .await?;
                }
            }
            for detail in &leftover {
                self.sales_repo.delete_detail(&mut *tx, detail.id).await?;
            }
            self.sales_repo.recalculate_total(&mut *tx, sale.id).await?;
        }

        let response = self.load_response_by_id(&mut tx, sale.id).await?;
        tx.commit().await?;

        Ok(response)
    }

    pub async fn delete_sale<'a, A>(&self, conn: A, sale_id: Uuid) -> Result<(), AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut tx = conn.begin().await?;

        self.sales_repo
            .get_sale_for_update(&mut *tx, sale_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Venta no encontrada.".into()))?;

        if self.sales_repo.has_active_returns(&mut *tx, sale_id).await? {
            return Err(AppError::Validation(
                "No se puede eliminar una venta con devoluciones activas.".into(),
            ));
        }

        self.sales_repo.soft_delete(&mut *tx, sale_id).await?;
        tx.commit().await?;

        Ok(())
    }

    // =========================================================================
    //  TRANSICIONES
    // =========================================================================

    pub async fn cancel<'a, A>(&self, conn: A, sale_id: Uuid) -> Result<SaleResponse, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut tx = conn.begin().await?;

        let sale = self
            .sales_repo
            .get_sale_for_update(&mut *tx, sale_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Venta no encontrada.".into()))?;

        let current = self.require_state(&mut tx, sale.id).await?;
        let target = current.state.cancel_target()?;

        self.sales_repo.close_state(&mut *tx, current.id).await?;
        self.sales_repo.append_state(&mut *tx, sale.id, target).await?;

        let response = self.load_response_by_id(&mut tx, sale.id).await?;
        tx.commit().await?;

        Ok(response)
    }

    pub async fn mark_as_delivered<'a, A>(
        &self,
        conn: A,
        sale_id: Uuid,
    ) -> Result<SaleResponse, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut tx = conn.begin().await?;

        let sale = self
            .sales_repo
            .get_sale_for_update(&mut *tx, sale_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Venta no encontrada.".into()))?;

        let current = self.require_state(&mut tx, sale.id).await?;
        current.state.ensure_can_deliver()?;

        self.sales_repo.close_state(&mut *tx, current.id).await?;
        self.sales_repo
            .append_state(&mut *tx, sale.id, SaleState::Entregada)
            .await?;

        let response = self.load_response_by_id(&mut tx, sale.id).await?;
        tx.commit().await?;

        Ok(response)
    }

    /// Cobro total: el monto cobrado se deriva solo, total menos
    /// devoluciones. El cobro con monto explícito es la operación parcial.
    pub async fn mark_as_charged<'a, A>(
        &self,
        conn: A,
        sale_id: Uuid,
    ) -> Result<SaleResponse, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut tx = conn.begin().await?;

        let sale = self
            .sales_repo
            .get_sale_for_update(&mut *tx, sale_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Venta no encontrada.".into()))?;

        let current = self.require_state(&mut tx, sale.id).await?;
        current.state.ensure_can_charge()?;

        let total = self.require_total(&sale)?;
        let returns_total = self.sales_repo.sum_returns_total(&mut *tx, sale.id).await?;
        let to_collect = compute_collectible(total, returns_total, Decimal::ZERO)?;

        self.sales_repo
            .set_total_collected(&mut *tx, sale.id, to_collect)
            .await?;
        self.sales_repo.close_state(&mut *tx, current.id).await?;
        self.sales_repo
            .append_state(&mut *tx, sale.id, SaleState::Cobrada)
            .await?;

        let response = self.load_response_by_id(&mut tx, sale.id).await?;
        tx.commit().await?;

        Ok(response)
    }

    pub async fn mark_as_partially_charged<'a, A>(
        &self,
        conn: A,
        sale_id: Uuid,
        amount: Decimal,
    ) -> Result<SaleResponse, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let amount = quantize_money(amount);
        if amount <= Decimal::ZERO {
            return Err(AppError::Validation(
                "El monto a cobrar debe ser mayor a cero.".into(),
            ));
        }

        let mut tx = conn.begin().await?;

        let sale = self
            .sales_repo
            .get_sale_for_update(&mut *tx, sale_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Venta no encontrada.".into()))?;

        let current = self.require_state(&mut tx, sale.id).await?;
        current.state.ensure_can_charge()?;

        let total = self.require_total(&sale)?;
        let collected = sale.total_collected.unwrap_or_else(zero_money);
        let returns_total = self.sales_repo.sum_returns_total(&mut *tx, sale.id).await?;
        let remaining = compute_collectible(total, returns_total, collected)?;

        if amount > remaining {
            return Err(AppError::Validation(format!(
                "El monto supera el saldo pendiente de {remaining}."
            )));
        }

        let new_collected = quantize_money(collected + amount);
        self.sales_repo
            .set_total_collected(&mut *tx, sale.id, new_collected)
            .await?;

        let target = if amount == remaining {
            SaleState::Cobrada
        } else {
            SaleState::CobradaParcial
        };
        if target != current.state {
            self.sales_repo.close_state(&mut *tx, current.id).await?;
            self.sales_repo.append_state(&mut *tx, sale.id, target).await?;
        }

        let response = self.load_response_by_id(&mut tx, sale.id).await?;
        tx.commit().await?;

        Ok(response)
    }

    /// Invocada por el scheduler a la hora pactada de la venta. Si la
    /// venta ya no está en `creada` es un no-op silencioso, el scheduler
    /// no tiene forma de reaccionar a un error.
    pub async fn advance_to_pending_delivery<'a, A>(
        &self,
        conn: A,
        sale_id: Uuid,
    ) -> Result<bool, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut tx = conn.begin().await?;

        let sale = self
            .sales_repo
            .get_sale_for_update(&mut *tx, sale_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Venta no encontrada.".into()))?;

        let current = self.require_state(&mut tx, sale.id).await?;
        if current.state != SaleState::Creada {
            return Ok(false);
        }

        self.sales_repo.close_state(&mut *tx, current.id).await?;
        self.sales_repo
            .append_state(&mut *tx, sale.id, SaleState::PendienteEntrega)
            .await?;
        tx.commit().await?;

        Ok(true)
    }

    /// Barrido diario del scheduler: avanza toda venta con entrega de hoy
    /// que siga en `creada`. Devuelve cuántas avanzó.
    pub async fn check_sales_for_delivery<'a, A>(&self, conn: A) -> Result<usize, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let (start, end) = today_range(Utc::now());

        let mut tx = conn.begin().await?;
        let sale_ids = self
            .sales_repo
            .list_creada_sales_between(&mut *tx, start, end)
            .await?;

        let mut advanced = 0;
        for sale_id in sale_ids {
            if self.advance_to_pending_delivery(&mut *tx, sale_id).await? {
                advanced += 1;
            }
        }
        tx.commit().await?;

        tracing::info!(advanced, "barrido de entregas completado");
        Ok(advanced)
    }

    // =========================================================================
    //  INTERNOS
    // =========================================================================

    fn require_total(&self, sale: &Sale) -> Result<Decimal, AppError> {
        sale.total
            .ok_or_else(|| AppError::Integrity(format!("la venta {} no tiene total", sale.id)))
    }

    /// Toda venta activa tiene al menos un cambio de estado; no tenerlo
    /// es un bug de integridad.
    async fn require_state(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
        sale_id: Uuid,
    ) -> Result<StateChange, AppError> {
        self.sales_repo
            .current_state(&mut **tx, sale_id)
            .await?
            .ok_or_else(|| {
                AppError::Integrity(format!("la venta {sale_id} no tiene cambios de estado"))
            })
    }

    async fn load_response_by_id(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
        sale_id: Uuid,
    ) -> Result<SaleResponse, AppError> {
        let sale = self
            .sales_repo
            .get_sale(&mut **tx, sale_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Venta no encontrada.".into()))?;
        self.load_response(&mut **tx, sale).await
    }

    async fn load_response(
        &self,
        conn: &mut PgConnection,
        sale: Sale,
    ) -> Result<SaleResponse, AppError> {
        let details = self.sales_repo.list_details(&mut *conn, sale.id).await?;
        let state_changes = self.sales_repo.list_state_changes(&mut *conn, sale.id).await?;
        let state = state_changes.last().map(|sc| sc.state);

        Ok(SaleResponse {
            sale,
            state,
            details,
            state_changes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn product(retail: Decimal, wholesale: Decimal) -> Product {
        Product {
            id: Uuid::new_v4(),
            barcode: "779".into(),
            name: "Pan Francés".into(),
            slug: "pan-frances".into(),
            retail_price: retail,
            wholesale_price: wholesale,
            is_active: true,
        }
    }

    #[test]
    fn precio_minorista_usa_precio_de_mostrador() {
        let p = product(dec!(150), dec!(120));
        assert_eq!(resolve_price(&p, SaleType::Minorista).unwrap(), dec!(150.00));
    }

    #[test]
    fn precio_mayorista_cae_al_minorista_si_falta() {
        let p = product(dec!(10), dec!(0));
        assert_eq!(resolve_price(&p, SaleType::Mayorista).unwrap(), dec!(10.00));
    }

    #[test]
    fn producto_sin_precios_se_rechaza() {
        let p = product(dec!(0), dec!(0));
        let err = resolve_price(&p, SaleType::Mayorista).unwrap_err();
        assert!(err.to_string().contains("Pan Francés"));
        assert!(resolve_price(&p, SaleType::Minorista).is_err());
    }

    #[test]
    fn compute_total_redondea_a_dos_decimales() {
        let total = compute_total(&[(dec!(2), dec!(10.00)), (dec!(1.5), dec!(3.333))]);
        assert_eq!(total.to_string(), "25.00");
    }

    #[test]
    fn compute_total_vacio_es_cero_con_centavos() {
        assert_eq!(compute_total(&[]).to_string(), "0.00");
    }

    #[test]
    fn saldo_pendiente_resta_devoluciones_y_cobrado() {
        let remaining = compute_collectible(dec!(100), dec!(20), dec!(30)).unwrap();
        assert_eq!(remaining.to_string(), "50.00");
    }

    #[test]
    fn devoluciones_mayores_al_total_se_rechazan() {
        assert!(compute_collectible(dec!(50), dec!(60), Decimal::ZERO).is_err());
    }

    #[test]
    fn exactamente_uno_entre_detalles_y_total() {
        assert!(validate_modality(false, None).is_err());
        assert!(validate_modality(true, Some(dec!(10))).is_err());
        assert!(validate_modality(true, None).is_ok());
        assert!(validate_modality(false, Some(dec!(10))).is_ok());
    }

    #[test]
    fn lineas_duplicadas_se_rechazan() {
        let id = Uuid::new_v4();
        let lines = vec![
            SaleLineInput {
                product_id: id,
                quantity: dec!(1),
            },
            SaleLineInput {
                product_id: id,
                quantity: dec!(2),
            },
        ];
        assert!(validate_lines(&lines).is_err());
    }

    #[test]
    fn cantidad_no_positiva_se_rechaza() {
        let lines = vec![SaleLineInput {
            product_id: Uuid::new_v4(),
            quantity: dec!(0),
        }];
        assert!(validate_lines(&lines).is_err());
    }

    #[test]
    fn rango_de_hoy_es_medianoche_a_medianoche() {
        let now = "2026-08-25T14:30:00Z".parse::<DateTime<Utc>>().unwrap();
        let (start, end) = today_range(now);
        assert_eq!(start.to_rfc3339(), "2026-08-25T00:00:00+00:00");
        assert_eq!(end - start, Duration::days(1));
    }
}

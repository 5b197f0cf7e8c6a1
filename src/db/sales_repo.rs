// src/db/sales_repo.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        catalog::SaleType,
        sales::{PaymentMethod, Sale, SaleDetail, SaleState, StateChange},
    },
};

/// Filtros del listado de ventas.
#[derive(Debug, Default)]
pub struct SaleListFilter {
    pub state: Option<SaleState>,
    pub customer_id: Option<Uuid>,
    pub sale_type: Option<SaleType>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub min_total: Option<Decimal>,
    pub max_total: Option<Decimal>,
}

// Subquery del último estado; es LA forma de leer el estado actual, no se
// repite este ORDER BY en otros lados.
const LATEST_STATE_SUBQUERY: &str =
    "(SELECT sc.state FROM state_changes sc WHERE sc.sale_id = sales.id \
     ORDER BY sc.start_date DESC LIMIT 1)";

#[derive(Clone)]
pub struct SalesRepository {
    #[allow(dead_code)]
    pool: PgPool,
}

impl SalesRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  VENTAS
    // =========================================================================

    #[allow(clippy::too_many_arguments)]
    pub async fn create_sale<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        customer_id: Option<Uuid>,
        date: Option<DateTime<Utc>>,
        total: Option<Decimal>,
        sale_type: SaleType,
        payment_method: PaymentMethod,
        needs_delivery: bool,
    ) -> Result<Sale, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            INSERT INTO sales (user_id, customer_id, date, total, sale_type, payment_method, needs_delivery)
            VALUES ($1, $2, COALESCE($3, NOW()), $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(customer_id)
        .bind(date)
        .bind(total)
        .bind(sale_type)
        .bind(payment_method)
        .bind(needs_delivery)
        .fetch_one(executor)
        .await?;

        Ok(sale)
    }

    pub async fn get_sale<'e, E>(
        &self,
        executor: E,
        sale_id: Uuid,
    ) -> Result<Option<Sale>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale =
            sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE id = $1 AND is_active = TRUE")
                .bind(sale_id)
                .fetch_optional(executor)
                .await?;

        Ok(sale)
    }

    /// Lee la venta bloqueando la fila. Toda transición de estado arranca
    /// acá para serializar el leer-cerrar-agregar por venta.
    pub async fn get_sale_for_update<'e, E>(
        &self,
        executor: E,
        sale_id: Uuid,
    ) -> Result<Option<Sale>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>(
            "SELECT * FROM sales WHERE id = $1 AND is_active = TRUE FOR UPDATE",
        )
        .bind(sale_id)
        .fetch_optional(executor)
        .await?;

        Ok(sale)
    }

    pub async fn list_sales<'e, E>(
        &self,
        executor: E,
        filter: &SaleListFilter,
    ) -> Result<Vec<Sale>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb =
            QueryBuilder::<Postgres>::new("SELECT * FROM sales WHERE is_active = TRUE");

        if let Some(state) = filter.state {
            qb.push(format!(" AND {LATEST_STATE_SUBQUERY} = "));
            qb.push_bind(state);
        }
        if let Some(customer_id) = filter.customer_id {
            qb.push(" AND customer_id = ");
            qb.push_bind(customer_id);
        }
        if let Some(sale_type) = filter.sale_type {
            qb.push(" AND sale_type = ");
            qb.push_bind(sale_type);
        }
        if let Some(start) = filter.start_date {
            qb.push(" AND date >= ");
            qb.push_bind(start);
        }
        if let Some(end) = filter.end_date {
            qb.push(" AND date < ");
            qb.push_bind(end);
        }
        if let Some(min_total) = filter.min_total {
            qb.push(" AND total >= ");
            qb.push_bind(min_total);
        }
        if let Some(max_total) = filter.max_total {
            qb.push(" AND total <= ");
            qb.push_bind(max_total);
        }

        qb.push(" ORDER BY date DESC");

        let sales = qb.build_query_as::<Sale>().fetch_all(executor).await?;
        Ok(sales)
    }

    pub async fn update_header<'e, E>(
        &self,
        executor: E,
        sale_id: Uuid,
        customer_id: Option<Uuid>,
        date: DateTime<Utc>,
        sale_type: SaleType,
        payment_method: PaymentMethod,
    ) -> Result<Sale, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            UPDATE sales
            SET customer_id = $2, date = $3, sale_type = $4, payment_method = $5
            WHERE id = $1 AND is_active = TRUE
            RETURNING *
            "#,
        )
        .bind(sale_id)
        .bind(customer_id)
        .bind(date)
        .bind(sale_type)
        .bind(payment_method)
        .fetch_one(executor)
        .await?;

        Ok(sale)
    }

    pub async fn set_total<'e, E>(
        &self,
        executor: E,
        sale_id: Uuid,
        total: Decimal,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE sales SET total = $2 WHERE id = $1")
            .bind(sale_id)
            .bind(total)
            .execute(executor)
            .await?;

        Ok(())
    }

    pub async fn set_total_collected<'e, E>(
        &self,
        executor: E,
        sale_id: Uuid,
        total_collected: Decimal,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE sales SET total_collected = $2 WHERE id = $1")
            .bind(sale_id)
            .bind(total_collected)
            .execute(executor)
            .await?;

        Ok(())
    }

    pub async fn soft_delete<'e, E>(&self, executor: E, sale_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE sales SET is_active = FALSE WHERE id = $1")
            .bind(sale_id)
            .execute(executor)
            .await?;

        Ok(())
    }

    // =========================================================================
    //  DETALLES
    // =========================================================================

    pub async fn insert_detail<'e, E>(
        &self,
        executor: E,
        sale_id: Uuid,
        product_id: Uuid,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<SaleDetail, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let detail = sqlx::query_as::<_, SaleDetail>(
            r#"
            INSERT INTO sale_details (sale_id, product_id, quantity, price)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(sale_id)
        .bind(product_id)
        .bind(quantity)
        .bind(price)
        .fetch_one(executor)
        .await?;

        Ok(detail)
    }

    pub async fn update_detail<'e, E>(
        &self,
        executor: E,
        detail_id: Uuid,
        product_id: Uuid,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<SaleDetail, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let detail = sqlx::query_as::<_, SaleDetail>(
            r#"
            UPDATE sale_details
            SET product_id = $2, quantity = $3, price = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(detail_id)
        .bind(product_id)
        .bind(quantity)
        .bind(price)
        .fetch_one(executor)
        .await?;

        Ok(detail)
    }

    pub async fn delete_detail<'e, E>(&self, executor: E, detail_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM sale_details WHERE id = $1")
            .bind(detail_id)
            .execute(executor)
            .await?;

        Ok(())
    }

    pub async fn list_details<'e, E>(
        &self,
        executor: E,
        sale_id: Uuid,
    ) -> Result<Vec<SaleDetail>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let details = sqlx::query_as::<_, SaleDetail>(
            "SELECT * FROM sale_details WHERE sale_id = $1 ORDER BY id",
        )
        .bind(sale_id)
        .fetch_all(executor)
        .await?;

        Ok(details)
    }

    /// Recalcula y actualiza el total en UNA sola query, al estilo
    /// UPDATE-con-subquery. Devuelve el total nuevo.
    pub async fn recalculate_total<'e, E>(
        &self,
        executor: E,
        sale_id: Uuid,
    ) -> Result<Decimal, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total = sqlx::query_scalar::<_, Decimal>(
            r#"
            UPDATE sales
            SET total = ROUND((
                SELECT COALESCE(SUM(quantity * price), 0)
                FROM sale_details
                WHERE sale_details.sale_id = sales.id
            ), 2)
            WHERE id = $1
            RETURNING total
            "#,
        )
        .bind(sale_id)
        .fetch_one(executor)
        .await?;

        Ok(total)
    }

    // =========================================================================
    //  LOG DE ESTADOS
    // =========================================================================

    /// Accessor centralizado del estado actual: el cambio de estado con el
    /// start_date más reciente.
    pub async fn current_state<'e, E>(
        &self,
        executor: E,
        sale_id: Uuid,
    ) -> Result<Option<StateChange>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let state_change = sqlx::query_as::<_, StateChange>(
            r#"
            SELECT * FROM state_changes
            WHERE sale_id = $1
            ORDER BY start_date DESC
            LIMIT 1
            "#,
        )
        .bind(sale_id)
        .fetch_optional(executor)
        .await?;

        Ok(state_change)
    }

    /// Cierra un cambio de estado abierto. Las filas pasadas nunca cambian
    /// de estado, solo reciben su end_date.
    pub async fn close_state<'e, E>(
        &self,
        executor: E,
        state_change_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "UPDATE state_changes SET end_date = NOW() WHERE id = $1 AND end_date IS NULL",
        )
        .bind(state_change_id)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn append_state<'e, E>(
        &self,
        executor: E,
        sale_id: Uuid,
        state: SaleState,
    ) -> Result<StateChange, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let state_change = sqlx::query_as::<_, StateChange>(
            r#"
            INSERT INTO state_changes (sale_id, state)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(sale_id)
        .bind(state)
        .fetch_one(executor)
        .await?;

        Ok(state_change)
    }

    pub async fn list_state_changes<'e, E>(
        &self,
        executor: E,
        sale_id: Uuid,
    ) -> Result<Vec<StateChange>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let changes = sqlx::query_as::<_, StateChange>(
            "SELECT * FROM state_changes WHERE sale_id = $1 ORDER BY start_date ASC",
        )
        .bind(sale_id)
        .fetch_all(executor)
        .await?;

        Ok(changes)
    }

    // =========================================================================
    //  AUXILIARES
    // =========================================================================

    pub async fn has_active_returns<'e, E>(
        &self,
        executor: E,
        sale_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM returns WHERE sale_id = $1 AND is_active = TRUE)",
        )
        .bind(sale_id)
        .fetch_one(executor)
        .await?;

        Ok(exists)
    }

    pub async fn sum_returns_total<'e, E>(
        &self,
        executor: E,
        sale_id: Uuid,
    ) -> Result<Decimal, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(total), 0)
            FROM returns
            WHERE sale_id = $1 AND is_active = TRUE
            "#,
        )
        .bind(sale_id)
        .fetch_one(executor)
        .await?;

        Ok(total)
    }

    /// Ventas con entrega que hoy siguen en estado `creada`; el barrido
    /// diario del scheduler las avanza a pendiente de entrega.
    pub async fn list_creada_sales_between<'e, E>(
        &self,
        executor: E,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ids = sqlx::query_scalar::<_, Uuid>(&format!(
            r#"
            SELECT id FROM sales
            WHERE is_active = TRUE
              AND needs_delivery = TRUE
              AND date >= $1 AND date < $2
              AND {LATEST_STATE_SUBQUERY} = 'creada'
            "#
        ))
        .bind(start)
        .bind(end)
        .fetch_all(executor)
        .await?;

        Ok(ids)
    }

    /// ¿El cliente ya tiene una venta con entrega en el rango? Usado para
    /// que la generación de pedidos fijos sea idempotente.
    pub async fn customer_has_delivery_sale_between<'e, E>(
        &self,
        executor: E,
        customer_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM sales
                WHERE is_active = TRUE
                  AND needs_delivery = TRUE
                  AND customer_id = $1
                  AND date >= $2 AND date < $3
            )
            "#,
        )
        .bind(customer_id)
        .bind(start)
        .bind(end)
        .fetch_one(executor)
        .await?;

        Ok(exists)
    }
}

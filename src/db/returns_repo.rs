// src/db/returns_repo.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::returns::{Return, ReturnDetail},
};

#[derive(Debug, Default)]
pub struct ReturnListFilter {
    pub sale_id: Option<Uuid>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Cantidad agregada por producto, para el chequeo de topes de devolución.
#[derive(Debug, sqlx::FromRow)]
pub struct ProductQuantityRow {
    pub product_id: Uuid,
    pub quantity: Decimal,
}

#[derive(Clone)]
pub struct ReturnsRepository {
    #[allow(dead_code)]
    pool: PgPool,
}

impl ReturnsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_return<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        sale_id: Uuid,
        date: Option<DateTime<Utc>>,
    ) -> Result<Return, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let return_order = sqlx::query_as::<_, Return>(
            r#"
            INSERT INTO returns (user_id, sale_id, date)
            VALUES ($1, $2, COALESCE($3, NOW()))
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(sale_id)
        .bind(date)
        .fetch_one(executor)
        .await?;

        Ok(return_order)
    }

    pub async fn get_return<'e, E>(
        &self,
        executor: E,
        return_id: Uuid,
    ) -> Result<Option<Return>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let return_order =
            sqlx::query_as::<_, Return>("SELECT * FROM returns WHERE id = $1 AND is_active = TRUE")
                .bind(return_id)
                .fetch_optional(executor)
                .await?;

        Ok(return_order)
    }

    pub async fn list_returns<'e, E>(
        &self,
        executor: E,
        filter: &ReturnListFilter,
    ) -> Result<Vec<Return>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM returns WHERE is_active = TRUE");

        if let Some(sale_id) = filter.sale_id {
            qb.push(" AND sale_id = ");
            qb.push_bind(sale_id);
        }
        if let Some(start) = filter.start_date {
            qb.push(" AND date >= ");
            qb.push_bind(start);
        }
        if let Some(end) = filter.end_date {
            qb.push(" AND date < ");
            qb.push_bind(end);
        }

        qb.push(" ORDER BY date DESC");

        let returns = qb.build_query_as::<Return>().fetch_all(executor).await?;
        Ok(returns)
    }

    pub async fn insert_detail<'e, E>(
        &self,
        executor: E,
        return_id: Uuid,
        product_id: Uuid,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<ReturnDetail, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let detail = sqlx::query_as::<_, ReturnDetail>(
            r#"
            INSERT INTO return_details (return_id, product_id, quantity, price)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(return_id)
        .bind(product_id)
        .bind(quantity)
        .bind(price)
        .fetch_one(executor)
        .await?;

        Ok(detail)
    }

    pub async fn delete_details<'e, E>(&self, executor: E, return_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM return_details WHERE return_id = $1")
            .bind(return_id)
            .execute(executor)
            .await?;

        Ok(())
    }

    pub async fn list_details<'e, E>(
        &self,
        executor: E,
        return_id: Uuid,
    ) -> Result<Vec<ReturnDetail>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let details = sqlx::query_as::<_, ReturnDetail>(
            "SELECT * FROM return_details WHERE return_id = $1 ORDER BY id",
        )
        .bind(return_id)
        .fetch_all(executor)
        .await?;

        Ok(details)
    }

    /// Misma regla de redondeo que el total de la venta.
    pub async fn recalculate_total<'e, E>(
        &self,
        executor: E,
        return_id: Uuid,
    ) -> Result<Decimal, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total = sqlx::query_scalar::<_, Decimal>(
            r#"
            UPDATE returns
            SET total = ROUND((
                SELECT COALESCE(SUM(quantity * price), 0)
                FROM return_details
                WHERE return_details.return_id = returns.id
            ), 2)
            WHERE id = $1
            RETURNING total
            "#,
        )
        .bind(return_id)
        .fetch_one(executor)
        .await?;

        Ok(total)
    }

    pub async fn soft_delete<'e, E>(&self, executor: E, return_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE returns SET is_active = FALSE WHERE id = $1")
            .bind(return_id)
            .execute(executor)
            .await?;

        Ok(())
    }

    /// Cantidad vendida por producto en una venta.
    pub async fn sold_quantities<'e, E>(
        &self,
        executor: E,
        sale_id: Uuid,
    ) -> Result<Vec<ProductQuantityRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, ProductQuantityRow>(
            r#"
            SELECT product_id, SUM(quantity) AS quantity
            FROM sale_details
            WHERE sale_id = $1
            GROUP BY product_id
            "#,
        )
        .bind(sale_id)
        .fetch_all(executor)
        .await?;

        Ok(rows)
    }

    /// Cantidad ya devuelta por producto sobre TODAS las devoluciones
    /// activas de la venta, opcionalmente excluyendo una (la que se está
    /// editando).
    pub async fn returned_quantities<'e, E>(
        &self,
        executor: E,
        sale_id: Uuid,
        exclude_return_id: Option<Uuid>,
    ) -> Result<Vec<ProductQuantityRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, ProductQuantityRow>(
            r#"
            SELECT rd.product_id, SUM(rd.quantity) AS quantity
            FROM return_details rd
            JOIN returns r ON r.id = rd.return_id
            WHERE r.sale_id = $1
              AND r.is_active = TRUE
              AND ($2::uuid IS NULL OR r.id <> $2)
            GROUP BY rd.product_id
            "#,
        )
        .bind(sale_id)
        .bind(exclude_return_id)
        .fetch_all(executor)
        .await?;

        Ok(rows)
    }
}

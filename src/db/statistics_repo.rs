// src/db/statistics_repo.rs
//
// Queries de agregación del motor de estadísticas. Solo cuentan ventas
// activas cuyo estado actual es `cobrada`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;

// Mismo accessor de estado actual que el resto del sistema, con la venta
// aliasada como `s`.
const SALE_IS_COBRADA: &str =
    "(SELECT sc.state FROM state_changes sc WHERE sc.sale_id = s.id \
     ORDER BY sc.start_date DESC LIMIT 1) = 'cobrada'";

#[derive(Debug, sqlx::FromRow)]
pub struct SalesTotalsRow {
    pub sales_count: i64,
    pub total_sales: Decimal,
    pub total_collected: Decimal,
}

#[derive(Debug, sqlx::FromRow)]
pub struct SalesBucketRow {
    pub bucket: DateTime<Utc>,
    pub sales_count: i64,
    pub total_sales: Decimal,
    pub total_collected: Decimal,
}

#[derive(Debug, sqlx::FromRow)]
pub struct AmountBucketRow {
    pub bucket: DateTime<Utc>,
    pub amount: Decimal,
}

#[derive(Debug, sqlx::FromRow)]
pub struct ProductSoldRow {
    pub product_id: Uuid,
    pub product_name: String,
    pub product_slug: String,
    pub quantity: Decimal,
}

#[derive(Debug, sqlx::FromRow)]
pub struct ProductReturnedRow {
    pub product_id: Uuid,
    pub quantity: Decimal,
}

#[derive(Clone)]
pub struct StatisticsRepository {
    #[allow(dead_code)]
    pool: PgPool,
}

impl StatisticsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn sales_totals<'e, E>(
        &self,
        executor: E,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<SalesTotalsRow, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, SalesTotalsRow>(&format!(
            r#"
            SELECT
                COUNT(*) AS sales_count,
                COALESCE(SUM(s.total), 0) AS total_sales,
                COALESCE(SUM(s.total_collected), 0) AS total_collected
            FROM sales s
            WHERE s.is_active = TRUE
              AND s.date >= $1 AND s.date < $2
              AND {SALE_IS_COBRADA}
            "#
        ))
        .bind(start)
        .bind(end)
        .fetch_one(executor)
        .await?;

        Ok(row)
    }

    pub async fn returns_total<'e, E>(
        &self,
        executor: E,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Decimal, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(total), 0)
            FROM returns
            WHERE is_active = TRUE AND date >= $1 AND date < $2
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(executor)
        .await?;

        Ok(total)
    }

    /// Cantidad vendida por producto en las ventas que califican.
    pub async fn sold_by_product<'e, E>(
        &self,
        executor: E,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ProductSoldRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, ProductSoldRow>(&format!(
            r#"
            SELECT
                p.id AS product_id,
                p.name AS product_name,
                p.slug AS product_slug,
                SUM(d.quantity) AS quantity
            FROM sale_details d
            JOIN sales s ON s.id = d.sale_id
            JOIN products p ON p.id = d.product_id
            WHERE s.is_active = TRUE
              AND s.date >= $1 AND s.date < $2
              AND {SALE_IS_COBRADA}
            GROUP BY p.id, p.name, p.slug
            "#
        ))
        .bind(start)
        .bind(end)
        .fetch_all(executor)
        .await?;

        Ok(rows)
    }

    /// Cantidad devuelta por producto contra esas mismas ventas.
    pub async fn returned_by_product<'e, E>(
        &self,
        executor: E,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ProductReturnedRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, ProductReturnedRow>(&format!(
            r#"
            SELECT rd.product_id, SUM(rd.quantity) AS quantity
            FROM return_details rd
            JOIN returns r ON r.id = rd.return_id
            JOIN sales s ON s.id = r.sale_id
            WHERE r.is_active = TRUE
              AND s.is_active = TRUE
              AND s.date >= $1 AND s.date < $2
              AND {SALE_IS_COBRADA}
            GROUP BY rd.product_id
            "#
        ))
        .bind(start)
        .bind(end)
        .fetch_all(executor)
        .await?;

        Ok(rows)
    }

    pub async fn sales_by_bucket<'e, E>(
        &self,
        executor: E,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        trunc_unit: &str,
    ) -> Result<Vec<SalesBucketRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, SalesBucketRow>(&format!(
            r#"
            SELECT
                date_trunc($3, s.date) AS bucket,
                COUNT(*) AS sales_count,
                COALESCE(SUM(s.total), 0) AS total_sales,
                COALESCE(SUM(s.total_collected), 0) AS total_collected
            FROM sales s
            WHERE s.is_active = TRUE
              AND s.date >= $1 AND s.date < $2
              AND {SALE_IS_COBRADA}
            GROUP BY bucket
            ORDER BY bucket
            "#
        ))
        .bind(start)
        .bind(end)
        .bind(trunc_unit)
        .fetch_all(executor)
        .await?;

        Ok(rows)
    }

    pub async fn returns_by_bucket<'e, E>(
        &self,
        executor: E,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        trunc_unit: &str,
    ) -> Result<Vec<AmountBucketRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, AmountBucketRow>(
            r#"
            SELECT date_trunc($3, date) AS bucket, COALESCE(SUM(total), 0) AS amount
            FROM returns
            WHERE is_active = TRUE AND date >= $1 AND date < $2
            GROUP BY bucket
            ORDER BY bucket
            "#,
        )
        .bind(start)
        .bind(end)
        .bind(trunc_unit)
        .fetch_all(executor)
        .await?;

        Ok(rows)
    }
}

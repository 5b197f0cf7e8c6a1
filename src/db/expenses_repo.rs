// src/db/expenses_repo.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};

use crate::common::error::AppError;

/// Lectura del libro de gastos. Los gastos se cargan en otro servicio;
/// las estadísticas solamente los suman.
#[derive(Clone)]
pub struct ExpensesRepository {
    #[allow(dead_code)]
    pool: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
pub struct AmountBucketRow {
    pub bucket: DateTime<Utc>,
    pub amount: Decimal,
}

impl ExpensesRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn sum_between<'e, E>(
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
            SELECT COALESCE(SUM(amount), 0)
            FROM expenses
            WHERE is_active = TRUE AND date >= $1 AND date < $2
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(executor)
        .await?;

        Ok(total)
    }

    pub async fn amounts_by_bucket<'e, E>(
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
            SELECT date_trunc($3, date) AS bucket, SUM(amount) AS amount
            FROM expenses
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

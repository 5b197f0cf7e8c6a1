// src/db/collects_repo.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{common::error::AppError, models::collects::Collect};

#[derive(Debug, Default)]
pub struct CollectListFilter {
    pub customer_id: Option<Uuid>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct CollectsRepository {
    #[allow(dead_code)]
    pool: PgPool,
}

impl CollectsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_collect<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        customer_id: Uuid,
        date: Option<DateTime<Utc>>,
        total: Decimal,
    ) -> Result<Collect, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let collect = sqlx::query_as::<_, Collect>(
            r#"
            INSERT INTO collects (user_id, customer_id, date, total)
            VALUES ($1, $2, COALESCE($3, NOW()), $4)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(customer_id)
        .bind(date)
        .bind(total)
        .fetch_one(executor)
        .await?;

        Ok(collect)
    }

    pub async fn get_collect<'e, E>(
        &self,
        executor: E,
        collect_id: Uuid,
    ) -> Result<Option<Collect>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let collect = sqlx::query_as::<_, Collect>(
            "SELECT * FROM collects WHERE id = $1 AND is_active = TRUE",
        )
        .bind(collect_id)
        .fetch_optional(executor)
        .await?;

        Ok(collect)
    }

    pub async fn list_collects<'e, E>(
        &self,
        executor: E,
        filter: &CollectListFilter,
    ) -> Result<Vec<Collect>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb =
            QueryBuilder::<Postgres>::new("SELECT * FROM collects WHERE is_active = TRUE");

        if let Some(customer_id) = filter.customer_id {
            qb.push(" AND customer_id = ");
            qb.push_bind(customer_id);
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

        let collects = qb.build_query_as::<Collect>().fetch_all(executor).await?;
        Ok(collects)
    }

    pub async fn soft_delete<'e, E>(&self, executor: E, collect_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE collects SET is_active = FALSE WHERE id = $1")
            .bind(collect_id)
            .execute(executor)
            .await?;

        Ok(())
    }
}

// src/db/standing_orders_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::standing_orders::{StandingOrder, StandingOrderDetail},
};

#[derive(Clone)]
pub struct StandingOrdersRepository {
    #[allow(dead_code)]
    pool: PgPool,
}

impl StandingOrdersRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        customer_id: Uuid,
        day_of_week: i16,
    ) -> Result<StandingOrder, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let standing_order = sqlx::query_as::<_, StandingOrder>(
            r#"
            INSERT INTO standing_orders (customer_id, day_of_week)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(customer_id)
        .bind(day_of_week)
        .fetch_one(executor)
        .await?;

        Ok(standing_order)
    }

    pub async fn get<'e, E>(
        &self,
        executor: E,
        standing_order_id: Uuid,
    ) -> Result<Option<StandingOrder>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let standing_order = sqlx::query_as::<_, StandingOrder>(
            "SELECT * FROM standing_orders WHERE id = $1 AND is_active = TRUE",
        )
        .bind(standing_order_id)
        .fetch_optional(executor)
        .await?;

        Ok(standing_order)
    }

    pub async fn exists_for_customer_day<'e, E>(
        &self,
        executor: E,
        customer_id: Uuid,
        day_of_week: i16,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM standing_orders
                WHERE customer_id = $1 AND day_of_week = $2 AND is_active = TRUE
            )
            "#,
        )
        .bind(customer_id)
        .bind(day_of_week)
        .fetch_one(executor)
        .await?;

        Ok(exists)
    }

    pub async fn list_all<'e, E>(&self, executor: E) -> Result<Vec<StandingOrder>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let orders = sqlx::query_as::<_, StandingOrder>(
            "SELECT * FROM standing_orders WHERE is_active = TRUE ORDER BY day_of_week, id",
        )
        .fetch_all(executor)
        .await?;

        Ok(orders)
    }

    pub async fn list_for_day<'e, E>(
        &self,
        executor: E,
        day_of_week: i16,
    ) -> Result<Vec<StandingOrder>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let orders = sqlx::query_as::<_, StandingOrder>(
            "SELECT * FROM standing_orders WHERE day_of_week = $1 AND is_active = TRUE",
        )
        .bind(day_of_week)
        .fetch_all(executor)
        .await?;

        Ok(orders)
    }

    pub async fn insert_detail<'e, E>(
        &self,
        executor: E,
        standing_order_id: Uuid,
        product_id: Uuid,
        quantity: Decimal,
    ) -> Result<StandingOrderDetail, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let detail = sqlx::query_as::<_, StandingOrderDetail>(
            r#"
            INSERT INTO standing_order_details (standing_order_id, product_id, quantity)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(standing_order_id)
        .bind(product_id)
        .bind(quantity)
        .fetch_one(executor)
        .await?;

        Ok(detail)
    }

    pub async fn delete_details<'e, E>(
        &self,
        executor: E,
        standing_order_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM standing_order_details WHERE standing_order_id = $1")
            .bind(standing_order_id)
            .execute(executor)
            .await?;

        Ok(())
    }

    pub async fn list_details<'e, E>(
        &self,
        executor: E,
        standing_order_id: Uuid,
    ) -> Result<Vec<StandingOrderDetail>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let details = sqlx::query_as::<_, StandingOrderDetail>(
            "SELECT * FROM standing_order_details WHERE standing_order_id = $1 ORDER BY id",
        )
        .bind(standing_order_id)
        .fetch_all(executor)
        .await?;

        Ok(details)
    }

    pub async fn soft_delete<'e, E>(
        &self,
        executor: E,
        standing_order_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE standing_orders SET is_active = FALSE WHERE id = $1")
            .bind(standing_order_id)
            .execute(executor)
            .await?;

        Ok(())
    }
}

// src/db/catalog_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::catalog::{Customer, Product},
};

/// Acceso de solo lectura al catálogo. El ABM de productos y clientes es
/// de otro servicio; acá solamente resolvemos precios e identidades.
#[derive(Clone)]
pub struct CatalogRepository {
    #[allow(dead_code)]
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_product<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
    ) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, barcode, name, slug, retail_price, wholesale_price, is_active
            FROM products
            WHERE id = $1 AND is_active = TRUE
            "#,
        )
        .bind(product_id)
        .fetch_optional(executor)
        .await?;

        Ok(product)
    }

    pub async fn get_product_by_slug<'e, E>(
        &self,
        executor: E,
        slug: &str,
    ) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, barcode, name, slug, retail_price, wholesale_price, is_active
            FROM products
            WHERE slug = $1 AND is_active = TRUE
            "#,
        )
        .bind(slug)
        .fetch_optional(executor)
        .await?;

        Ok(product)
    }

    pub async fn get_customer<'e, E>(
        &self,
        executor: E,
        customer_id: Uuid,
    ) -> Result<Option<Customer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, name, email, phone_number, address, customer_type, is_active
            FROM customers
            WHERE id = $1 AND is_active = TRUE
            "#,
        )
        .bind(customer_id)
        .fetch_optional(executor)
        .await?;

        Ok(customer)
    }
}

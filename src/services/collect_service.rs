// src/services/collect_service.rs
//
// Cobros a nivel cliente: liquidaciones de cuenta corriente mayorista.
// Sin máquina de estados, es un registro contable plano.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Acquire, Postgres};
use uuid::Uuid;

use crate::{
    common::{error::AppError, money::quantize_money},
    db::{CatalogRepository, CollectsRepository},
    db::collects_repo::CollectListFilter,
    models::collects::Collect,
};

#[derive(Clone)]
pub struct CollectService {
    collects_repo: CollectsRepository,
    catalog_repo: CatalogRepository,
}

impl CollectService {
    pub fn new(collects_repo: CollectsRepository, catalog_repo: CatalogRepository) -> Self {
        Self {
            collects_repo,
            catalog_repo,
        }
    }

    pub async fn create_collect<'a, A>(
        &self,
        conn: A,
        user_id: Uuid,
        customer_id: Uuid,
        date: Option<DateTime<Utc>>,
        total: Decimal,
    ) -> Result<Collect, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let total = quantize_money(total);
        if total <= Decimal::ZERO {
            return Err(AppError::Validation("El total debe ser mayor a cero.".into()));
        }

        let mut tx = conn.begin().await?;

        self.catalog_repo
            .get_customer(&mut *tx, customer_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Cliente no encontrado.".into()))?;

        let collect = self
            .collects_repo
            .create_collect(&mut *tx, user_id, customer_id, date, total)
            .await?;
        tx.commit().await?;

        Ok(collect)
    }

    pub async fn get_collect<'a, A>(&self, conn: A, collect_id: Uuid) -> Result<Collect, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = conn.acquire().await?;
        self.collects_repo
            .get_collect(&mut *conn, collect_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Cobro no encontrado.".into()))
    }

    pub async fn list_collects<'a, A>(
        &self,
        conn: A,
        filter: &CollectListFilter,
    ) -> Result<Vec<Collect>, AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut conn = conn.acquire().await?;
        self.collects_repo.list_collects(&mut *conn, filter).await
    }

    pub async fn delete_collect<'a, A>(&self, conn: A, collect_id: Uuid) -> Result<(), AppError>
    where
        A: Acquire<'a, Database = Postgres>,
    {
        let mut tx = conn.begin().await?;

        self.collects_repo
            .get_collect(&mut *tx, collect_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Cobro no encontrado.".into()))?;

        self.collects_repo.soft_delete(&mut *tx, collect_id).await?;
        tx.commit().await?;

        Ok(())
    }
}

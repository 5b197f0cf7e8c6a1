// src/config.rs

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, time::Duration};

use crate::{
    db::{
        CatalogRepository, CollectsRepository, ExpensesRepository, ReturnsRepository,
        SalesRepository, StandingOrdersRepository, StatisticsRepository,
    },
    services::{
        CollectService, ReturnService, SaleService, StandingOrderService, StatisticsService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_secret: String,
    pub sale_service: SaleService,
    pub return_service: ReturnService,
    pub collect_service: CollectService,
    pub standing_order_service: StandingOrderService,
    pub statistics_service: StatisticsService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")?;
        let jwt_secret = env::var("JWT_SECRET")?;

        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("conexión con la base de datos establecida");

        // Grafo de dependencias: repos sobre el pool, servicios sobre
        // los repos.
        let catalog_repo = CatalogRepository::new(db_pool.clone());
        let sales_repo = SalesRepository::new(db_pool.clone());
        let returns_repo = ReturnsRepository::new(db_pool.clone());
        let collects_repo = CollectsRepository::new(db_pool.clone());
        let standing_repo = StandingOrdersRepository::new(db_pool.clone());
        let expenses_repo = ExpensesRepository::new(db_pool.clone());
        let statistics_repo = StatisticsRepository::new(db_pool.clone());

        let sale_service = SaleService::new(sales_repo.clone(), catalog_repo.clone());
        let return_service = ReturnService::new(
            returns_repo.clone(),
            sales_repo.clone(),
            catalog_repo.clone(),
        );
        let collect_service = CollectService::new(collects_repo.clone(), catalog_repo.clone());
        let standing_order_service = StandingOrderService::new(
            standing_repo.clone(),
            sales_repo.clone(),
            catalog_repo.clone(),
            sale_service.clone(),
        );
        let statistics_service = StatisticsService::new(
            statistics_repo.clone(),
            expenses_repo.clone(),
            catalog_repo.clone(),
        );

        Ok(Self {
            db_pool,
            jwt_secret,
            sale_service,
            return_service,
            collect_service,
            standing_order_service,
            statistics_service,
        })
    }
}

// src/db.rs

pub mod catalog_repo;
pub mod collects_repo;
pub mod expenses_repo;
pub mod returns_repo;
pub mod sales_repo;
pub mod standing_orders_repo;
pub mod statistics_repo;

pub use catalog_repo::CatalogRepository;
pub use collects_repo::CollectsRepository;
pub use expenses_repo::ExpensesRepository;
pub use returns_repo::ReturnsRepository;
pub use sales_repo::SalesRepository;
pub use standing_orders_repo::StandingOrdersRepository;
pub use statistics_repo::StatisticsRepository;

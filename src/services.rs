// src/services.rs

pub mod collect_service;
pub mod return_service;
pub mod sale_service;
pub mod standing_order_service;
pub mod statistics_service;

pub use collect_service::CollectService;
pub use return_service::ReturnService;
pub use sale_service::SaleService;
pub use standing_order_service::StandingOrderService;
pub use statistics_service::StatisticsService;

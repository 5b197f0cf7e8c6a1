// src/handlers.rs

pub mod collects;
pub mod returns;
pub mod sales;
pub mod standing_orders;
pub mod statistics;

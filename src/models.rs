// src/models.rs

pub mod auth;
pub mod catalog;
pub mod collects;
pub mod returns;
pub mod sales;
pub mod standing_orders;
pub mod statistics;

pub mod app;
pub mod catalog;
pub mod metrics;
pub mod transactions;

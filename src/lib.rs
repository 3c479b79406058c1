pub mod analyzer;
pub mod api;
pub mod config;
pub mod entities;
pub mod intake;
pub mod metrics;
pub mod migrator;
pub mod records;
pub mod storage;
pub mod telemetry;
pub mod workflow;

pub use sea_orm;

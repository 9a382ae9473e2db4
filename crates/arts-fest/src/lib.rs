pub mod config;
pub mod error;
pub mod festival;
pub mod telemetry;

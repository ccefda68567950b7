pub mod config;
pub mod data;
pub mod error;
pub mod execution;
pub mod monitoring;
pub mod strategies;

pub mod brackets;
pub mod cache;
pub mod http;
pub mod kalshi;
pub mod retry;
pub mod sources;
pub mod types;
pub mod weather;

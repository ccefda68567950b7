pub mod edge;
pub mod edge_score;
pub mod market_implied;
pub mod model;
pub mod physical_model;
pub mod rate_model;
pub mod types;
pub mod volatility;
pub mod weather_edge;

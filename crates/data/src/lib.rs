pub mod database;
pub mod models;
pub mod repositories;
pub mod schema;

pub use database::DatabaseClient;
pub use models::{EventRow, FeatureRow, NavRow, PositionRow, SentimentRow, TradeRow};
pub use repositories::{
    CandleRepository, ConfigRepository, EventRepository, FeatureRepository, NavRepository,
    PositionRepository, SentimentRepository, TradeRepository,
};

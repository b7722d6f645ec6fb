pub mod event;
pub mod feature;
pub mod nav;
pub mod position;
pub mod sentiment;
pub mod trade;

pub use event::EventRow;
pub use feature::FeatureRow;
pub use nav::NavRow;
pub use position::PositionRow;
pub use sentiment::SentimentRow;
pub use trade::TradeRow;

//! Public Binance spot klines adapter.
//!
//! Implements the `ExchangeAdapter` contract over `GET /api/v3/klines`
//! with client-side rate limiting and bounded retries. Only public
//! endpoints are used; there is no authentication anywhere in this crate.

pub mod adapter;

pub use adapter::BinanceSpotAdapter;

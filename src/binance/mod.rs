//! Binance module - REST and WebSocket adapters for Binance public market data

pub mod messages;
pub mod rest;
pub mod websocket;

pub use rest::BinanceRestClient;
pub use websocket::BinanceWebSocketFeed;

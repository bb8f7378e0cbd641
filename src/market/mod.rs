pub mod chart;
pub mod feed;
pub mod rest;
pub mod tickers;
pub mod types;

/// Frame type announced to the push feed for the current interest list.
pub const INTEREST_FRAME_TYPE: &str = "TICKERS";

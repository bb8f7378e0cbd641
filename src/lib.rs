//! Headless client-state core for the StockIt paper-trading app.
//!
//! The crate owns the state machines behind the UI shell: the navigation
//! history engine that maps app navigation onto a native back stack, the
//! market stores that fold a websocket tick feed into candles and ticker
//! projections, the toast queue, and the local second-factor session.
//! Rendering and transport policy stay with the host.

pub mod db;
pub mod error;
pub mod history;
pub mod market;
pub mod session;
pub mod state;
pub mod toast;

pub use error::AppError;
pub use state::AppState;

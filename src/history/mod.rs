//! Dual-layer navigation history.
//!
//! A `Depth` is one navigational context (the main tab bar, the stocks
//! overlay, or a dynamic `detail_*` overlay). A `Step` is a position inside
//! that context's own linear navigation (which tab is active). The engine
//! mirrors every forward move with exactly one synthetic native-history entry
//! so that a single back gesture can later be mapped deterministically onto
//! either a step-back or a depth-close.

mod adapter;
mod back;
mod engine;

pub use adapter::{HistoryAdapter, HistoryEntry, NullAdapter, RecordingAdapter};
pub use back::{BackNavigation, CloseAction, MainScreen, StepTarget, StocksTab, MAIN_TAB_ORDER, STOCKS_TAB_ORDER};
pub use engine::{DepthId, HistoryDepth, HistoryEngine};

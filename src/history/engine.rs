use std::fmt;

use super::adapter::{HistoryAdapter, HistoryEntry};

pub const DETAIL_DEPTH_PREFIX: &str = "detail_";

/// Identifier of one navigational context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepthId {
    Main,
    Stocks,
    /// Dynamic overlay ids, e.g. `detail_notifications`.
    Named(String),
}

impl DepthId {
    pub fn detail(name: &str) -> Self {
        Self::Named(format!("{DETAIL_DEPTH_PREFIX}{name}"))
    }

    /// The overlay name behind a `detail_*` id, if this is one.
    pub fn detail_name(&self) -> Option<&str> {
        match self {
            Self::Named(id) => id.strip_prefix(DETAIL_DEPTH_PREFIX),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Main => "main",
            Self::Stocks => "stocks",
            Self::Named(id) => id.as_str(),
        }
    }
}

impl fmt::Display for DepthId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for DepthId {
    fn from(value: &str) -> Self {
        match value {
            "main" => Self::Main,
            "stocks" => Self::Stocks,
            other => Self::Named(other.to_string()),
        }
    }
}

/// One navigational context and the trail of steps visited inside it.
///
/// `step_history` is never empty while the depth sits on the stack; its last
/// element is the current step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryDepth {
    pub depth_id: DepthId,
    pub step_history: Vec<usize>,
}

impl HistoryDepth {
    pub fn current_step(&self) -> Option<usize> {
        self.step_history.last().copied()
    }
}

/// The dual Depth/Step history stack.
///
/// Every effective forward operation (`push_depth`, non-idempotent
/// `push_step`) performs exactly one adapter push, keeping the engine's stack
/// shape aligned 1:1 with the native back-stack. The pop side never touches
/// the adapter: depth/step removal is driven by the host observing a native
/// back event and calling [`HistoryEngine::handle_back`], which avoids
/// double-counting entries.
#[derive(Debug)]
pub struct HistoryEngine<A: HistoryAdapter> {
    stack: Vec<HistoryDepth>,
    adapter: A,
}

impl<A: HistoryAdapter> HistoryEngine<A> {
    pub fn new(adapter: A) -> Self {
        Self {
            stack: Vec::new(),
            adapter,
        }
    }

    /// Enters a new navigational context and mirrors it into native history.
    pub fn push_depth(&mut self, depth_id: DepthId, initial_step: usize) {
        self.adapter.push(HistoryEntry {
            depth_id: depth_id.clone(),
            step: initial_step,
        });
        self.stack.push(HistoryDepth {
            depth_id,
            step_history: vec![initial_step],
        });
    }

    /// Removes and returns the topmost depth, or `None` on an empty stack.
    ///
    /// Native history is left alone here: the back event that motivated the
    /// pop has already consumed the matching native entry.
    pub fn pop_depth(&mut self) -> Option<HistoryDepth> {
        self.stack.pop()
    }

    /// Records a new current step in the topmost depth.
    ///
    /// No-op when the stack is empty, or when `step` already is the current
    /// step (a redundant navigation event must not desynchronize the native
    /// push count).
    pub fn push_step(&mut self, step: usize) {
        let Some(depth) = self.stack.last_mut() else {
            tracing::warn!(step, "push_step ignored: no depth on stack");
            return;
        };
        if depth.current_step() == Some(step) {
            return;
        }
        depth.step_history.push(step);
        self.adapter.push(HistoryEntry {
            depth_id: depth.depth_id.clone(),
            step,
        });
    }

    /// Removes the current step of the topmost depth and returns it.
    ///
    /// Returns `None` without mutating when the stack is empty or the depth
    /// has no earlier step left — the signal that a depth-level pop is
    /// required instead.
    pub fn pop_step(&mut self) -> Option<usize> {
        let depth = self.stack.last_mut()?;
        if depth.step_history.len() <= 1 {
            return None;
        }
        depth.step_history.pop()
    }

    pub fn current_depth(&self) -> Option<&HistoryDepth> {
        self.stack.last()
    }

    pub fn current_step(&self) -> Option<usize> {
        self.current_depth()?.current_step()
    }

    /// Full stack view, for diagnostics.
    pub fn stack(&self) -> &[HistoryDepth] {
        &self.stack
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Clears the stack. Used only at full application teardown/logout.
    pub fn reset(&mut self) {
        self.stack.clear();
    }
}

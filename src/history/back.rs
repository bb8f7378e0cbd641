use super::adapter::HistoryAdapter;
use super::engine::{DepthId, HistoryDepth, HistoryEngine};

/// Fixed tab order of the main swiper.
pub const MAIN_TAB_ORDER: [MainScreen; 4] = [
    MainScreen::Home,
    MainScreen::Competitions,
    MainScreen::Rankings,
    MainScreen::Profile,
];

/// Fixed tab order of the stocks overlay.
pub const STOCKS_TAB_ORDER: [StocksTab; 3] =
    [StocksTab::Portfolio, StocksTab::Explore, StocksTab::Analysis];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainScreen {
    Home,
    Competitions,
    Rankings,
    Profile,
}

impl MainScreen {
    pub fn from_step(step: usize) -> Option<Self> {
        MAIN_TAB_ORDER.get(step).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StocksTab {
    Portfolio,
    Explore,
    Analysis,
}

impl StocksTab {
    pub fn from_step(step: usize) -> Option<Self> {
        STOCKS_TAB_ORDER.get(step).copied()
    }
}

/// UI selection a restored step resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepTarget {
    Screen(MainScreen),
    StocksView(StocksTab),
}

/// What the shell must close when a whole depth is popped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseAction {
    /// `stocks` depth popped: deactivate the stocks overlay.
    DeactivateStocks,
    /// `detail_*` depth popped: close the overlay with this name.
    CloseDetail(String),
    /// Any other depth id, dismissed without a dedicated close hook.
    Dismiss(DepthId),
}

/// Deterministic interpretation of one native back event.
#[derive(Debug, Clone, PartialEq)]
pub enum BackNavigation {
    /// Case A: the current depth had an earlier step to return to.
    StepBack {
        depth_id: DepthId,
        /// The step that was current before the back event.
        left_step: usize,
        /// The step that is current now.
        restored_step: usize,
        /// `restored_step` resolved through the depth's tab order.
        target: Option<StepTarget>,
    },
    /// Case B: the depth had a single step left, so the back event closed it.
    DepthClosed {
        closed: HistoryDepth,
        action: CloseAction,
        /// Restored selection of the depth now exposed, shown without
        /// animation.
        revealed: Option<StepTarget>,
    },
    /// Nothing tracked; native default (likely app exit) applies.
    Exhausted,
}

fn resolve_target(depth_id: &DepthId, step: usize) -> Option<StepTarget> {
    match depth_id {
        DepthId::Main => MainScreen::from_step(step).map(StepTarget::Screen),
        DepthId::Stocks => StocksTab::from_step(step).map(StepTarget::StocksView),
        DepthId::Named(_) => None,
    }
}

fn close_action(depth_id: &DepthId) -> CloseAction {
    match depth_id {
        DepthId::Stocks => CloseAction::DeactivateStocks,
        other => match other.detail_name() {
            Some(name) => CloseAction::CloseDetail(name.to_string()),
            None => CloseAction::Dismiss(other.clone()),
        },
    }
}

impl<A: HistoryAdapter> HistoryEngine<A> {
    /// Consumes exactly one native back event.
    ///
    /// The popstate event carries no payload the engine can trust for
    /// routing, so the decision between "go back one tab" and "close this
    /// overlay" is reconstructed purely from the current stack shape. Safe
    /// against rapid repeated firing: each call re-reads fresh state and
    /// consumes at most one frame.
    pub fn handle_back(&mut self) -> BackNavigation {
        let Some(depth) = self.current_depth() else {
            return BackNavigation::Exhausted;
        };
        let depth_id = depth.depth_id.clone();

        // Case A: step back within the current depth. pop_step returning a
        // value implies step_history held more than one entry.
        if let Some(left_step) = self.pop_step() {
            let restored_step = self.current_step().unwrap_or(left_step);
            return BackNavigation::StepBack {
                target: resolve_target(&depth_id, restored_step),
                depth_id,
                left_step,
                restored_step,
            };
        }

        // Case B: single step left, the back event closes the whole depth.
        let Some(closed) = self.pop_depth() else {
            return BackNavigation::Exhausted;
        };
        let action = close_action(&closed.depth_id);
        let revealed = self.current_depth().and_then(|exposed| {
            let step = exposed.current_step()?;
            resolve_target(&exposed.depth_id, step)
        });
        BackNavigation::DepthClosed {
            closed,
            action,
            revealed,
        }
    }
}

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Broad classification a crate-local `thiserror` error variant belongs to.
///
/// Every concrete error type in the workspace (`DataError`, `StrategyError`, `BrokerError`,
/// `EngineError`, ...) implements [`Categorised`] so that engine-level notification plumbing can
/// decide whether to continue the run, reject synchronously, or abort.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Invalid configuration discovered at construction time. Fatal.
    Parameter,
    /// A feed failed to parse, or produced an out-of-order bar. Non-fatal, reported via
    /// notification.
    Data,
    /// A malformed order (zero size, unknown instrument). Synchronous reject.
    OrderValidation,
    /// An external provider disconnected. Non-fatal, reported via notification.
    Store,
    /// A strategy instance asked to be omitted from the run at init time.
    StrategySkip,
    /// A bug: state the engine cannot continue from safely.
    Internal,
}

impl Display for ErrorCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ErrorCategory::Parameter => "parameter",
            ErrorCategory::Data => "data",
            ErrorCategory::OrderValidation => "order_validation",
            ErrorCategory::Store => "store",
            ErrorCategory::StrategySkip => "strategy_skip",
            ErrorCategory::Internal => "internal",
        };
        write!(f, "{label}")
    }
}

impl ErrorCategory {
    /// Whether an error of this category should abort the engine run entirely.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ErrorCategory::Parameter | ErrorCategory::Internal)
    }
}

/// Implemented by every crate-local error enum so engine plumbing can uniformly ask "is this
/// fatal?" without matching on concrete variants from a foreign crate.
pub trait Categorised {
    fn category(&self) -> ErrorCategory;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_and_internal_errors_are_fatal() {
        assert!(ErrorCategory::Parameter.is_fatal());
        assert!(ErrorCategory::Internal.is_fatal());
    }

    #[test]
    fn data_store_and_order_validation_are_not_fatal() {
        assert!(!ErrorCategory::Data.is_fatal());
        assert!(!ErrorCategory::Store.is_fatal());
        assert!(!ErrorCategory::OrderValidation.is_fatal());
        assert!(!ErrorCategory::StrategySkip.is_fatal());
    }
}

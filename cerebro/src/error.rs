use cerebro_data::DataError;
use cerebro_integration::error::{Categorised, ErrorCategory};
use cerebro_instrument::Market;
use thiserror::Error;

/// An order failed validation at submission time — synchronous, always results in
/// [`crate::order::OrderStatus::Rejected`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrderValidationError {
    #[error("order size must be nonzero")]
    ZeroSize,
    #[error("unknown instrument {0}")]
    UnknownInstrument(Market),
    #[error("limit order requires a price")]
    MissingLimitPrice,
    #[error("stop order requires a stop price")]
    MissingStopPrice,
}

impl Categorised for OrderValidationError {
    fn category(&self) -> ErrorCategory {
        ErrorCategory::OrderValidation
    }
}

/// Top-level engine error — everything that is not resolved by a notification
/// and instead aborts the run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("invalid engine configuration: {reason}")]
    Parameter { reason: String },

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    OrderValidation(#[from] OrderValidationError),

    #[error("broker matching reached an inconsistent state: {reason}")]
    Internal { reason: String },
}

impl Categorised for EngineError {
    fn category(&self) -> ErrorCategory {
        match self {
            EngineError::Parameter { .. } => ErrorCategory::Parameter,
            EngineError::Data(inner) => inner.category(),
            EngineError::OrderValidation(inner) => inner.category(),
            EngineError::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

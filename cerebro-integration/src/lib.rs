#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity)]

//! # Cerebro-Integration
//! Low-level primitives shared by every crate in the Cerebro backtesting & live-trading
//! ecosystem: the error taxonomy building blocks, a monotonic [`Sequence`] counter, construction
//! time [`Validator`], and the numeric-date encoding used by every line of time-indexed data.

/// Shared error taxonomy helpers (category markers used by crate-local `thiserror` enums).
pub mod error;

/// Monotonically increasing [`sequence::Sequence`] used to order ticks and notifications.
pub mod sequence;

/// Construction-time validation trait, used by builders across the workspace.
pub mod validator;

/// Numeric date/time encoding: days-since-epoch `f64` with fractional day-seconds (§6).
pub mod datetime;

pub use error::ErrorCategory;
pub use sequence::Sequence;
pub use validator::Validator;

#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments)]

//! # Cerebro-Data
//! The line-series data model (lazy columnar buffers with time-indexed access), the [`DataFeed`]
//! producer contract, the resampler/replayer state machine, and the trading calendar + timer
//! scheduler that sit beneath every `cerebro` `Indicator`/`Strategy`/`Engine`.
//!
//! This is the crate everything else in the workspace depends on for market data types; its
//! contents are specific to this engine's bar-driven, pull-based `load()`/`next()` model rather
//! than a push-based exchange stream.

/// [`bar::Bar`]: a single OHLCV record, and the combination rule used when aggregating.
pub mod bar;

/// [`error::DataError`]: feed/parse/ordering failures.
pub mod error;

/// The line-series data model: [`line::buffer::LineBuffer`], [`line::series::LineSeries`] and the
/// lazy arithmetic operator algebra over lines.
pub mod line;

/// The [`feed::DataFeed`] trait and its historical/live/clone implementations.
pub mod feed;

/// The resampler/replayer state machine.
pub mod resample;

/// [`calendar::TradingCalendar`] and [`timer::Timer`].
pub mod calendar;
pub mod timer;

pub use bar::Bar;
pub use error::DataError;
pub use feed::{DataFeed, LoadResult};

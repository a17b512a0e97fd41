#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments)]

//! # Cerebro
//! The event-driven backtesting/live-trading engine built on top of [`cerebro_data`]'s
//! line-series model: indicators, strategies, the simulated broker, the trade/position ledger,
//! the synchronization loop, and the default statistics analyzers.
//!
//! This is the crate a user actually depends on to assemble and run a strategy; the rest of the
//! workspace (`cerebro-data`, `cerebro-instrument`, `cerebro-integration`) supplies the data
//! model, instrument types, and shared plumbing it builds on.

/// [`error::EngineError`] and the per-category error enums used across the broker/engine.
pub mod error;

/// [`indicator::Indicator`]: a derived [`cerebro_data::line::LineSeries`], minperiod propagation,
/// and a handful of built-in technical indicators built on [`cerebro_data::line::LineOp`].
pub mod indicator;

/// [`order::Order`], its type/status state machines.
pub mod order;

/// [`position::Position`]: per-instrument size/VWAP-price ledger.
pub mod position;

/// [`trade::Trade`]: the round-trip lifecycle ledger derived from position crossings.
pub mod trade;

/// [`sizer::Sizer`] and its built-in implementations.
pub mod sizer;

/// The simulated broker: order matching, commission, slippage, and fill-driven position/trade
/// updates.
pub mod broker;

/// [`strategy::Strategy`]: the indicator subtype that issues orders and observes fills.
pub mod strategy;

/// [`engine::Engine`] (Cerebro): owns datas/strategies/broker/timers and runs the synchronization
/// loop in either vectorized or event-driven mode.
pub mod engine;

/// Default "std" observers/analyzers: [`statistics::TradingSummary`] and friends.
pub mod statistics;

/// [`writer::Writer`]: the persisted-state contract for optional CSV-style logging.
pub mod writer;

/// A pure-function batch runner for running one strategy/parameter combination and collecting
/// its outcome.
pub mod backtest;

pub use engine::Engine;
pub use error::EngineError;
pub use order::{Order, OrderStatus, OrderType};
pub use position::Position;
pub use strategy::Strategy;
pub use trade::Trade;

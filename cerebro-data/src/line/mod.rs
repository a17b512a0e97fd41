/// [`LineBuffer`](buffer::LineBuffer) and its [`Mode`](buffer::Mode) memory policy.
pub mod buffer;
/// The lazy arithmetic operator algebra ([`ops::LineOp`]) shared by `next()` and `once()`.
pub mod ops;
/// [`LineSeries`](series::LineSeries): an ordered, named group of lines sharing one pointer.
pub mod series;

pub use buffer::{LineBuffer, Mode};
pub use ops::{CmpOp, LineOp};
pub use series::LineSeries;

/// The seven lines every [`crate::feed::DataFeed`] exposes, in the order `cerebro`'s `Bar`
/// conversion expects.
pub const OHLCV_LINE_NAMES: [&str; 7] = [
    "datetime",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "openinterest",
];

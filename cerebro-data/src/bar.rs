use cerebro_integration::datetime::NumericDate;
use serde::{Deserialize, Serialize};

/// A single OHLCV record for a timeframe.
///
/// `open` is `NaN` for a bar that has not yet had its first tick delivered (a synthetic bar
/// opened by the [`crate::resample`] state machine before the first constituent arrives);
/// [`Bar::isopen`] tests exactly that.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub datetime: NumericDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub openinterest: f64,
}

impl Bar {
    /// Construct a new, fully specified [`Bar`].
    pub fn new(
        datetime: NumericDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        openinterest: f64,
    ) -> Self {
        Self {
            datetime,
            open,
            high,
            low,
            close,
            volume,
            openinterest,
        }
    }

    /// A `Bar` with every OHLC field `NaN`, zero volume/open-interest, at the given timestamp.
    ///
    /// Used by the resampler/replayer to "open" a new aggregation bucket before its first
    /// constituent bar arrives.
    pub fn empty_at(datetime: NumericDate) -> Self {
        Self {
            datetime,
            open: f64::NAN,
            high: f64::NAN,
            low: f64::NAN,
            close: f64::NAN,
            volume: 0.0,
            openinterest: 0.0,
        }
    }

    /// `true` if this bar has received at least one constituent tick.
    pub fn isopen(&self) -> bool {
        !self.open.is_nan()
    }

    /// Combine `self` with a later constituent `other`:
    /// high=max, low=min, close=latest, volume+=, openinterest=latest, datetime=latest.
    ///
    /// If `self` is not yet open (no constituents received), `other` effectively replaces it
    /// except that `open` is seeded from `other.open` (the first tick's open is the bucket's
    /// open).
    pub fn update(&mut self, other: &Bar) {
        if !self.isopen() {
            self.open = other.open;
            self.high = other.high;
            self.low = other.low;
        } else {
            self.high = self.high.max(other.high);
            self.low = self.low.min(other.low);
        }
        self.close = other.close;
        self.volume += other.volume;
        self.openinterest = other.openinterest;
        self.datetime = other.datetime;
    }
}

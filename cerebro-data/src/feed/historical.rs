use crate::bar::Bar;
use crate::error::DataError;
use crate::feed::{new_ohlcv_series, write_bar, DataFeed, LoadResult};
use crate::line::{LineSeries, Mode};
use cerebro_instrument::Market;
use tracing::trace;

/// A [`DataFeed`] over a pre-loaded, in-memory run of bars — the feed implementation a backtest
/// always terminates on, whether bars were read from CSV, generated, or are the output of a
/// [`crate::resample::Resampler`].
#[derive(Debug)]
pub struct HistoricalFeed {
    lines: LineSeries,
    market: Market,
    source: Vec<Bar>,
    cursor: usize,
    timeframe_minutes: u32,
    latedata_policy: LateDataPolicy,
}

/// What to do when the next source bar's `datetime` does not strictly increase.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum LateDataPolicy {
    /// Drop the offending bar and continue (quietly tolerate a feed with duplicate timestamps).
    #[default]
    Skip,
    /// Fail the feed with [`DataError::LateBar`].
    Reject,
}

impl HistoricalFeed {
    pub fn new(market: Market, source: Vec<Bar>, timeframe_minutes: u32) -> Self {
        Self {
            lines: new_ohlcv_series(Mode::Full, 1),
            market,
            source,
            cursor: 0,
            timeframe_minutes,
            latedata_policy: LateDataPolicy::default(),
        }
    }

    pub fn with_latedata_policy(mut self, policy: LateDataPolicy) -> Self {
        self.latedata_policy = policy;
        self
    }

    fn last_datetime(&self) -> Option<f64> {
        let dt = self.lines.by_name("datetime")?;
        (!dt.is_empty()).then(|| dt.get(0))
    }
}

impl DataFeed for HistoricalFeed {
    fn lines(&self) -> &LineSeries {
        &self.lines
    }

    fn lines_mut(&mut self) -> &mut LineSeries {
        &mut self.lines
    }

    fn market(&self) -> &Market {
        &self.market
    }

    fn load(&mut self) -> Result<LoadResult, DataError> {
        loop {
            let Some(bar) = self.source.get(self.cursor).copied() else {
                return Ok(LoadResult::End);
            };

            if let Some(previous) = self.last_datetime() {
                if bar.datetime <= previous {
                    match self.latedata_policy {
                        LateDataPolicy::Skip => {
                            trace!(previous, next = bar.datetime, "dropping late bar");
                            self.cursor += 1;
                            continue;
                        }
                        LateDataPolicy::Reject => {
                            return Err(DataError::LateBar {
                                previous,
                                next: bar.datetime,
                            })
                        }
                    }
                }
            }

            self.cursor += 1;
            self.lines.forward(1);
            write_bar(&mut self.lines, 0, &bar);
            return Ok(LoadResult::Bar);
        }
    }

    fn timeframe_minutes(&self) -> u32 {
        self.timeframe_minutes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(dt: f64, close: f64) -> Bar {
        Bar::new(dt, close, close, close, close, 1.0, 0.0)
    }

    fn market() -> Market {
        Market::new("SIM", "TEST")
    }

    #[test]
    fn loads_bars_in_order_until_exhausted() {
        let mut feed = HistoricalFeed::new(market(), vec![bar(1.0, 10.0), bar(2.0, 11.0)], 1);

        assert_eq!(feed.load().unwrap(), LoadResult::Bar);
        assert_eq!(feed.close(0), 10.0);
        assert_eq!(feed.load().unwrap(), LoadResult::Bar);
        assert_eq!(feed.close(0), 11.0);
        assert_eq!(feed.close(1), 10.0);
        assert_eq!(feed.load().unwrap(), LoadResult::End);
    }

    #[test]
    fn skip_policy_drops_non_increasing_bars() {
        let mut feed =
            HistoricalFeed::new(market(), vec![bar(1.0, 10.0), bar(1.0, 99.0), bar(2.0, 11.0)], 1);

        feed.load().unwrap();
        assert_eq!(feed.load().unwrap(), LoadResult::Bar);
        assert_eq!(feed.close(0), 11.0, "duplicate-timestamp bar was skipped");
    }

    #[test]
    fn reject_policy_errors_on_non_increasing_bars() {
        let mut feed = HistoricalFeed::new(market(), vec![bar(1.0, 10.0), bar(1.0, 99.0)], 1)
            .with_latedata_policy(LateDataPolicy::Reject);

        feed.load().unwrap();
        assert!(matches!(feed.load(), Err(DataError::LateBar { .. })));
    }
}

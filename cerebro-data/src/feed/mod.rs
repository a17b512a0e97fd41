use crate::bar::Bar;
use crate::error::DataError;
use crate::line::{LineSeries, Mode, OHLCV_LINE_NAMES};
use cerebro_instrument::Market;
use cerebro_integration::datetime::NumericDate;

/// A historical-replay implementation of [`DataFeed`].
pub mod historical;
/// A pull-based live-feed implementation of [`DataFeed`], fed by a background
/// producer thread over a channel.
pub mod live;
/// [`clone::DataClone`]: a read-only weak observer of another feed's line series.
pub mod clone;

/// The outcome of one [`DataFeed::load`] call.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum LoadResult {
    /// A new bar was appended; the feed's pointer has moved forward by one.
    Bar,
    /// No new bar is available yet (a live feed with nothing queued); the caller should retry
    /// later without advancing. Never produced by a historical feed.
    NoneNow,
    /// The feed is exhausted; no further bars will ever be produced.
    End,
}

/// A producer of time-ordered [`Bar`]s, exposed as a [`LineSeries`] of the seven standard OHLCV
/// lines.
///
/// `load` is the single method the [`crate::resample`] chain and `cerebro`'s engine drive: each
/// call either appends exactly one bar to the feed's lines and returns [`LoadResult::Bar`], or
/// reports that none is available ([`LoadResult::NoneNow`]) or that the feed is finished
/// ([`LoadResult::End`]).
pub trait DataFeed {
    fn lines(&self) -> &LineSeries;
    fn lines_mut(&mut self) -> &mut LineSeries;

    /// The instrument this feed carries bars for (the `data-ref` an `Order` points back to).
    fn market(&self) -> &Market;

    /// Pull the next bar (or report there is none yet / no more).
    fn load(&mut self) -> Result<LoadResult, DataError>;

    /// The feed's declared timeframe compression, in minutes;
    /// `0` for tick/irregular feeds.
    fn timeframe_minutes(&self) -> u32;

    /// `true` for a feed backed by a live producer; the engine disables
    /// preload/vectorized modes whenever any registered feed reports `true`. Historical feeds
    /// use the default.
    fn islive(&self) -> bool {
        false
    }

    /// Loop [`DataFeed::load`] until [`LoadResult::End`], then [`DataFeed::home`]. Only
    /// meaningful for a feed that never returns [`LoadResult::NoneNow`] (historical feeds); a
    /// live feed should not be preloaded.
    fn preload(&mut self) -> Result<(), DataError> {
        loop {
            match self.load()? {
                LoadResult::Bar => continue,
                LoadResult::NoneNow => continue,
                LoadResult::End => break,
            }
        }
        self.home();
        Ok(())
    }

    /// Reset the pointer to before the first bar.
    fn home(&mut self) {
        self.lines_mut().home();
    }

    /// Move the pointer forward by `n` without allocating.
    fn advance(&mut self, n: usize) {
        self.lines_mut().advance(n);
    }

    /// Move the pointer back by `n` without deallocating.
    fn rewind(&mut self, n: usize) {
        self.lines_mut().rewind(n);
    }

    fn datetime(&self, ago: i64) -> NumericDate {
        self.lines().by_name("datetime").map(|l| l.get(ago)).unwrap_or(f64::NAN)
    }

    fn close(&self, ago: i64) -> f64 {
        self.lines().by_name("close").map(|l| l.get(ago)).unwrap_or(f64::NAN)
    }

    /// Read the bar `ago` steps behind the feed's current pointer.
    fn bar(&self, ago: i64) -> Bar {
        let lines = self.lines();
        let at = |name: &str| lines.by_name(name).map(|l| l.get(ago)).unwrap_or(f64::NAN);
        Bar::new(
            at("datetime"),
            at("open"),
            at("high"),
            at("low"),
            at("close"),
            at("volume"),
            at("openinterest"),
        )
    }

    /// Append `bar` to the feed's lines by forwarding the pointer and writing each standard line
    /// (the common tail every [`DataFeed::load`] implementation calls once it has a `Bar` in
    /// hand).
    fn push_bar(&mut self, bar: Bar) {
        self.lines_mut().forward(1);
        let lines = self.lines_mut();
        write_bar(lines, 0, &bar);
    }
}

/// Construct a fresh standard-OHLCV [`LineSeries`].
pub fn new_ohlcv_series(mode: Mode, minperiod: usize) -> LineSeries {
    LineSeries::new(&OHLCV_LINE_NAMES, mode, minperiod)
}

pub(crate) fn write_bar(lines: &mut LineSeries, ago: i64, bar: &Bar) {
    if let Some(line) = lines.by_name_mut("datetime") {
        line.set(ago, bar.datetime);
    }
    if let Some(line) = lines.by_name_mut("open") {
        line.set(ago, bar.open);
    }
    if let Some(line) = lines.by_name_mut("high") {
        line.set(ago, bar.high);
    }
    if let Some(line) = lines.by_name_mut("low") {
        line.set(ago, bar.low);
    }
    if let Some(line) = lines.by_name_mut("close") {
        line.set(ago, bar.close);
    }
    if let Some(line) = lines.by_name_mut("volume") {
        line.set(ago, bar.volume);
    }
    if let Some(line) = lines.by_name_mut("openinterest") {
        line.set(ago, bar.openinterest);
    }
}

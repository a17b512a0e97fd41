use crate::line::LineSeries;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// The line storage shared between a primary [`crate::feed::DataFeed`] and any
/// [`DataClone`]s observing it.
#[derive(Debug)]
pub struct DataFeedCore {
    lines: LineSeries,
    timeframe_minutes: u32,
}

impl DataFeedCore {
    pub fn new(lines: LineSeries, timeframe_minutes: u32) -> Self {
        Self {
            lines,
            timeframe_minutes,
        }
    }

    pub fn lines(&self) -> &LineSeries {
        &self.lines
    }

    pub fn lines_mut(&mut self) -> &mut LineSeries {
        &mut self.lines
    }

    pub fn timeframe_minutes(&self) -> u32 {
        self.timeframe_minutes
    }
}

/// A read-only observer of another feed's [`DataFeedCore`], held by [`Weak`] reference so it
/// never keeps the underlying feed alive — used when an indicator or a secondary resampled
/// timeframe needs to read a feed it does not own and must not keep alive.
///
/// Once the primary feed is dropped, every [`DataClone`] observing it silently starts reporting
/// `None`/`NaN` rather than panicking; callers that need to detect this should poll
/// [`DataClone::is_alive`].
#[derive(Debug, Clone)]
pub struct DataClone {
    source: Weak<RefCell<DataFeedCore>>,
}

impl DataClone {
    pub fn new(source: &Rc<RefCell<DataFeedCore>>) -> Self {
        Self {
            source: Rc::downgrade(source),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.source.strong_count() > 0
    }

    /// Read a named line `ago` steps behind the source feed's pointer, or `NaN` if the source
    /// has been dropped or has no such line.
    pub fn get(&self, name: &str, ago: i64) -> f64 {
        self.source
            .upgrade()
            .and_then(|core| core.borrow().lines().by_name(name).map(|l| l.get(ago)))
            .unwrap_or(f64::NAN)
    }

    pub fn timeframe_minutes(&self) -> Option<u32> {
        self.source.upgrade().map(|core| core.borrow().timeframe_minutes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::Mode;

    #[test]
    fn clone_reads_through_to_live_source() {
        let mut lines = LineSeries::new(&["close"], Mode::Full, 1);
        lines.forward(1);
        lines.line_mut(0).set(0, 42.0);
        let core = Rc::new(RefCell::new(DataFeedCore::new(lines, 1)));
        let clone = DataClone::new(&core);

        assert!(clone.is_alive());
        assert_eq!(clone.get("close", 0), 42.0);
    }

    #[test]
    fn clone_goes_dark_once_source_is_dropped() {
        let lines = LineSeries::new(&["close"], Mode::Full, 1);
        let core = Rc::new(RefCell::new(DataFeedCore::new(lines, 1)));
        let clone = DataClone::new(&core);

        drop(core);
        assert!(!clone.is_alive());
        assert!(clone.get("close", 0).is_nan());
    }
}

use crate::calendar::TradingCalendar;
use cerebro_integration::datetime::{self, NumericDate};
use chrono::NaiveTime;

/// When a [`Timer`]'s fire time is anchored.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Anchor {
    /// Fire `offset` after the session open.
    SessionStart,
    /// Fire `offset` before the session close.
    SessionEnd,
    /// Fire at a fixed time of day, independent of the session.
    Absolute(NaiveTime),
}

/// Which calendar list a [`Timer`] is registered on.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TimerQueue {
    /// Fires before broker order matching.
    Cheat,
    /// Fires after broker order matching.
    Normal,
}

/// A scheduled callback bound to the trading calendar.
///
/// `monthdays`/`weekdays`, when non-empty, restrict firing to calendar days matching one of the
/// given values; `carryover` causes a timer whose target day is not a
/// trading day to fire on the next trading day instead of being skipped.
#[derive(Debug, Clone)]
pub struct Timer {
    anchor: Anchor,
    queue: TimerQueue,
    repeat: bool,
    weekdays: Vec<chrono::Weekday>,
    monthdays: Vec<u32>,
    carryover: bool,
    last_fired_day: Option<chrono::NaiveDate>,
}

impl Timer {
    pub fn new(anchor: Anchor, queue: TimerQueue) -> Self {
        Self {
            anchor,
            queue,
            repeat: false,
            weekdays: Vec::new(),
            monthdays: Vec::new(),
            carryover: false,
            last_fired_day: None,
        }
    }

    pub fn repeating(mut self, repeat: bool) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn on_weekdays(mut self, weekdays: impl IntoIterator<Item = chrono::Weekday>) -> Self {
        self.weekdays = weekdays.into_iter().collect();
        self
    }

    pub fn on_monthdays(mut self, monthdays: impl IntoIterator<Item = u32>) -> Self {
        self.monthdays = monthdays.into_iter().collect();
        self
    }

    pub fn with_carryover(mut self, carryover: bool) -> Self {
        self.carryover = carryover;
        self
    }

    pub fn queue(&self) -> TimerQueue {
        self.queue
    }

    fn day_mask_matches(&self, day: chrono::NaiveDate) -> bool {
        use chrono::Datelike;
        if !self.weekdays.is_empty() && !self.weekdays.contains(&day.weekday()) {
            return false;
        }
        if !self.monthdays.is_empty() && !self.monthdays.contains(&day.day()) {
            return false;
        }
        true
    }

    /// `true` if this timer should fire for the session containing `dt`, given `calendar`.
    ///
    /// With `carryover`, a monthday timer whose exact target day is not a trading day fires on
    /// the first trading day at-or-after it instead, exactly once per period.
    pub fn should_fire(&self, dt: NumericDate, calendar: &dyn TradingCalendar) -> bool {
        let Some(naive) = datetime::decode(dt) else {
            return false;
        };
        let day = naive.date();

        if !self.repeat && self.last_fired_day.is_some() {
            return false;
        }
        if self.last_fired_day == Some(day) {
            return false;
        }
        if !calendar.is_session_day(dt) {
            return false;
        }

        if self.monthdays.is_empty() {
            return self.weekdays.is_empty() || self.day_mask_matches(day);
        }

        if self.day_mask_matches(day) {
            return true;
        }

        if self.carryover {
            return self.is_first_trading_day_after_target(day, calendar);
        }

        false
    }

    fn is_first_trading_day_after_target(
        &self,
        day: chrono::NaiveDate,
        calendar: &dyn TradingCalendar,
    ) -> bool {
        use chrono::Datelike;
        let Some(target_date) = self
            .monthdays
            .iter()
            .copied()
            .filter_map(|md| chrono::NaiveDate::from_ymd_opt(day.year(), day.month(), md))
            .find(|target| *target < day)
        else {
            return false;
        };

        let mut probe = target_date;
        while probe < day {
            if self.is_session_day_at_noon(probe, calendar) {
                return false;
            }
            probe = probe.succ_opt().expect("date arithmetic in range");
        }
        true
    }

    fn is_session_day_at_noon(&self, day: chrono::NaiveDate, calendar: &dyn TradingCalendar) -> bool {
        calendar.is_session_day(datetime::encode_naive(
            day.and_hms_opt(12, 0, 0).expect("valid noon time"),
        ))
    }

    /// Record that this timer fired on `dt`'s calendar day, so a non-repeating timer will not
    /// fire again and a repeating one waits for the next distinct day.
    pub fn mark_fired(&mut self, dt: NumericDate) {
        if let Some(naive) = datetime::decode(dt) {
            self.last_fired_day = Some(naive.date());
        }
    }
}

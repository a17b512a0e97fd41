use cerebro_integration::datetime::{self, NumericDate};
use chrono::{Datelike, NaiveDate, NaiveTime};
use std::collections::BTreeSet;

/// The calendar unit a "last day of" query is relative to.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CalendarUnit {
    Week,
    Month,
    Year,
}

/// Maps a date to its trading session bounds and answers calendar-boundary questions used by the
/// [`crate::resample`] state machine (week/month/year-end rollovers) and by [`crate::timer::Timer`]
/// carryover.
pub trait TradingCalendar {
    /// The next trading session strictly at-or-after `dt`, as `(open, close)` numeric datetimes.
    fn next_session(&self, dt: NumericDate) -> (NumericDate, NumericDate);

    /// `true` if `d` is a trading day and no later day in the same `unit` is also a trading day.
    fn is_last_day_of(&self, unit: CalendarUnit, d: NumericDate) -> bool;

    /// `true` if `d` falls on a trading day (open for business at all).
    fn is_session_day(&self, d: NumericDate) -> bool;
}

/// The default [`TradingCalendar`]: every day is a session day except weekends and an explicit
/// holiday set, with a fixed session open/close time of day.
#[derive(Debug, Clone)]
pub struct WeekendCalendar {
    holidays: BTreeSet<NaiveDate>,
    session_open: NaiveTime,
    session_close: NaiveTime,
}

impl WeekendCalendar {
    pub fn new(session_open: NaiveTime, session_close: NaiveTime) -> Self {
        Self {
            holidays: BTreeSet::new(),
            session_open,
            session_close,
        }
    }

    pub fn with_holidays(mut self, holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.holidays.extend(holidays);
        self
    }

    fn is_trading_day(&self, d: NaiveDate) -> bool {
        !matches!(d.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun)
            && !self.holidays.contains(&d)
    }
}

impl TradingCalendar for WeekendCalendar {
    fn next_session(&self, dt: NumericDate) -> (NumericDate, NumericDate) {
        let Some(naive) = datetime::decode(dt) else {
            return (datetime::NONE, datetime::NONE);
        };
        let mut day = naive.date();
        while !self.is_trading_day(day) {
            day = day.succ_opt().expect("date arithmetic in range");
        }
        let open = day.and_time(self.session_open);
        let close = day.and_time(self.session_close);
        (datetime::encode_naive(open), datetime::encode_naive(close))
    }

    fn is_last_day_of(&self, unit: CalendarUnit, d: NumericDate) -> bool {
        let Some(naive) = datetime::decode(d) else {
            return false;
        };
        let day = naive.date();
        if !self.is_trading_day(day) {
            return false;
        }
        let mut probe = day;
        loop {
            let Some(next) = probe.succ_opt() else {
                return true;
            };
            if crosses_boundary(unit, day, next) {
                return true;
            }
            if self.is_trading_day(next) {
                return false;
            }
            probe = next;
        }
    }

    fn is_session_day(&self, d: NumericDate) -> bool {
        datetime::decode(d)
            .map(|naive| self.is_trading_day(naive.date()))
            .unwrap_or(false)
    }
}

fn crosses_boundary(unit: CalendarUnit, from: NaiveDate, to: NaiveDate) -> bool {
    match unit {
        CalendarUnit::Week => to.iso_week() != from.iso_week(),
        CalendarUnit::Month => to.month() != from.month() || to.year() != from.year(),
        CalendarUnit::Year => to.year() != from.year(),
    }
}

/// One trading session's open/close, as used by [`ScheduledCalendar`].
#[derive(Debug, Clone, Copy)]
pub struct Session {
    pub date: NaiveDate,
    pub open: NaiveTime,
    pub close: NaiveTime,
}

/// A [`TradingCalendar`] backed by an explicit, externally supplied list of sessions (e.g. parsed
/// from an exchange calendar feed) rather than a weekend/holiday rule.
#[derive(Debug, Clone)]
pub struct ScheduledCalendar {
    sessions: BTreeSet<NaiveDate>,
    by_date: std::collections::HashMap<NaiveDate, (NaiveTime, NaiveTime)>,
}

impl ScheduledCalendar {
    pub fn new(sessions: impl IntoIterator<Item = Session>) -> Self {
        let mut dates = BTreeSet::new();
        let mut by_date = std::collections::HashMap::new();
        for session in sessions {
            dates.insert(session.date);
            by_date.insert(session.date, (session.open, session.close));
        }
        Self {
            sessions: dates,
            by_date,
        }
    }
}

impl TradingCalendar for ScheduledCalendar {
    fn next_session(&self, dt: NumericDate) -> (NumericDate, NumericDate) {
        let Some(naive) = datetime::decode(dt) else {
            return (datetime::NONE, datetime::NONE);
        };
        let day = naive.date();
        let Some(&next) = self.sessions.range(day..).next() else {
            return (datetime::MAX, datetime::MAX);
        };
        let (open, close) = self.by_date[&next];
        (
            datetime::encode_naive(next.and_time(open)),
            datetime::encode_naive(next.and_time(close)),
        )
    }

    fn is_last_day_of(&self, unit: CalendarUnit, d: NumericDate) -> bool {
        let Some(naive) = datetime::decode(d) else {
            return false;
        };
        let day = naive.date();
        if !self.sessions.contains(&day) {
            return false;
        }
        !self
            .sessions
            .range(day.succ_opt().unwrap_or(day)..)
            .any(|next| !crosses_boundary(unit, day, *next))
    }

    fn is_session_day(&self, d: NumericDate) -> bool {
        datetime::decode(d)
            .map(|naive| self.sessions.contains(&naive.date()))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn dt(y: i32, m: u32, d: u32) -> NumericDate {
        datetime::encode_naive(NaiveDateTime::new(
            NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
        ))
    }

    #[test]
    fn weekend_calendar_skips_saturday_and_sunday() {
        let cal = WeekendCalendar::new(
            NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
        );
        // 2026-01-31 is a Saturday.
        let (open, _) = cal.next_session(dt(2026, 1, 31));
        let opened_on = datetime::decode(open).unwrap().date();
        assert_eq!(opened_on, NaiveDate::from_ymd_opt(2026, 2, 2).unwrap());
    }

    #[test]
    fn last_weekday_of_holiday_week_is_true_when_monday_is_a_holiday() {
        // Friday 2026-01-16 is the last trading day of its week once the following Monday
        // (2026-01-19) is marked a holiday and no earlier Friday mask applies.
        let friday = NaiveDate::from_ymd_opt(2026, 1, 16).unwrap();
        let monday_holiday = NaiveDate::from_ymd_opt(2026, 1, 19).unwrap();
        let cal = WeekendCalendar::new(
            NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
        )
        .with_holidays([monday_holiday]);

        assert!(cal.is_last_day_of(CalendarUnit::Week, dt(2026, 1, 16)));
        let _ = friday;
    }

    #[test]
    fn non_last_weekday_reports_false() {
        let cal = WeekendCalendar::new(
            NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
        );
        assert!(!cal.is_last_day_of(CalendarUnit::Week, dt(2026, 1, 14)));
    }

    #[test]
    fn scheduled_calendar_reports_last_session_of_month() {
        let sessions = [
            Session {
                date: NaiveDate::from_ymd_opt(2026, 1, 29).unwrap(),
                open: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
                close: NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
            },
            Session {
                date: NaiveDate::from_ymd_opt(2026, 1, 30).unwrap(),
                open: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
                close: NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
            },
            Session {
                date: NaiveDate::from_ymd_opt(2026, 2, 2).unwrap(),
                open: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
                close: NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
            },
        ];
        let cal = ScheduledCalendar::new(sessions);
        assert!(cal.is_last_day_of(CalendarUnit::Month, dt(2026, 1, 30)));
        assert!(!cal.is_last_day_of(CalendarUnit::Month, dt(2026, 1, 29)));
    }
}

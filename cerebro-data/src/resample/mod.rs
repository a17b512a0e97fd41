use crate::bar::Bar;
use crate::calendar::{CalendarUnit, TradingCalendar};
use crate::error::DataError;
use cerebro_integration::datetime::NumericDate;

/// An intraday-or-coarser timeframe unit.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TimeFrame {
    Minutes,
    Days,
    Weeks,
    Months,
    Years,
}

/// Target timeframe/compression a [`Resampler`]/[`Replayer`] aggregates into.
#[derive(Debug, Copy, Clone)]
pub struct TargetTimeframe {
    pub unit: TimeFrame,
    pub compression: u32,
}

impl TargetTimeframe {
    pub fn new(unit: TimeFrame, compression: u32) -> Result<Self, DataError> {
        if compression == 0 {
            return Err(DataError::InvalidResamplerConfig {
                reason: "compression must be >= 1".to_string(),
            });
        }
        Ok(Self { unit, compression })
    }
}

/// Boundary-alignment policy shared by [`Resampler`] and [`Replayer`].
#[derive(Debug, Copy, Clone)]
pub struct ResampleConfig {
    pub target: TargetTimeframe,
    /// Close the bar at a timeframe boundary rather than after a fixed input count (default
    /// `true`).
    pub bar2edge: bool,
    /// Timestamp the emitted bar with the boundary end, not the start (default `true`).
    pub rightedge: bool,
    /// Snap the emitted timestamp exactly to the boundary (default `true`).
    pub adjbartime: bool,
}

impl ResampleConfig {
    pub fn new(target: TargetTimeframe) -> Self {
        Self {
            target,
            bar2edge: true,
            rightedge: true,
            adjbartime: true,
        }
    }
}

/// What to do with an input bar older than the last one already folded into the current bucket.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum LateInputPolicy {
    #[default]
    Discard,
    /// Tag it in by emitting immediately with the bumped (current) timestamp.
    EmitWithBumpedTimestamp,
}

/// Internal aggregation state shared by [`Resampler`] and [`Replayer`].
#[derive(Debug, Clone)]
struct BucketState {
    bar: Option<Bar>,
    compcount: u32,
    next_eos: NumericDate,
}

impl BucketState {
    fn new() -> Self {
        Self {
            bar: None,
            compcount: 0,
            next_eos: f64::INFINITY,
        }
    }
}

fn intraday_onedge(minute_of_boundary_unit: i64, compression: u32) -> bool {
    minute_of_boundary_unit % compression as i64 == 0
}

/// Is `dt` exactly at a `target` boundary?
fn dataonedge(dt: NumericDate, target: TargetTimeframe, calendar: &dyn TradingCalendar) -> bool {
    match target.unit {
        TimeFrame::Minutes => {
            let minutes_since_midnight = ((dt.fract() * 24.0 * 60.0).round()) as i64;
            intraday_onedge(minutes_since_midnight, target.compression)
        }
        TimeFrame::Days => true,
        TimeFrame::Weeks => calendar.is_last_day_of(CalendarUnit::Week, dt),
        TimeFrame::Months => calendar.is_last_day_of(CalendarUnit::Month, dt),
        TimeFrame::Years => calendar.is_last_day_of(CalendarUnit::Year, dt),
    }
}

/// Has a boundary been crossed between the bucket's open and this new input, even though the
/// input itself does not land exactly on the boundary?
fn barover(
    bucket_open: NumericDate,
    input: NumericDate,
    target: TargetTimeframe,
    calendar: &dyn TradingCalendar,
) -> bool {
    match target.unit {
        TimeFrame::Minutes => {
            let bucket_minute = (bucket_open.fract() * 24.0 * 60.0).floor() as i64;
            let input_minute = (input.fract() * 24.0 * 60.0).floor() as i64;
            let bucket_day = bucket_open.floor() as i64;
            let input_day = input.floor() as i64;
            if input_day != bucket_day {
                return true;
            }
            bucket_minute / target.compression as i64 != input_minute / target.compression as i64
        }
        TimeFrame::Days => bucket_open.floor() as i64 != input.floor() as i64,
        TimeFrame::Weeks => {
            calendar.is_last_day_of(CalendarUnit::Week, bucket_open) && input > bucket_open
        }
        TimeFrame::Months => {
            calendar.is_last_day_of(CalendarUnit::Month, bucket_open) && input > bucket_open
        }
        TimeFrame::Years => {
            calendar.is_last_day_of(CalendarUnit::Year, bucket_open) && input > bucket_open
        }
    }
}

fn boundary_end(dt: NumericDate, target: TargetTimeframe) -> NumericDate {
    match target.unit {
        TimeFrame::Minutes => {
            // Integer minute-of-day arithmetic, not a float division by the boundary width —
            // the latter rounds an already-exact edge up by a whole extra minute often enough
            // that two emitted bars can end up sharing a datetime.
            let day = dt.floor();
            let minute_of_day = ((dt - day) * 1440.0).round() as i64;
            let compression = target.compression as i64;
            let edge_minute = ((minute_of_day + compression - 1) / compression) * compression;
            day + edge_minute as f64 / 1440.0
        }
        _ => dt,
    }
}

/// Consumes input bars one at a time and emits aggregated bars at the target timeframe, only once
/// the boundary closes.
///
/// Pushes the completed bucket and reopens on the triggering input; unlike [`Replayer`] it never
/// rewrites an already-emitted bar.
#[derive(Debug, Clone)]
pub struct Resampler {
    config: ResampleConfig,
    state: BucketState,
    latedata_policy: LateInputPolicy,
}

impl Resampler {
    pub fn new(config: ResampleConfig) -> Self {
        Self {
            config,
            state: BucketState::new(),
            latedata_policy: LateInputPolicy::default(),
        }
    }

    pub fn with_latedata_policy(mut self, policy: LateInputPolicy) -> Self {
        self.latedata_policy = policy;
        self
    }

    /// Fold `input` into the current bucket, returning any bars that closed as a result.
    ///
    /// At most one bar is produced by a single call: the previous bucket closing when `input`
    /// lands on (or past) the next boundary. `input` itself is always folded into the bucket that
    /// follows, never discarded.
    pub fn update(&mut self, input: Bar, calendar: &dyn TradingCalendar) -> Vec<Bar> {
        let input = if let Some(current) = &self.state.bar {
            if input.datetime <= current.datetime {
                match self.latedata_policy {
                    LateInputPolicy::Discard => return Vec::new(),
                    LateInputPolicy::EmitWithBumpedTimestamp => {
                        let mut bumped = input;
                        bumped.datetime = current.datetime;
                        bumped
                    }
                }
            } else {
                input
            }
        } else {
            input
        };

        self.fold(input, calendar).into_iter().collect()
    }

    fn fold(&mut self, input: Bar, calendar: &dyn TradingCalendar) -> Option<Bar> {
        let should_close = match &self.state.bar {
            None => false,
            Some(current) => {
                let onedge = dataonedge(input.datetime, self.config.target, calendar);
                let crossed = self.config.bar2edge
                    && barover(current.datetime, input.datetime, self.config.target, calendar);
                onedge || crossed || input.datetime >= self.state.next_eos
            }
        };

        let emitted = if should_close {
            let closed = self.state.bar.take().map(|mut closed| {
                self.stamp(&mut closed);
                closed
            });
            self.state.compcount = 0;
            closed
        } else {
            None
        };

        let bucket = self.state.bar.get_or_insert_with(|| Bar::empty_at(input.datetime));
        bucket.update(&input);
        self.state.compcount += 1;

        emitted
    }

    fn stamp(&self, bar: &mut Bar) {
        if self.config.adjbartime {
            bar.datetime = if self.config.rightedge {
                boundary_end(bar.datetime, self.config.target)
            } else {
                bar.datetime
            };
        }
    }

    /// Force-close the in-progress bucket even
    /// if `compcount` has not reached the target compression.
    pub fn force_close(&mut self) -> Option<Bar> {
        let mut closed = self.state.bar.take()?;
        self.stamp(&mut closed);
        self.state.compcount = 0;
        Some(closed)
    }

    /// Wall-clock-driven close for a live feed with no new ticks.
    pub fn check(&mut self, force: bool) -> Option<Bar> {
        if force {
            self.force_close()
        } else {
            None
        }
    }

    /// Record the session close time the in-progress bucket must not outlive.
    pub fn set_next_eos(&mut self, eos: NumericDate) {
        self.state.next_eos = eos;
    }
}

/// Consumes input bars and continuously rewrites the in-progress bar until a boundary closes it
///; the emitted-bar pointer never advances until
/// the boundary, so downstream consumers see the partially-formed bar evolve tick by tick.
#[derive(Debug, Clone)]
pub struct Replayer {
    config: ResampleConfig,
    state: BucketState,
}

/// The outcome of one [`Replayer::update`] call.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ReplayOutcome {
    /// The in-progress bar was rewritten in place; the pointer does not advance.
    Updated,
    /// A boundary closed the previous bar and a new one was opened; the pointer advances.
    Closed,
}

impl Replayer {
    pub fn new(config: ResampleConfig) -> Self {
        Self {
            config,
            state: BucketState::new(),
        }
    }

    /// Fold `input` into the current bar, reporting whether the pointer should advance.
    pub fn update(&mut self, input: Bar, calendar: &dyn TradingCalendar) -> (Bar, ReplayOutcome) {
        let should_close = match &self.state.bar {
            None => false,
            Some(current) => {
                let onedge = dataonedge(input.datetime, self.config.target, calendar);
                let crossed = self.config.bar2edge
                    && barover(current.datetime, input.datetime, self.config.target, calendar);
                onedge || crossed
            }
        };

        let outcome = if should_close {
            self.state.bar = None;
            self.state.compcount = 0;
            ReplayOutcome::Closed
        } else if self.state.bar.is_none() {
            ReplayOutcome::Closed
        } else {
            ReplayOutcome::Updated
        };

        let bucket = self.state.bar.get_or_insert_with(|| Bar::empty_at(input.datetime));
        bucket.update(&input);
        self.state.compcount += 1;
        let mut current = *bucket;
        self.stamp(&mut current);

        (current, outcome)
    }

    fn stamp(&self, bar: &mut Bar) {
        if self.config.adjbartime && self.config.rightedge {
            bar.datetime = boundary_end(bar.datetime, self.config.target);
        }
    }
}

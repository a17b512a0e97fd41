use crate::broker::{Notification, SimulatedBroker};
use crate::error::EngineError;
use crate::statistics::Analyzer;
use crate::strategy::{Strategy, StrategyContext};
use crate::writer::Writer;
use cerebro_data::calendar::TradingCalendar;
use cerebro_data::timer::{Timer, TimerQueue};
use cerebro_data::{DataFeed, LoadResult};
use cerebro_instrument::Market;
use cerebro_integration::datetime::NumericDate;
use cerebro_integration::sequence::Sequence;
use cerebro_integration::validator::Validator;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Run-wide knobs.
///
/// Every field defaults to the conservative, always-correct choice, and callers opt into the
/// cheaper vectorized path explicitly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Preload every feed fully before running (required for `runonce`).
    pub preload: bool,
    /// Compute every indicator/strategy signal vectorized over the whole preloaded range rather
    /// than bar-by-bar. Silently falls back to the event-driven path if any registered feed is
    /// live, or if `preload` is `false`.
    pub runonce: bool,
    /// Force event-driven mode even when every feed is historical.
    pub live: bool,
    /// Memory-management mode for preloaded line buffers: `0` keeps everything (`Mode::Full`),
    /// `1`/`-1`/`-2` select progressively tighter bounded/ring-buffer retention. Only `0` is
    /// implemented by the line-buffer backing today; anything else is a configuration error.
    pub exactbars: i8,
    /// Attach the default `BrokerObserver`/`TradesObserver` analyzers automatically.
    pub stdstats: bool,
    /// Match Market orders against the *current* bar's open instead of the next bar's.
    pub cheat_on_open: bool,
    /// Keep every closed [`crate::trade::Trade`] rather than discarding them once reported.
    pub tradehistory: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            preload: true,
            runonce: true,
            live: false,
            exactbars: 0,
            stdstats: true,
            cheat_on_open: false,
            tradehistory: true,
        }
    }
}

impl Validator for EngineConfig {
    type Error = EngineError;

    fn validate(self) -> Result<Self, Self::Error> {
        if !matches!(self.exactbars, 0 | 1 | -1 | -2) {
            return Err(EngineError::Parameter {
                reason: format!("exactbars must be one of 0, 1, -1, -2, got {}", self.exactbars),
            });
        }
        if self.exactbars != 0 {
            return Err(EngineError::Parameter {
                reason: "exactbars memory-saving modes are not implemented by this line buffer backing".into(),
            });
        }
        if self.runonce && !self.preload {
            return Err(EngineError::Parameter {
                reason: "runonce requires preload".into(),
            });
        }
        Ok(self)
    }
}

/// Owns every registered feed/strategy plus the simulated broker, and runs the synchronization
/// loop in either vectorized or event-driven mode.
pub struct Engine {
    config: EngineConfig,
    datas: Vec<Box<dyn DataFeed>>,
    strategies: Vec<(Sequence, Box<dyn Strategy>)>,
    broker: SimulatedBroker,
    calendar: Box<dyn TradingCalendar>,
    cheat_timers: Vec<Timer>,
    normal_timers: Vec<Timer>,
    analyzers: Vec<Box<dyn Analyzer>>,
    writer: Option<Box<dyn Writer>>,
    stop_flag: Arc<AtomicBool>,
    next_strategy_id: Sequence,
    default_valid_until: NumericDate,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("datas", &self.datas.len())
            .field("strategies", &self.strategies.len())
            .field("broker", &self.broker)
            .finish()
    }
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        broker: SimulatedBroker,
        calendar: Box<dyn TradingCalendar>,
    ) -> Result<Self, EngineError> {
        let config = config.validate()?;
        Ok(Self {
            config,
            datas: Vec::new(),
            strategies: Vec::new(),
            broker,
            calendar,
            cheat_timers: Vec::new(),
            normal_timers: Vec::new(),
            analyzers: Vec::new(),
            writer: None,
            stop_flag: Arc::new(AtomicBool::new(false)),
            next_strategy_id: Sequence::new(),
            default_valid_until: cerebro_integration::datetime::MAX,
        })
    }

    /// The first-registered feed is the one gating `minperiod` and priming order-target pricing.
    pub fn add_data(&mut self, feed: Box<dyn DataFeed>) {
        self.datas.push(feed);
    }

    /// Register a strategy, returning the [`Sequence`] id the engine will tag its orders with.
    pub fn add_strategy(&mut self, strategy: Box<dyn Strategy>) -> Sequence {
        let id = self.next_strategy_id.fetch_add();
        self.strategies.push((id, strategy));
        id
    }

    pub fn add_timer(&mut self, timer: Timer) {
        match timer.queue() {
            TimerQueue::Cheat => self.cheat_timers.push(timer),
            TimerQueue::Normal => self.normal_timers.push(timer),
        }
    }

    pub fn add_analyzer(&mut self, analyzer: Box<dyn Analyzer>) {
        self.analyzers.push(analyzer);
    }

    pub fn set_writer(&mut self, writer: Box<dyn Writer>) {
        self.writer = Some(writer);
    }

    /// A cloneable handle another thread can use to request the run stop at the next tick
    /// boundary.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop_flag.clone()
    }

    pub fn runstop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }

    pub fn broker(&self) -> &SimulatedBroker {
        &self.broker
    }

    pub fn analyzers(&self) -> &[Box<dyn Analyzer>] {
        &self.analyzers
    }

    fn uses_vectorized_mode(&self) -> bool {
        self.config.preload
            && self.config.runonce
            && !self.config.live
            && self.datas.iter().all(|d| !d.islive())
    }

    pub fn run(&mut self) -> Result<(), EngineError> {
        if self.datas.is_empty() {
            return Err(EngineError::Parameter {
                reason: "no data feeds registered".into(),
            });
        }

        if self.uses_vectorized_mode() {
            self.run_vectorized()
        } else {
            self.run_event_driven()
        }
    }

    fn run_vectorized(&mut self) -> Result<(), EngineError> {
        let Engine {
            config,
            datas,
            strategies,
            broker,
            calendar,
            cheat_timers,
            normal_timers,
            analyzers,
            writer,
            stop_flag,
            default_valid_until,
            ..
        } = self;

        for feed in datas.iter_mut() {
            feed.preload()?;
        }

        // Preload pass: mirror every bar of every feed into each strategy's own lines before
        // computing anything.
        for feed in datas.iter_mut() {
            let buflen = feed.lines().buflen();
            feed.home();
            for _ in 0..buflen {
                feed.advance(1);
                let bar = feed.bar(0);
                let market = feed.market().clone();
                for (_, strategy) in strategies.iter_mut() {
                    strategy.preload_mirror(&market, &bar);
                }
            }
            feed.home();
        }

        let end = datas.iter().map(|d| d.lines().buflen()).max().unwrap_or(0) as i64;
        for (_, strategy) in strategies.iter_mut() {
            strategy.compute_once(0, end);
            strategy.rehome();
        }

        let ticks = end as usize;
        for tick in 0..ticks {
            if stop_flag.load(Ordering::SeqCst) {
                break;
            }

            for feed in datas.iter_mut() {
                if (feed.lines().len() as i64) < end {
                    feed.advance(1);
                }
            }
            for (_, strategy) in strategies.iter_mut() {
                strategy.advance_tick();
            }

            let now = datas[0].datetime(0);
            fire_timers(cheat_timers, now, calendar.as_ref(), strategies);

            if config.cheat_on_open {
                dispatch_next_open(strategies, broker, datas, now, *default_valid_until);
            }

            for feed in datas.iter_mut() {
                let bar = feed.bar(0);
                broker.next(feed.market(), &bar, now);
            }

            drain_notifications(broker, strategies, analyzers);

            let primary_len = tick + 1;
            dispatch_next(strategies, broker, datas, now, *default_valid_until, primary_len);

            fire_timers(normal_timers, now, calendar.as_ref(), strategies);
            record_analyzers(analyzers, broker, datas);
            record_row(writer, now, datas);

            trace!(tick, ticks, "vectorized tick complete");
        }

        // Flush any order submitted by the last `next()` against the final bar.
        for feed in datas.iter() {
            let bar = feed.bar(0);
            let now = feed.datetime(0);
            broker.next(feed.market(), &bar, now);
        }
        drain_notifications(broker, strategies, analyzers);

        if let Some(writer) = writer.as_deref_mut() {
            writer.flush();
        }

        Ok(())
    }

    fn run_event_driven(&mut self) -> Result<(), EngineError> {
        let Engine {
            config,
            datas,
            strategies,
            broker,
            calendar,
            cheat_timers,
            normal_timers,
            analyzers,
            writer,
            stop_flag,
            default_valid_until,
            ..
        } = self;

        loop {
            if stop_flag.load(Ordering::SeqCst) {
                break;
            }

            let mut delivered = vec![false; datas.len()];
            let mut still_running = false;
            for (i, feed) in datas.iter_mut().enumerate() {
                match feed.load()? {
                    LoadResult::Bar => {
                        delivered[i] = true;
                        still_running = true;
                    }
                    LoadResult::NoneNow => {
                        still_running = true;
                    }
                    LoadResult::End => {}
                }
            }
            if !still_running {
                break;
            }

            let dt0 = delivered
                .iter()
                .enumerate()
                .filter(|(_, &d)| d)
                .map(|(i, _)| datas[i].datetime(0))
                .fold(f64::INFINITY, f64::min);

            if !dt0.is_finite() {
                // Nothing delivered this pass (every live feed reported `NoneNow`); give the
                // producer threads another turn.
                continue;
            }

            // Every feed that produced a bar this pass is dispatched together, at `dt0` (the
            // earliest of their timestamps). Feeds do not expose a peek/un-pop operation, so a
            // feed whose bar is timestamped later than `dt0` is delivered now rather than held
            // back for a future tick — exact multi-feed timestamp alignment across differing
            // native timeframes is not attempted (see DESIGN.md).
            for (i, feed) in datas.iter_mut().enumerate() {
                if delivered[i] {
                    let bar = feed.bar(0);
                    let market = feed.market().clone();
                    for (_, strategy) in strategies.iter_mut() {
                        strategy.on_bar(&market, &bar);
                    }
                }
            }

            fire_timers(cheat_timers, dt0, calendar.as_ref(), strategies);

            if config.cheat_on_open {
                dispatch_next_open(strategies, broker, datas, dt0, *default_valid_until);
            }

            for (i, feed) in datas.iter_mut().enumerate() {
                if delivered[i] {
                    let bar = feed.bar(0);
                    broker.next(feed.market(), &bar, dt0);
                }
            }

            drain_notifications(broker, strategies, analyzers);

            let primary_len = datas[0].lines().len();
            dispatch_next(strategies, broker, datas, dt0, *default_valid_until, primary_len);

            fire_timers(normal_timers, dt0, calendar.as_ref(), strategies);
            record_analyzers(analyzers, broker, datas);
            record_row(writer, dt0, datas);
        }

        drain_notifications(broker, strategies, analyzers);
        if let Some(writer) = writer.as_deref_mut() {
            writer.flush();
        }

        Ok(())
    }
}

fn fire_timers(
    timers: &mut [Timer],
    now: NumericDate,
    calendar: &dyn TradingCalendar,
    strategies: &mut [(Sequence, Box<dyn Strategy>)],
) {
    for timer in timers.iter_mut() {
        if timer.should_fire(now, calendar) {
            timer.mark_fired(now);
            for (_, strategy) in strategies.iter_mut() {
                strategy.notify_timer(timer.queue());
            }
        }
    }
}

fn dispatch_next(
    strategies: &mut [(Sequence, Box<dyn Strategy>)],
    broker: &mut SimulatedBroker,
    datas: &[Box<dyn DataFeed>],
    now: NumericDate,
    default_valid_until: NumericDate,
    primary_len: usize,
) {
    let price = datas[0].close(0);
    let market = datas[0].market().clone();
    for (id, strategy) in strategies.iter_mut() {
        if primary_len < strategy.minperiod() {
            continue;
        }
        let mut ctx = StrategyContext::new(broker, market.clone(), now, price, *id, default_valid_until);
        strategy.next(&mut ctx);
    }
}

fn dispatch_next_open(
    strategies: &mut [(Sequence, Box<dyn Strategy>)],
    broker: &mut SimulatedBroker,
    datas: &[Box<dyn DataFeed>],
    now: NumericDate,
    default_valid_until: NumericDate,
) {
    let price = datas[0].bar(0).open;
    let market = datas[0].market().clone();
    for (id, strategy) in strategies.iter_mut() {
        let mut ctx = StrategyContext::new(broker, market.clone(), now, price, *id, default_valid_until);
        strategy.next_open(&mut ctx);
    }
}

fn drain_notifications(
    broker: &mut SimulatedBroker,
    strategies: &mut [(Sequence, Box<dyn Strategy>)],
    analyzers: &mut [Box<dyn Analyzer>],
) {
    while let Some(notification) = broker.pop_notification() {
        match &notification {
            Notification::Order(order) => {
                debug!(status = ?order.status, "order notification");
                for (_, strategy) in strategies.iter_mut() {
                    strategy.notify_order(order);
                }
                for analyzer in analyzers.iter_mut() {
                    analyzer.notify_order(order);
                }
            }
            Notification::Trade(trade) => {
                for (_, strategy) in strategies.iter_mut() {
                    strategy.notify_trade(trade);
                }
                for analyzer in analyzers.iter_mut() {
                    analyzer.notify_trade(trade);
                }
            }
        }
    }
}

fn mark(datas: &[Box<dyn DataFeed>], market: &Market) -> Option<f64> {
    datas.iter().find(|d| d.market() == market).map(|d| d.close(0))
}

fn record_analyzers(analyzers: &mut [Box<dyn Analyzer>], broker: &SimulatedBroker, datas: &[Box<dyn DataFeed>]) {
    let cash = broker.cash();
    let value = broker.value(|m| mark(datas, m));
    for analyzer in analyzers.iter_mut() {
        analyzer.notify_cashvalue(cash, value);
    }
}

fn record_row(writer: &mut Option<Box<dyn Writer>>, now: NumericDate, datas: &[Box<dyn DataFeed>]) {
    let Some(writer) = writer.as_deref_mut() else {
        return;
    };
    let row: Vec<(&str, String)> = datas
        .iter()
        .map(|d| (d.market().symbol.as_str(), d.close(0).to_string()))
        .collect();
    writer.write_row(now, &row);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::commission::CommissionScheme;
    use crate::broker::slippage::NoSlippage;
    use crate::broker::InstrumentConfig;
    use crate::order::OrderType;
    use cerebro_data::calendar::WeekendCalendar;
    use cerebro_data::feed::historical::HistoricalFeed;
    use cerebro_data::Bar;
    use cerebro_instrument::ContractSpec;
    use chrono::NaiveTime;

    fn market() -> Market {
        Market::new("SIM", "TEST")
    }

    fn bars() -> Vec<Bar> {
        (0..5)
            .map(|i| {
                let c = 10.0 + i as f64;
                Bar::new(i as f64, c, c, c, c, 100.0, 0.0)
            })
            .collect()
    }

    struct BuyOnFirstTick {
        bought: bool,
    }

    impl Strategy for BuyOnFirstTick {
        fn next(&mut self, ctx: &mut StrategyContext<'_>) {
            if !self.bought {
                ctx.buy(OrderType::Market, 1.0);
                self.bought = true;
            }
        }
    }

    fn broker() -> SimulatedBroker {
        let mut broker = SimulatedBroker::new(10_000.0, Box::new(NoSlippage));
        broker.configure_instrument(
            market(),
            InstrumentConfig {
                contract: ContractSpec::default(),
                commission: CommissionScheme::PerContract { fee_per_unit: 0.0 },
            },
        );
        broker
    }

    fn calendar() -> Box<dyn TradingCalendar> {
        Box::new(WeekendCalendar::new(
            NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(23, 59, 59).unwrap(),
        ))
    }

    #[test]
    fn vectorized_run_fills_an_order_submitted_on_the_first_tick() {
        let config = EngineConfig::default();
        let mut engine = Engine::new(config, broker(), calendar()).unwrap();
        engine.add_data(Box::new(HistoricalFeed::new(market(), bars(), 1)));
        engine.add_strategy(Box::new(BuyOnFirstTick { bought: false }));

        engine.run().unwrap();

        let position = engine.broker().position(&market());
        assert_eq!(position.size, 1.0);
    }

    #[test]
    fn event_driven_run_matches_vectorized_fill_count() {
        let mut config = EngineConfig::default();
        config.runonce = false;
        let mut engine = Engine::new(config, broker(), calendar()).unwrap();
        engine.add_data(Box::new(HistoricalFeed::new(market(), bars(), 1)));
        engine.add_strategy(Box::new(BuyOnFirstTick { bought: false }));

        engine.run().unwrap();

        let position = engine.broker().position(&market());
        assert_eq!(position.size, 1.0);
    }

    #[test]
    fn exactbars_other_than_zero_is_rejected() {
        let mut config = EngineConfig::default();
        config.exactbars = 5;
        assert!(EngineConfig::validate(config).is_err());
    }

    #[test]
    fn runonce_without_preload_is_rejected() {
        let mut config = EngineConfig::default();
        config.preload = false;
        config.runonce = true;
        assert!(EngineConfig::validate(config).is_err());
    }
}

use crate::engine::Engine;
use crate::error::EngineError;
use serde::{Deserialize, Serialize};

/// One parameter combination to run as a unit of work in a batch/optimization sweep — a plain
/// value passed to [`run_once`], so the caller can fan it out across threads or processes however
/// it likes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestParams<P> {
    pub strategy_params: P,
    pub initial_cash: f64,
}

/// The serializable result of one run, with the engine's ephemeral state (line buffers, trait
/// objects, anything behind an `Rc`/`Box<dyn _>`) excluded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BacktestOutcome {
    pub final_cash: f64,
    pub final_value: f64,
    pub closed_trades: usize,
    pub total_pnl: f64,
    pub total_pnlcomm: f64,
}

impl BacktestOutcome {
    fn from_engine(engine: &Engine) -> Self {
        let broker = engine.broker();
        let closed = broker.closed_trades();
        Self {
            final_cash: broker.cash(),
            // No live mark is available once the run has finished; `value` falls back to each
            // open position's own entry price.
            final_value: broker.value(|_| None),
            closed_trades: closed.len(),
            total_pnl: closed.iter().map(|trade| trade.pnl).sum(),
            total_pnlcomm: closed.iter().map(|trade| trade.pnlcomm()).sum(),
        }
    }
}

/// Build, run to completion, and summarize one [`Engine`] — the function a batch/optimization
/// sweep calls once per [`BacktestParams`] combination.
pub fn run_once(build: impl FnOnce() -> Result<Engine, EngineError>) -> Result<BacktestOutcome, EngineError> {
    let mut engine = build()?;
    engine.run()?;
    Ok(BacktestOutcome::from_engine(&engine))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::commission::CommissionScheme;
    use crate::broker::slippage::NoSlippage;
    use crate::broker::InstrumentConfig;
    use crate::engine::EngineConfig;
    use crate::order::OrderType;
    use crate::strategy::{Strategy, StrategyContext};
    use crate::broker::SimulatedBroker;
    use cerebro_data::calendar::WeekendCalendar;
    use cerebro_data::feed::historical::HistoricalFeed;
    use cerebro_data::Bar;
    use cerebro_instrument::{ContractSpec, Market};
    use chrono::NaiveTime;

    fn market() -> Market {
        Market::new("SIM", "TEST")
    }

    struct BuyThenSell {
        tick: u32,
    }

    impl Strategy for BuyThenSell {
        fn next(&mut self, ctx: &mut StrategyContext<'_>) {
            match self.tick {
                0 => {
                    ctx.buy(OrderType::Market, 1.0);
                }
                2 => {
                    ctx.close(OrderType::Market);
                }
                _ => {}
            }
            self.tick += 1;
        }
    }

    fn build_engine(initial_cash: f64) -> Result<Engine, EngineError> {
        let bars: Vec<Bar> = (0..5)
            .map(|i| {
                let c = 10.0 + i as f64;
                Bar::new(i as f64, c, c, c, c, 100.0, 0.0)
            })
            .collect();

        let mut broker = SimulatedBroker::new(initial_cash, Box::new(NoSlippage));
        broker.configure_instrument(
            market(),
            InstrumentConfig {
                contract: ContractSpec::default(),
                commission: CommissionScheme::PerContract { fee_per_unit: 0.0 },
            },
        );

        let calendar = Box::new(WeekendCalendar::new(
            NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(23, 59, 59).unwrap(),
        ));

        let mut engine = Engine::new(EngineConfig::default(), broker, calendar)?;
        engine.add_data(Box::new(HistoricalFeed::new(market(), bars, 1)));
        engine.add_strategy(Box::new(BuyThenSell { tick: 0 }));
        Ok(engine)
    }

    #[test]
    fn run_once_reports_one_profitable_round_trip() {
        let outcome = run_once(|| build_engine(10_000.0)).unwrap();

        assert_eq!(outcome.closed_trades, 1);
        assert!(outcome.total_pnl > 0.0, "buying low and selling higher should be profitable");
        assert!((outcome.final_cash - (10_000.0 + outcome.total_pnlcomm)).abs() < 1e-6);
    }
}

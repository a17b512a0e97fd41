use crate::order::Order;
use crate::trade::Trade;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An observer of broker/strategy events over a run, producing a summary at the end.
///
/// Each observer accumulates one kind of result (`BrokerObserver` tracks cash/value/drawdown,
/// `TradesObserver` tracks closed-trade win rate/profit factor/pnl) rather than one monolithic
/// stats struct.
pub trait Analyzer {
    fn notify_order(&mut self, _order: &Order) {}
    fn notify_trade(&mut self, _trade: &Trade) {}
    fn notify_cashvalue(&mut self, _cash: f64, _value: f64) {}

    /// A uniform nested accessor into this analyzer's results, keyed by field path.
    fn get(&self, path: &[&str]) -> Option<Value>;
}

/// Tracks cash/value over a run and the largest peak-to-trough decline in value.
///
/// Drawdown is recomputed from a running peak on every update rather than by a second pass over
/// history at the end.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrokerObserver {
    cash: Vec<f64>,
    value: Vec<f64>,
    peak_value: f64,
    max_drawdown: f64,
    max_drawdown_pct: f64,
}

impl BrokerObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cash_history(&self) -> &[f64] {
        &self.cash
    }

    pub fn value_history(&self) -> &[f64] {
        &self.value
    }

    pub fn max_drawdown(&self) -> f64 {
        self.max_drawdown
    }

    pub fn max_drawdown_pct(&self) -> f64 {
        self.max_drawdown_pct
    }
}

impl Analyzer for BrokerObserver {
    fn notify_cashvalue(&mut self, cash: f64, value: f64) {
        self.cash.push(cash);
        self.value.push(value);

        self.peak_value = self.peak_value.max(value);
        if self.peak_value > 0.0 {
            let drawdown = self.peak_value - value;
            if drawdown > self.max_drawdown {
                self.max_drawdown = drawdown;
                self.max_drawdown_pct = drawdown / self.peak_value;
            }
        }
    }

    fn get(&self, path: &[&str]) -> Option<Value> {
        match path {
            ["cash"] => serde_json::to_value(&self.cash).ok(),
            ["value"] => serde_json::to_value(&self.value).ok(),
            ["max_drawdown"] => Some(Value::from(self.max_drawdown)),
            ["max_drawdown_pct"] => Some(Value::from(self.max_drawdown_pct)),
            _ => None,
        }
    }
}

/// Aggregates closed trades into a win rate / profit factor / total pnl summary.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TradingSummary {
    total_trades: u64,
    wins: u64,
    losses: u64,
    gross_profit: f64,
    gross_loss: f64,
    total_pnl: f64,
    total_pnlcomm: f64,
}

impl TradingSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_trades(&self) -> u64 {
        self.total_trades
    }

    pub fn total_pnl(&self) -> f64 {
        self.total_pnl
    }

    pub fn total_pnlcomm(&self) -> f64 {
        self.total_pnlcomm
    }

    /// `None` when no trades have closed yet.
    pub fn win_rate(&self) -> Option<f64> {
        if self.total_trades == 0 {
            None
        } else {
            Some(self.wins as f64 / self.total_trades as f64)
        }
    }

    /// `f64::INFINITY` with profits and no losses, `f64::NEG_INFINITY` with losses and no
    /// profits, `None` when neither has occurred.
    pub fn profit_factor(&self) -> Option<f64> {
        if self.gross_profit == 0.0 && self.gross_loss == 0.0 {
            return None;
        }
        Some(if self.gross_loss == 0.0 {
            f64::INFINITY
        } else if self.gross_profit == 0.0 {
            f64::NEG_INFINITY
        } else {
            self.gross_profit / self.gross_loss
        })
    }

    fn record(&mut self, trade: &Trade) {
        self.total_trades += 1;
        self.total_pnl += trade.pnl;
        self.total_pnlcomm += trade.pnlcomm();
        if trade.pnlcomm() >= 0.0 {
            self.wins += 1;
            self.gross_profit += trade.pnlcomm();
        } else {
            self.losses += 1;
            self.gross_loss += -trade.pnlcomm();
        }
    }
}

/// [`Analyzer`] wrapper around [`TradingSummary`] — only closed trades are counted.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TradesObserver {
    summary: TradingSummary,
}

impl TradesObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(&self) -> TradingSummary {
        self.summary
    }
}

impl Analyzer for TradesObserver {
    fn notify_trade(&mut self, trade: &Trade) {
        if trade.is_closed() {
            self.summary.record(trade);
        }
    }

    fn get(&self, path: &[&str]) -> Option<Value> {
        match path {
            ["total_trades"] => Some(Value::from(self.summary.total_trades)),
            ["total_pnl"] => Some(Value::from(self.summary.total_pnl)),
            ["total_pnlcomm"] => Some(Value::from(self.summary.total_pnlcomm)),
            ["win_rate"] => self.summary.win_rate().map(Value::from),
            ["profit_factor"] => self.summary.profit_factor().map(Value::from),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cerebro_instrument::Market;

    fn market() -> Market {
        Market::new("SIM", "TEST")
    }

    fn closed_trade(pnl: f64, commission: f64) -> Trade {
        let mut trade = Trade::open(Default::default(), market(), 1.0, 100.0, 0.0);
        trade.add_fill(-1.0, pnl, commission);
        trade.close(1.0);
        trade
    }

    #[test]
    fn broker_observer_tracks_running_max_drawdown() {
        let mut observer = BrokerObserver::new();
        observer.notify_cashvalue(100.0, 100.0);
        observer.notify_cashvalue(100.0, 120.0);
        observer.notify_cashvalue(100.0, 90.0);
        observer.notify_cashvalue(100.0, 110.0);

        assert_eq!(observer.max_drawdown(), 30.0);
        assert!((observer.max_drawdown_pct() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn trades_observer_ignores_open_trades() {
        let mut observer = TradesObserver::new();
        let open_trade = Trade::open(Default::default(), market(), 1.0, 100.0, 0.0);
        observer.notify_trade(&open_trade);
        assert_eq!(observer.summary().total_trades(), 0);
    }

    #[test]
    fn trades_observer_computes_win_rate_and_profit_factor() {
        let mut observer = TradesObserver::new();
        observer.notify_trade(&closed_trade(10.0, 1.0));
        observer.notify_trade(&closed_trade(-4.0, 1.0));

        let summary = observer.summary();
        assert_eq!(summary.total_trades(), 2);
        assert_eq!(summary.win_rate(), Some(0.5));
        assert!((summary.profit_factor().unwrap() - (9.0 / 5.0)).abs() < 1e-9);
    }

    #[test]
    fn get_returns_none_for_unknown_path() {
        let observer = BrokerObserver::new();
        assert_eq!(observer.get(&["nonexistent"]), None);
    }
}

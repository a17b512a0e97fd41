use cerebro_instrument::Market;
use cerebro_integration::datetime::NumericDate;
use cerebro_integration::sequence::Sequence;

/// A [`Trade`]'s lifecycle state.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TradeStatus {
    Created,
    Open,
    Closed,
}

/// The round-trip ledger entry between a position crossing zero and crossing back.
///
/// `pnl` is the sum of realized PnL across every fill absorbed by this trade; `pnlcomm` subtracts
/// the commission attributed to those fills.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub id: Sequence,
    pub market: Market,
    pub size: f64,
    pub entry_price: f64,
    pub open_bar: NumericDate,
    pub close_bar: Option<NumericDate>,
    pub commission: f64,
    pub pnl: f64,
    pub status: TradeStatus,
}

impl Trade {
    /// Open a fresh trade from a fill that took the position away from flat.
    pub fn open(id: Sequence, market: Market, size: f64, entry_price: f64, open_bar: NumericDate) -> Self {
        Self {
            id,
            market,
            size,
            entry_price,
            open_bar,
            close_bar: None,
            commission: 0.0,
            pnl: 0.0,
            status: TradeStatus::Open,
        }
    }

    pub fn pnlcomm(&self) -> f64 {
        self.pnl - self.commission
    }

    /// Fold a further fill's realized PnL and commission into this still-open trade, updating its
    /// residual size.
    pub fn add_fill(&mut self, fill_size: f64, realized_pnl: f64, commission: f64) {
        self.size += fill_size;
        self.pnl += realized_pnl;
        self.commission += commission;
    }

    /// Close this trade at `close_bar`.
    pub fn close(&mut self, close_bar: NumericDate) {
        self.size = 0.0;
        self.close_bar = Some(close_bar);
        self.status = TradeStatus::Closed;
    }

    pub fn is_closed(&self) -> bool {
        self.status == TradeStatus::Closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market() -> Market {
        Market::new("SIM", "TEST")
    }

    /// Scenario F: Buy 1 @ 10, Sell 1 @ 12, commission 0.1 per side.
    #[test]
    fn round_trip_trade_nets_pnl_minus_commission() {
        let mut trade = Trade::open(Sequence(1), market(), 1.0, 10.0, 0.0);
        trade.commission += 0.1;

        // The closing fill realizes (12 - 10) * 1 = 2.0 pnl, plus its own 0.1 commission.
        trade.add_fill(-1.0, 2.0, 0.1);
        trade.close(1.0);

        assert!(trade.is_closed());
        assert_eq!(trade.pnl, 2.0);
        assert_eq!(trade.commission, 0.2);
        assert_eq!(trade.pnlcomm(), 1.8);
    }
}

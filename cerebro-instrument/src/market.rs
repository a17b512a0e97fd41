use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt::{Display, Formatter};

/// A unique exchange-symbol combination a [`crate::Side`]d order/position/trade refers to.
///
/// Stored as [`SmolStr`] rather than `&'static str` so runtime-constructed symbols (e.g.
/// resampled synthetic instruments) are cheap to clone without requiring a `'static` lifetime.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Market {
    pub exchange: SmolStr,
    pub symbol: SmolStr,
}

impl Market {
    pub fn new(exchange: impl Into<SmolStr>, symbol: impl Into<SmolStr>) -> Self {
        Self {
            exchange: exchange.into(),
            symbol: symbol.into(),
        }
    }

    /// A stable identifier for this [`Market`], eg/ `"binance-BTCUSDT"`.
    pub fn market_id(&self) -> String {
        format!("{}-{}", self.exchange, self.symbol)
    }
}

impl Display for Market {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.market_id())
    }
}

/// Per-instrument contract metadata the broker's commission schemes read from.
///
/// `multiplier` and `margin_per_contract` are only meaningful for
/// [`CommissionScheme::Futures`](../cerebro/broker/commission/enum.CommissionScheme.html); cash
/// instruments use `multiplier = 1.0` and ignore margin.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractSpec {
    pub multiplier: f64,
    pub margin_per_contract: f64,
}

impl Default for ContractSpec {
    fn default() -> Self {
        Self {
            multiplier: 1.0,
            margin_per_contract: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_id_combines_exchange_and_symbol() {
        let market = Market::new("binance", "BTCUSDT");
        assert_eq!(market.market_id(), "binance-BTCUSDT");
    }

    #[test]
    fn default_contract_spec_is_unit_cash_instrument() {
        let spec = ContractSpec::default();
        assert_eq!;
        assert_eq!;
    }
}

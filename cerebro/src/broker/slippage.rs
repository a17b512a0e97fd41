use cerebro_instrument::Side;

/// Adjusts a theoretical fill price to model market impact.
pub trait SlippageModel: std::fmt::Debug {
    fn apply(&self, side: Side, price: f64) -> f64;
}

/// No slippage: fills at the theoretical price exactly.
#[derive(Debug, Copy, Clone, Default)]
pub struct NoSlippage;

impl SlippageModel for NoSlippage {
    fn apply(&self, _side: Side, price: f64) -> f64 {
        price
    }
}

/// A fixed percentage of price, always moving the fill against the trader (buys pay more, sells
/// receive less).
#[derive(Debug, Copy, Clone)]
pub struct PercentSlippage {
    pub percent: f64,
}

impl PercentSlippage {
    pub fn new(percent: f64) -> Self {
        Self { percent }
    }
}

impl SlippageModel for PercentSlippage {
    fn apply(&self, side: Side, price: f64) -> f64 {
        let adjustment = price * self.percent;
        match side {
            Side::Buy => price + adjustment,
            Side::Sell => price - adjustment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_slippage_returns_the_price_unchanged() {
        assert_eq!(NoSlippage.apply(Side::Buy, 100.0), 100.0);
    }

    #[test]
    fn percent_slippage_moves_against_the_trader() {
        let model = PercentSlippage::new(0.01);
        assert_eq!(model.apply(Side::Buy, 100.0), 101.0);
        assert_eq!(model.apply(Side::Sell, 100.0), 99.0);
    }
}

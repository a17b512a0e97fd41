use cerebro_instrument::ContractSpec;

/// How commission is computed for a fill: percentage of notional, a flat per-contract fee, or a
/// futures-style per-contract fee scaled by the instrument's point multiplier.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum CommissionScheme {
    /// `notional * rate`, where `notional = size.abs() * price`.
    Percentage { rate: f64 },
    /// A flat fee per contract/unit traded.
    PerContract { fee_per_unit: f64 },
    /// A futures-style scheme: a flat fee per contract, scaled by the instrument's point
    /// multiplier, with margin requirements drawn from the contract spec.
    Futures { fee_per_unit: f64 },
}

impl CommissionScheme {
    pub fn commission(&self, size: f64, price: f64, spec: &ContractSpec) -> f64 {
        let units = size.abs();
        match self {
            CommissionScheme::Percentage { rate } => units * price * spec.multiplier * rate,
            CommissionScheme::PerContract { fee_per_unit } => units * fee_per_unit,
            CommissionScheme::Futures { fee_per_unit } => units * fee_per_unit * spec.multiplier,
        }
    }

    /// The margin a single unit of this instrument requires, under this scheme (zero for cash
    /// instruments that settle in full at fill time).
    pub fn margin_per_unit(&self, spec: &ContractSpec) -> f64 {
        match self {
            CommissionScheme::Percentage { .. } | CommissionScheme::PerContract { .. } => 0.0,
            CommissionScheme::Futures { .. } => spec.margin_per_contract,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn percentage_scheme_scales_with_notional() {
        let scheme = CommissionScheme::Percentage { rate: 0.001 };
        let spec = ContractSpec::default();
        assert_relative_eq!(scheme.commission(10.0, 100.0, &spec), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn per_contract_scheme_ignores_price() {
        let scheme = CommissionScheme::PerContract { fee_per_unit: 0.5 };
        let spec = ContractSpec::default();
        assert_eq!(scheme.commission(4.0, 9999.0, &spec), 2.0);
    }

    #[test]
    fn futures_scheme_scales_by_multiplier() {
        let scheme = CommissionScheme::Futures { fee_per_unit: 2.0 };
        let spec = ContractSpec {
            multiplier: 50.0,
            margin_per_contract: 500.0,
        };
        assert_eq!(scheme.commission(1.0, 0.0, &spec), 100.0);
        assert_eq!(scheme.margin_per_unit(&spec), 500.0);
    }
}

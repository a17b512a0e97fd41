use cerebro_instrument::{Market, Side};
use cerebro_integration::datetime::NumericDate;
use cerebro_integration::sequence::Sequence;

/// How an [`Order`] is matched against incoming bars.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum OrderType {
    /// Fill at the next bar's open (or the current bar's open under cheat-on-open).
    Market,
    /// Fill at the current bar's close.
    Close,
    /// Fill if the bar's range touches `price`, at the better of `price`/open.
    Limit { price: f64 },
    /// Fill if the bar crosses `stop`, at the worse of `stop`/open.
    Stop { stop: f64 },
    /// Becomes a [`OrderType::Limit`] once `stop` triggers.
    StopLimit { stop: f64, limit: f64 },
    /// Ratchets its trigger off the running extreme of the watched side (high for a sell, low
    /// for a buy) since placement, offset by `trail_amount`.
    StopTrail { trail_amount: f64 },
    /// [`OrderType::StopTrail`] that becomes a [`OrderType::Limit`] at `limit_offset` once
    /// triggered.
    StopTrailLimit {
        trail_amount: f64,
        limit_offset: f64,
    },
}

/// An [`Order`]'s lifecycle state. Terminal states (`Completed`,
/// `Canceled`, `Expired`, `Rejected`, `Margin`) are sticky: once reached, no further transition is
/// permitted.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum OrderStatus {
    Created,
    Submitted,
    Accepted,
    Partial { filled: u64 },
    Completed,
    Canceled,
    Expired,
    Rejected,
    Margin,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed
                | OrderStatus::Canceled
                | OrderStatus::Expired
                | OrderStatus::Rejected
                | OrderStatus::Margin
        )
    }
}

/// A request to buy or sell a fixed quantity of an instrument, tracked through to a terminal
/// status.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: Sequence,
    pub owner_ref: Sequence,
    pub market: Market,
    pub side: Side,
    pub order_type: OrderType,
    pub size: f64,
    pub valid_until: NumericDate,
    pub tradeid: u64,
    pub status: OrderStatus,
    pub submitted_at: NumericDate,
    /// Running extreme (high for a protective sell, low for a protective buy) the broker has
    /// observed since this order was placed. Only meaningful for
    /// [`OrderType::StopTrail`]/[`OrderType::StopTrailLimit`]; `None` until the first bar the
    /// broker has matched it against.
    pub trail_extreme: Option<f64>,
}

impl Order {
    pub fn new(
        id: Sequence,
        owner_ref: Sequence,
        market: Market,
        side: Side,
        order_type: OrderType,
        size: f64,
        valid_until: NumericDate,
        tradeid: u64,
        submitted_at: NumericDate,
    ) -> Self {
        Self {
            id,
            owner_ref,
            market,
            side,
            order_type,
            size,
            valid_until,
            tradeid,
            status: OrderStatus::Created,
            submitted_at,
            trail_extreme: None,
        }
    }

    /// Transition to a new status. Panics in debug builds if `self.status` is already terminal —
    /// terminal states are sticky, and a caller reaching this after a terminal state is a
    /// broker-matching bug, not a recoverable runtime condition.
    pub fn transition(&mut self, next: OrderStatus) {
        debug_assert!(
            !self.status.is_terminal(),
            "attempted to transition a terminal order {:?} -> {:?}",
            self.status,
            next
        );
        self.status = next;
    }

    pub fn is_buy(&self) -> bool {
        self.side == Side::Buy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(order_type: OrderType) -> Order {
        Order::new(
            Sequence(1),
            Sequence(1),
            Market::new("SIM", "TEST"),
            Side::Buy,
            order_type,
            1.0,
            f64::INFINITY,
            0,
            0.0,
        )
    }

    #[test]
    fn terminal_statuses_report_as_terminal() {
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Rejected.is_terminal());
        assert!(!OrderStatus::Accepted.is_terminal());
        assert!(!OrderStatus::Partial { filled: 1 }.is_terminal());
    }

    #[test]
    fn transition_moves_status_forward() {
        let mut order = order(OrderType::Market);
        order.transition(OrderStatus::Submitted);
        order.transition(OrderStatus::Accepted);
        order.transition(OrderStatus::Completed);
        assert_eq!(order.status, OrderStatus::Completed);
    }
}

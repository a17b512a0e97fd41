use crate::error::OrderValidationError;
use crate::order::{Order, OrderStatus, OrderType};
use crate::position::Position;
use crate::trade::Trade;
use cerebro_data::Bar;
use cerebro_instrument::{ContractSpec, Market, Side};
use cerebro_integration::datetime::NumericDate;
use cerebro_integration::sequence::Sequence;
use std::collections::{HashMap, VecDeque};
use tracing::{debug, warn};

/// Per-instrument commission and contract configuration.
pub mod commission;
/// Slippage models applied to theoretical fill prices.
pub mod slippage;

use commission::CommissionScheme;
use slippage::SlippageModel;

/// A status/event the broker emits for strategies to observe.
#[derive(Debug, Clone)]
pub enum Notification {
    Order(Order),
    Trade(Trade),
}

/// Per-instrument configuration the broker needs to match and cost a fill.
#[derive(Debug, Clone)]
pub struct InstrumentConfig {
    pub contract: ContractSpec,
    pub commission: CommissionScheme,
}

/// Caps how much of an order's size can be filled from a single bar. `Unlimited` is the default.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum VolumeCap {
    Unlimited,
    Fraction(f64),
}

/// The simulated broker: holds cash/positions, matches pending orders against bars, and emits
/// order/trade notifications.
#[derive(Debug)]
pub struct SimulatedBroker {
    cash: f64,
    initial_cash: f64,
    positions: HashMap<Market, Position>,
    open_trades: HashMap<Market, Trade>,
    closed_trades: Vec<Trade>,
    pending: Vec<Order>,
    notifications: VecDeque<Notification>,
    instruments: HashMap<Market, InstrumentConfig>,
    slippage: Box<dyn SlippageModel>,
    volume_cap: VolumeCap,
    order_seq: Sequence,
    trade_seq: Sequence,
}

impl SimulatedBroker {
    pub fn new(initial_cash: f64, slippage: Box<dyn SlippageModel>) -> Self {
        Self {
            cash: initial_cash,
            initial_cash,
            positions: HashMap::new(),
            open_trades: HashMap::new(),
            closed_trades: Vec::new(),
            pending: Vec::new(),
            notifications: VecDeque::new(),
            instruments: HashMap::new(),
            slippage,
            volume_cap: VolumeCap::Unlimited,
            order_seq: Sequence::new(),
            trade_seq: Sequence::new(),
        }
    }

    pub fn with_volume_cap(mut self, cap: VolumeCap) -> Self {
        self.volume_cap = cap;
        self
    }

    pub fn configure_instrument(&mut self, market: Market, config: InstrumentConfig) {
        self.instruments.insert(market, config);
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    /// Total equity: cash plus the mark-to-market value of every open position, given a
    /// `mark(&Market) -> f64` price lookup.
    pub fn value(&self, mark: impl Fn(&Market) -> Option<f64>) -> f64 {
        self.cash
            + self
                .positions
                .iter()
                .filter(|(_, position)| !position.is_flat())
                .map(|(market, position)| {
                    let price = mark(market).unwrap_or(position.price);
                    let spec = self.contract(market);
                    position.size * price * spec.multiplier
                })
                .sum::<f64>()
    }

    pub fn position(&self, market: &Market) -> Position {
        self.positions.get(market).copied().unwrap_or_default()
    }

    pub fn pop_notification(&mut self) -> Option<Notification> {
        self.notifications.pop_front()
    }

    fn contract(&self, market: &Market) -> ContractSpec {
        self.instruments
            .get(market)
            .map(|c| c.contract)
            .unwrap_or_default()
    }

    fn commission_scheme(&self, market: &Market) -> CommissionScheme {
        self.instruments
            .get(market)
            .map(|c| c.commission)
            .unwrap_or(CommissionScheme::Percentage { rate: 0.0 })
    }

    /// Validate and queue an order; a malformed order is synchronously Rejected.
    pub fn submit(&mut self, mut order: Order) -> Order {
        if let Err(error) = self.validate(&order) {
            warn!(%error, "order rejected at submission");
            order.transition(OrderStatus::Rejected);
            self.notifications.push_back(Notification::Order(order.clone()));
            return order;
        }

        order.transition(OrderStatus::Submitted);
        order.transition(OrderStatus::Accepted);
        self.notifications.push_back(Notification::Order(order.clone()));
        self.pending.push(order.clone());
        order
    }

    /// Construct and [`SimulatedBroker::submit`] an [`Order`] in one step, assigning it the next
    /// [`Sequence`] id from this broker's own counter — the entry point
    /// [`crate::strategy::StrategyContext`] uses so a strategy never has to manage order ids
    /// itself.
    #[allow(clippy::too_many_arguments)]
    pub fn place(
        &mut self,
        owner_ref: Sequence,
        market: Market,
        side: Side,
        order_type: OrderType,
        size: f64,
        valid_until: NumericDate,
        tradeid: u64,
        now: NumericDate,
    ) -> Order {
        let id = self.order_seq.fetch_add();
        let order = Order::new(id, owner_ref, market, side, order_type, size, valid_until, tradeid, now);
        self.submit(order)
    }

    fn validate(&self, order: &Order) -> Result<(), OrderValidationError> {
        if order.size == 0.0 {
            return Err(OrderValidationError::ZeroSize);
        }
        Ok(())
    }

    /// Cancel a pending order by id, if it is still in a cancelable (non-terminal) state.
    pub fn cancel(&mut self, order_id: Sequence) {
        if let Some(order) = self.pending.iter_mut().find(|o| o.id == order_id) {
            if !order.status.is_terminal() {
                order.transition(OrderStatus::Canceled);
                self.notifications.push_back(Notification::Order(order.clone()));
            }
        }
        self.pending.retain(|o| !o.status.is_terminal());
    }

    /// Match pending orders for `market` against `bar`. Whether this lands on the bar an order
    /// was decided against or the one after it is entirely a function of when the caller invokes
    /// `next` relative to strategy dispatch (see [`crate::engine::EngineConfig::cheat_on_open`]);
    /// the matching rules here do not distinguish the two.
    pub fn next(&mut self, market: &Market, bar: &Bar, now: NumericDate) {
        let mut still_pending = Vec::with_capacity(self.pending.len());

        for mut order in std::mem::take(&mut self.pending) {
            if order.market != *market {
                still_pending.push(order);
                continue;
            }

            if order.valid_until.is_finite() && now > order.valid_until {
                order.transition(OrderStatus::Expired);
                self.notifications.push_back(Notification::Order(order.clone()));
                continue;
            }

            Self::update_trail_extreme(&mut order, bar);

            match self.try_fill(&order, bar) {
                Some(fill_price) => {
                    let fillable = self.fillable_size(order.size, bar.volume);
                    let fill_result =
                        self.apply_fill(&order.market, order.side, fillable, fill_price, bar.datetime);

                    match fill_result {
                        Err(()) => {
                            order.transition(OrderStatus::Margin);
                            self.notifications.push_back(Notification::Order(order.clone()));
                        }
                        Ok(()) if fillable < order.size => {
                            order.size -= fillable;
                            order.transition(OrderStatus::Partial {
                                filled: fillable as u64,
                            });
                            self.notifications.push_back(Notification::Order(order.clone()));
                            still_pending.push(order);
                        }
                        Ok(()) => {
                            order.transition(OrderStatus::Completed);
                            self.notifications.push_back(Notification::Order(order.clone()));
                        }
                    }
                }
                None => still_pending.push(order),
            }
        }

        self.pending = still_pending;
    }

    /// How much of `order_size` can be filled from this single bar, per the configured
    /// [`VolumeCap`].
    fn fillable_size(&self, order_size: f64, bar_volume: f64) -> f64 {
        match self.volume_cap {
            VolumeCap::Unlimited => order_size,
            VolumeCap::Fraction(fraction) => order_size.min((bar_volume * fraction).max(0.0)),
        }
    }

    /// Update `order`'s persisted trailing extreme from `bar`, for
    /// [`OrderType::StopTrail`]/[`OrderType::StopTrailLimit`] orders. A no-op for every other
    /// order type. Must run before [`SimulatedBroker::try_fill`] so the trigger it computes
    /// reflects every bar seen since the order was placed, not just the current one.
    fn update_trail_extreme(order: &mut Order, bar: &Bar) {
        if !matches!(order.order_type, OrderType::StopTrail { .. } | OrderType::StopTrailLimit { .. }) {
            return;
        }
        order.trail_extreme = Some(match order.side {
            // A sell trail protects a long position and ratchets up with the running high.
            Side::Sell => bar.high.max(order.trail_extreme.unwrap_or(bar.high)),
            // A buy trail protects a short position and ratchets down with the running low.
            Side::Buy => bar.low.min(order.trail_extreme.unwrap_or(bar.low)),
        });
    }

    /// Determine the fill price for `order` against `bar`, or `None` if it does not yet match.
    fn try_fill(&self, order: &Order, bar: &Bar) -> Option<f64> {
        match order.order_type {
            OrderType::Market => Some(bar.open),
            OrderType::Close => Some(bar.close),
            OrderType::Limit { price } => match order.side {
                Side::Buy if bar.low <= price => Some(price.min(bar.open)),
                Side::Sell if bar.high >= price => Some(price.max(bar.open)),
                _ => None,
            },
            OrderType::Stop { stop } => match order.side {
                Side::Buy if bar.high >= stop => Some(stop.max(bar.open)),
                Side::Sell if bar.low <= stop => Some(stop.min(bar.open)),
                _ => None,
            },
            OrderType::StopLimit { stop, limit } => {
                let triggered = match order.side {
                    Side::Buy => bar.high >= stop,
                    Side::Sell => bar.low <= stop,
                };
                if !triggered {
                    return None;
                }
                match order.side {
                    Side::Buy if bar.low <= limit => Some(limit.min(bar.open)),
                    Side::Sell if bar.high >= limit => Some(limit.max(bar.open)),
                    _ => None,
                }
            }
            OrderType::StopTrail { trail_amount } => {
                let extreme = order.trail_extreme.expect(
                    "update_trail_extreme runs before try_fill for every StopTrail order",
                );
                let trigger = match order.side {
                    Side::Buy => extreme + trail_amount,
                    Side::Sell => extreme - trail_amount,
                };
                match order.side {
                    Side::Buy if bar.high >= trigger => Some(trigger.max(bar.open)),
                    Side::Sell if bar.low <= trigger => Some(trigger.min(bar.open)),
                    _ => None,
                }
            }
            OrderType::StopTrailLimit {
                trail_amount,
                limit_offset,
            } => {
                let extreme = order.trail_extreme.expect(
                    "update_trail_extreme runs before try_fill for every StopTrailLimit order",
                );
                let trigger = match order.side {
                    Side::Buy => extreme + trail_amount,
                    Side::Sell => extreme - trail_amount,
                };
                let limit = match order.side {
                    Side::Buy => trigger + limit_offset,
                    Side::Sell => trigger - limit_offset,
                };
                match order.side {
                    Side::Buy if bar.high >= trigger && bar.low <= limit => Some(limit.min(bar.open)),
                    Side::Sell if bar.low <= trigger && bar.high >= limit => Some(limit.max(bar.open)),
                    _ => None,
                }
            }
        }
    }

    /// Apply a fill of `size` units of `market` at `theoretical_price` (before slippage) to cash,
    /// position and trade-tracking state. Returns `Err(())` without mutating anything if the fill
    /// would require more cash/margin than is available.
    fn apply_fill(
        &mut self,
        market: &Market,
        side: Side,
        size: f64,
        theoretical_price: f64,
        bar_datetime: NumericDate,
    ) -> Result<(), ()> {
        let fill_price = self.slippage.apply(side, theoretical_price);
        let signed_size = match side {
            Side::Buy => size,
            Side::Sell => -size,
        };

        let spec = self.contract(market);
        let scheme = self.commission_scheme(market);
        let commission = scheme.commission(size, fill_price, &spec);
        let required_margin = scheme.margin_per_unit(&spec) * size.abs();
        let cash_required = commission
            + if required_margin > 0.0 {
                required_margin
            } else {
                signed_size * fill_price * spec.multiplier
            };

        if cash_required > self.cash && signed_size > 0.0 {
            return Err(());
        }

        self.cash -= commission;
        if required_margin == 0.0 {
            self.cash -= signed_size * fill_price * spec.multiplier;
        }

        let position = self.positions.entry(market.clone()).or_default();
        let was_flat = position.is_flat();
        let outcome = position.update(signed_size, fill_price);
        let now_flat = position.is_flat();

        self.track_trade(
            market.clone(),
            signed_size,
            fill_price,
            bar_datetime,
            commission,
            was_flat,
            outcome.realized_pnl,
            outcome.crossed_zero,
            now_flat,
        );

        debug!(%market, price = fill_price, size, "order filled");
        Ok(())
    }

    fn track_trade(
        &mut self,
        market: Market,
        signed_size: f64,
        fill_price: f64,
        bar_datetime: NumericDate,
        commission: f64,
        was_flat: bool,
        realized_pnl: f64,
        crossed_zero: bool,
        now_flat: bool,
    ) {
        if was_flat {
            let id = self.trade_seq.fetch_add();
            let mut trade = Trade::open(id, market.clone(), signed_size, fill_price, bar_datetime);
            trade.commission += commission;
            self.open_trades.insert(market, trade);
            return;
        }

        if let Some(trade) = self.open_trades.get_mut(&market) {
            trade.add_fill(signed_size, realized_pnl, commission);
            if crossed_zero && now_flat {
                trade.close(bar_datetime);
                let closed = self.open_trades.remove(&market).expect("just matched");
                self.notifications.push_back(Notification::Trade(closed.clone()));
                self.closed_trades.push(closed);
            } else if crossed_zero {
                // Reversed through zero without landing flat: close the old trade and open a
                // fresh one in the opposite direction for the residual size.
                let mut old = self.open_trades.remove(&market).expect("just matched");
                old.size = 0.0;
                old.close(bar_datetime);
                self.notifications.push_back(Notification::Trade(old.clone()));
                self.closed_trades.push(old);

                let residual = self.positions.get(&market).map(|p| p.size).unwrap_or(0.0);
                let id = self.trade_seq.fetch_add();
                let fresh = Trade::open(id, market.clone(), residual, fill_price, bar_datetime);
                self.open_trades.insert(market, fresh);
            }
        }
    }

    pub fn closed_trades(&self) -> &[Trade] {
        &self.closed_trades
    }

    pub fn open_trade(&self, market: &Market) -> Option<&Trade> {
        self.open_trades.get(market)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sizer::{FixedSizer, Sizer};
    use approx::assert_relative_eq;
    use slippage::NoSlippage;

    fn market() -> Market {
        Market::new("SIM", "TEST")
    }

    fn bar(dt: f64, o: f64, h: f64, l: f64, c: f64) -> Bar {
        Bar::new(dt, o, h, l, c, 1000.0, 0.0)
    }

    fn buy(market: Market, order_type: OrderType, size: f64, valid_until: f64) -> Order {
        Order::new(
            Sequence(0),
            Sequence(0),
            market,
            Side::Buy,
            order_type,
            size,
            valid_until,
            0,
            0.0,
        )
    }

    fn sell(market: Market, order_type: OrderType, size: f64, valid_until: f64) -> Order {
        Order::new(
            Sequence(0),
            Sequence(0),
            market,
            Side::Sell,
            order_type,
            size,
            valid_until,
            0,
            0.0,
        )
    }

    /// Scenario A: a Market Buy decided against bar 1 (ie/ submitted only after the broker has
    /// already matched bar 1) fills at bar 2's open — the deferral a strategy sees in the engine,
    /// where `broker.next` for a tick always runs before that tick's `strategy.next` can submit
    /// anything.
    #[test]
    fn scenario_a_market_order_fills_at_next_bar_open() {
        let mut broker = SimulatedBroker::new(10_000.0, Box::new(NoSlippage));
        let market = market();
        broker.configure_instrument(
            market.clone(),
            InstrumentConfig {
                contract: ContractSpec::default(),
                commission: CommissionScheme::PerContract { fee_per_unit: 0.0 },
            },
        );

        let bar1 = bar(1.0, 10.0, 12.0, 9.0, 11.0);
        broker.next(&market, &bar1, bar1.datetime);

        let order = broker.submit(buy(market.clone(), OrderType::Market, 1.0, f64::INFINITY));
        assert_eq!(order.status, OrderStatus::Accepted);
        assert!(broker.closed_trades().is_empty());

        let bar2 = bar(2.0, 11.0, 13.0, 10.0, 12.0);
        broker.next(&market, &bar2, bar2.datetime);

        let position = broker.position(&market);
        assert_eq!(position.size, 1.0);
        assert_eq!(position.price, 11.0);

        let bar3 = bar(3.0, 12.0, 14.0, 11.0, 13.0);
        let value = broker.value(|_| Some(bar3.close));
        assert_relative_eq!(value, 10000.0 - 11.0 + 13.0, epsilon = 1e-9);
    }

    /// Scenario B: Limit Buy price=8, valid=2 bars, never touched, expires on bar 3.
    #[test]
    fn scenario_b_limit_order_expires_untouched() {
        let mut broker = SimulatedBroker::new(10_000.0, Box::new(NoSlippage));
        let market = market();
        broker.configure_instrument(
            market.clone(),
            InstrumentConfig {
                contract: ContractSpec::default(),
                commission: CommissionScheme::PerContract { fee_per_unit: 0.0 },
            },
        );

        let order = broker.submit(buy(market.clone(), OrderType::Limit { price: 8.0 }, 1.0, 2.0));

        broker.next(&market, &bar(1.0, 10.0, 12.0, 9.0, 11.0), 1.0);
        broker.next(&market, &bar(2.0, 11.0, 13.0, 10.0, 12.0), 2.0);
        broker.next(&market, &bar(3.0, 12.0, 14.0, 11.0, 13.0), 3.0);

        assert!(broker.position(&market).is_flat());
        assert_eq!(broker.cash(), 10_000.0);
        let _ = order;
    }

    /// Scenario C: Stop Sell stop=9, gaps down, fills at bar 2's open (worse of
    /// stop/open for a sell).
    #[test]
    fn scenario_c_stop_sell_fills_through_a_gap_down() {
        let mut broker = SimulatedBroker::new(10_000.0, Box::new(NoSlippage));
        let market = market();
        broker.configure_instrument(
            market.clone(),
            InstrumentConfig {
                contract: ContractSpec::default(),
                commission: CommissionScheme::PerContract { fee_per_unit: 0.0 },
            },
        );
        // Establish a long position to sell out of.
        broker.next(&market, &bar(0.0, 10.0, 10.0, 10.0, 10.0), 0.0);
        broker
            .positions
            .insert(market.clone(), Position { size: 1.0, price: 10.0, adjbase: 0.0 });

        broker.submit(sell(market.clone(), OrderType::Stop { stop: 9.0 }, 1.0, f64::INFINITY));

        broker.next(&market, &bar(1.0, 10.0, 10.0, 10.0, 10.0), 1.0);
        assert!(!broker.position(&market).is_flat(), "stop has not triggered yet");

        broker.next(&market, &bar(2.0, 8.0, 9.0, 7.0, 7.5), 2.0);
        assert!(broker.position(&market).is_flat(), "gap-down bar triggers and fills the stop");
    }

    /// Scenario E: with cheat-on-open, a Market Buy fills at the *current* bar's open.
    #[test]
    fn scenario_e_cheat_on_open_fills_at_current_bar_open() {
        let mut broker = SimulatedBroker::new(10_000.0, Box::new(NoSlippage));
        let market = market();
        broker.configure_instrument(
            market.clone(),
            InstrumentConfig {
                contract: ContractSpec::default(),
                commission: CommissionScheme::PerContract { fee_per_unit: 0.0 },
            },
        );

        broker.submit(buy(market.clone(), OrderType::Market, 1.0, f64::INFINITY));
        broker.next(&market, &bar(1.0, 10.0, 12.0, 9.0, 11.0), 1.0);

        let position = broker.position(&market);
        assert_eq!(position.size, 1.0);
        assert_eq!(position.price, 10.0, "cheat-on-open fills at the current bar's open");
    }

    /// Scenario F: Buy 1 @ 10, Sell 1 @ 12, commission 0.1 per side -> closed trade
    /// pnl=2, pnlcomm=1.8.
    #[test]
    fn scenario_f_round_trip_trade_commission_attribution() {
        let mut broker = SimulatedBroker::new(10_000.0, Box::new(NoSlippage));
        let market = market();
        broker.configure_instrument(
            market.clone(),
            InstrumentConfig {
                contract: ContractSpec::default(),
                commission: CommissionScheme::PerContract { fee_per_unit: 0.1 },
            },
        );

        broker.submit(buy(market.clone(), OrderType::Close, 1.0, f64::INFINITY));
        broker.next(&market, &bar(1.0, 10.0, 10.0, 10.0, 10.0), 1.0);

        broker.submit(sell(market.clone(), OrderType::Close, 1.0, f64::INFINITY));
        broker.next(&market, &bar(2.0, 12.0, 12.0, 12.0, 12.0), 2.0);

        assert_eq!(broker.closed_trades().len(), 1);
        let trade = &broker.closed_trades()[0];
        assert_relative_eq!(trade.pnl, 2.0, epsilon = 1e-9);
        assert_relative_eq!(trade.pnlcomm(), 1.8, epsilon = 1e-9);
    }

    #[test]
    fn zero_size_order_is_rejected_synchronously() {
        let mut broker = SimulatedBroker::new(10_000.0, Box::new(NoSlippage));
        let order = broker.submit(buy(market(), OrderType::Market, 0.0, f64::INFINITY));
        assert_eq!(order.status, OrderStatus::Rejected);
    }

    #[test]
    fn fixed_sizer_feeds_directly_into_an_order_size() {
        let sizer = FixedSizer::new(2.0);
        let size = sizer.size(Side::Buy, 10_000.0, 10_000.0, 100.0);
        assert_eq!(size, 2.0);
    }

    /// A sell trailing stop protecting a long ratchets up with the running high and only
    /// triggers once price retreats `trail_amount` off that peak, not off whatever the current
    /// bar's own high happens to be.
    #[test]
    fn sell_trailing_stop_ratchets_with_the_running_high_before_it_fires() {
        let mut broker = SimulatedBroker::new(10_000.0, Box::new(NoSlippage));
        let market = market();
        broker.configure_instrument(
            market.clone(),
            InstrumentConfig {
                contract: ContractSpec::default(),
                commission: CommissionScheme::PerContract { fee_per_unit: 0.0 },
            },
        );
        broker
            .positions
            .insert(market.clone(), Position { size: 1.0, price: 10.0, adjbase: 0.0 });
        broker.submit(sell(
            market.clone(),
            OrderType::StopTrail { trail_amount: 2.0 },
            1.0,
            f64::INFINITY,
        ));

        // High 10 sets the first peak; 8 (10 - 2) is not touched.
        broker.next(&market, &bar(1.0, 10.0, 10.0, 9.0, 9.5), 1.0);
        assert!(!broker.position(&market).is_flat(), "trail has not triggered yet");

        // High 15 raises the peak to 15; the trigger follows to 13, still untouched.
        broker.next(&market, &bar(2.0, 11.0, 15.0, 14.0, 14.5), 2.0);
        assert!(
            !broker.position(&market).is_flat(),
            "rising price should raise the trail, not let it fire"
        );

        // This bar's own high (13) is below the running peak (15), but the low (11) finally
        // crosses the ratcheted trigger (15 - 2 = 13).
        broker.next(&market, &bar(3.0, 13.0, 13.0, 11.0, 11.5), 3.0);
        assert!(broker.position(&market).is_flat(), "low crossing the ratcheted trigger fires the stop");
    }
}

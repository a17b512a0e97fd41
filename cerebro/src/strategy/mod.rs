use crate::broker::SimulatedBroker;
use crate::order::{Order, OrderType};
use crate::position::Position;
use crate::trade::Trade;
use cerebro_data::Bar;
use cerebro_data::timer::TimerQueue;
use cerebro_instrument::{Market, Side};
use cerebro_integration::datetime::NumericDate;
use cerebro_integration::sequence::Sequence;

/// A crossover of two simple moving averages.
pub mod sma_cross;

/// An [`crate::indicator::Indicator`] subtype that issues orders and observes fills.
///
/// The engine drives a strategy through two parallel paths depending on [`crate::engine::Engine`]
/// mode:
///
/// - **Vectorized**: [`Strategy::preload_mirror`] is replayed once per preloaded bar to populate
///   any internal lines the strategy mirrors from its feed(s), [`Strategy::compute_once`] then
///   writes every indicator value over the whole preloaded range, [`Strategy::rehome`] resets the
///   strategy's own line pointers to before-first, and the main loop calls
///   [`Strategy::advance_tick`] once per tick to move those pointers in lockstep with the feed
///   (whose values are already fully computed).
/// - **Event-driven**: [`Strategy::on_bar`] is called once per tick per feed instead — it
///   forwards (allocates) the strategy's own lines by one slot and computes that one new value
///   immediately.
///
/// Both paths bottom out in the same [`crate::indicator::Indicator::next`]/`once` calls a plain
/// indicator uses, so they are bit-identical by construction rather than by
/// a property no one checks.
pub trait Strategy {
    /// This strategy's own minimum period — the largest minperiod among the indicators it reads
    /// in [`Strategy::next`]. The engine suppresses calls to
    /// [`Strategy::next`]/[`Strategy::next_open`] until the primary feed's length reaches this.
    fn minperiod(&self) -> usize {
        1
    }

    /// Mirror one preloaded bar into this strategy's internal lines, without computing anything
    /// yet (vectorized preload pass).
    fn preload_mirror(&mut self, _market: &Market, _bar: &Bar) {}

    /// Compute every indicator value over `[start, end)` (vectorized pass, called once after
    /// every bar has been mirrored).
    fn compute_once(&mut self, _start: i64, _end: i64) {}

    /// Reset this strategy's internal line pointers to before-first, after [`Strategy::compute_once`]
    /// and before the engine's main vectorized tick loop.
    fn rehome(&mut self) {}

    /// Move this strategy's internal line pointers forward by one tick without reallocating
    /// (vectorized main loop — values were already written by [`Strategy::compute_once`]).
    fn advance_tick(&mut self) {}

    /// Mirror and compute one new bar in a single step (event-driven mode).
    fn on_bar(&mut self, _market: &Market, _bar: &Bar) {}

    /// Called once per tick once the primary feed has reached [`Strategy::minperiod`].
    fn next(&mut self, ctx: &mut StrategyContext<'_>);

    /// Called before broker matching under cheat-on-open.
    fn next_open(&mut self, _ctx: &mut StrategyContext<'_>) {}

    fn notify_order(&mut self, _order: &Order) {}
    fn notify_trade(&mut self, _trade: &Trade) {}
    fn notify_cashvalue(&mut self, _cash: f64, _value: f64) {}
    fn notify_timer(&mut self, _queue: TimerQueue) {}
}

/// The broker/market handle a [`Strategy`] uses from [`Strategy::next`]/[`Strategy::next_open`]
/// to submit orders.
#[derive(Debug)]
pub struct StrategyContext<'a> {
    broker: &'a mut SimulatedBroker,
    market: Market,
    now: NumericDate,
    price: f64,
    owner_ref: Sequence,
    default_valid_until: NumericDate,
}

impl<'a> StrategyContext<'a> {
    pub fn new(
        broker: &'a mut SimulatedBroker,
        market: Market,
        now: NumericDate,
        price: f64,
        owner_ref: Sequence,
        default_valid_until: NumericDate,
    ) -> Self {
        Self {
            broker,
            market,
            now,
            price,
            owner_ref,
            default_valid_until,
        }
    }

    pub fn market(&self) -> &Market {
        &self.market
    }

    pub fn now(&self) -> NumericDate {
        self.now
    }

    /// The reference price the engine observed this tick (typically the primary feed's close),
    /// used by [`StrategyContext::order_target_value`]/[`StrategyContext::order_target_percent`].
    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn cash(&self) -> f64 {
        self.broker.cash()
    }

    pub fn position(&self) -> Position {
        self.broker.position(&self.market)
    }

    pub fn value(&self, mark: impl Fn(&Market) -> Option<f64>) -> f64 {
        self.broker.value(mark)
    }

    /// Submit a buy order.
    pub fn buy(&mut self, order_type: OrderType, size: f64) -> Order {
        self.place(Side::Buy, order_type, size)
    }

    /// Submit a sell order.
    pub fn sell(&mut self, order_type: OrderType, size: f64) -> Order {
        self.place(Side::Sell, order_type, size)
    }

    /// Submit an order that flattens the current position, or `None` if already flat.
    pub fn close(&mut self, order_type: OrderType) -> Option<Order> {
        let position = self.position();
        if position.is_flat() {
            return None;
        }
        let side = if position.is_long() { Side::Sell } else { Side::Buy };
        Some(self.place(side, order_type, position.size.abs()))
    }

    /// Submit an order moving the position to an absolute signed `target` size, or `None` if
    /// already there.
    pub fn order_target_size(&mut self, order_type: OrderType, target: f64) -> Option<Order> {
        let delta = target - self.position().size;
        if delta == 0.0 {
            return None;
        }
        let side = Side::from_signed(delta)?;
        Some(self.place(side, order_type, delta.abs()))
    }

    /// As [`StrategyContext::order_target_size`], but `target_value` is a notional amount
    /// converted to units at [`StrategyContext::price`].
    pub fn order_target_value(&mut self, order_type: OrderType, target_value: f64) -> Option<Order> {
        if self.price <= 0.0 {
            return None;
        }
        self.order_target_size(order_type, target_value / self.price)
    }

    /// As [`StrategyContext::order_target_value`], but `target_percent` is a fraction of current
    /// total equity.
    pub fn order_target_percent(&mut self, order_type: OrderType, target_percent: f64) -> Option<Order> {
        let market = self.market.clone();
        let price = self.price;
        let equity = self.broker.value(|m| if *m == market { Some(price) } else { None });
        self.order_target_value(order_type, equity * target_percent)
    }

    /// Cancel a still-pending order by id.
    pub fn cancel(&mut self, order_id: Sequence) {
        self.broker.cancel(order_id);
    }

    fn place(&mut self, side: Side, order_type: OrderType, size: f64) -> Order {
        self.broker.place(
            self.owner_ref,
            self.market.clone(),
            side,
            order_type,
            size,
            self.default_valid_until,
            0,
            self.now,
        )
    }
}

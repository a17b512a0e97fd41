use crate::indicator::sma::Sma;
use crate::indicator::Indicator;
use crate::order::OrderType;
use crate::sizer::{FixedSizer, Sizer};
use crate::strategy::{Strategy, StrategyContext};
use cerebro_data::line::{LineBuffer, Mode};
use cerebro_data::Bar;
use cerebro_instrument::{Market, Side};
use std::cell::RefCell;
use std::rc::Rc;

/// A small single-signal strategy: long when a fast [`Sma`] crosses above a slow one, flat when
/// it crosses back below. Built directly on two owned indicator instances rather than a generic
/// signal-combinator framework.
#[derive(Debug)]
pub struct SmaCrossStrategy {
    market: Market,
    close_mirror: Rc<RefCell<LineBuffer>>,
    fast: Sma,
    slow: Sma,
    sizer: FixedSizer,
    was_fast_above: Option<bool>,
}

impl SmaCrossStrategy {
    pub fn new(market: Market, fast_period: usize, slow_period: usize, units: f64) -> Self {
        let close_mirror = Rc::new(RefCell::new(LineBuffer::new(Mode::Full, 1)));
        let fast = Sma::new(close_mirror.clone(), fast_period);
        let slow = Sma::new(close_mirror.clone(), slow_period);
        Self {
            market,
            close_mirror,
            fast,
            slow,
            sizer: FixedSizer::new(units),
            was_fast_above: None,
        }
    }

    fn mirror_current_position(&self) -> i64 {
        self.fast.lines().len() as i64 - 1
    }
}

impl Strategy for SmaCrossStrategy {
    fn minperiod(&self) -> usize {
        self.slow.lines().minperiod()
    }

    fn preload_mirror(&mut self, market: &Market, bar: &Bar) {
        if *market != self.market {
            return;
        }
        self.close_mirror.borrow_mut().forward(1);
        self.close_mirror.borrow_mut().set(0, bar.close);
        self.fast.lines_mut().forward(1);
        self.slow.lines_mut().forward(1);
    }

    fn compute_once(&mut self, start: i64, end: i64) {
        self.fast.once(start, end);
        self.slow.once(start, end);
    }

    fn rehome(&mut self) {
        self.close_mirror.borrow_mut().home();
        self.fast.lines_mut().home();
        self.slow.lines_mut().home();
    }

    fn advance_tick(&mut self) {
        self.close_mirror.borrow_mut().advance(1);
        self.fast.lines_mut().advance(1);
        self.slow.lines_mut().advance(1);
    }

    fn on_bar(&mut self, market: &Market, bar: &Bar) {
        if *market != self.market {
            return;
        }
        self.close_mirror.borrow_mut().forward(1);
        self.close_mirror.borrow_mut().set(0, bar.close);
        self.fast.lines_mut().forward(1);
        self.slow.lines_mut().forward(1);
        let at = self.mirror_current_position();
        self.fast.next(at);
        self.slow.next(at);
    }

    fn next(&mut self, ctx: &mut StrategyContext<'_>) {
        let fast = self.fast.line().get(0);
        let slow = self.slow.line().get(0);
        if fast.is_nan() || slow.is_nan() {
            return;
        }

        let fast_above = fast > slow;
        if let Some(previous) = self.was_fast_above {
            if !previous && fast_above {
                ctx.close(OrderType::Market);
                let size = self.sizer.size(Side::Buy, ctx.cash(), ctx.cash(), ctx.price());
                if size > 0.0 {
                    ctx.buy(OrderType::Market, size);
                }
            } else if previous && !fast_above {
                ctx.close(OrderType::Market);
            }
        }
        self.was_fast_above = Some(fast_above);
    }
}

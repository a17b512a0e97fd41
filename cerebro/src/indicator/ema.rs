use crate::indicator::{compose_minperiod, Indicator};
use cerebro_data::line::{LineBuffer, LineSeries, Mode};
use std::cell::RefCell;
use std::rc::Rc;

/// Exponential moving average over `source`, seeded by a simple average of the first `period`
/// values.
///
/// Unlike [`crate::indicator::sma::Sma`], an EMA's value at `at` depends on its own value at
/// `at - 1`, not just on `source`. [`Indicator::once`] therefore cannot evaluate positions out of
/// order; this type relies on the default `once` (loop over `next`), which already visits
/// positions in increasing order, to stay bit-identical with the tick-by-tick path.
#[derive(Debug, Clone)]
pub struct Ema {
    source: Rc<RefCell<LineBuffer>>,
    period: usize,
    alpha: f64,
    lines: LineSeries,
}

impl Ema {
    pub fn new(source: Rc<RefCell<LineBuffer>>, period: usize) -> Self {
        let source_minperiod = source.borrow().minperiod();
        let minperiod = compose_minperiod(&[source_minperiod], period);
        Self {
            source,
            period,
            alpha: 2.0 / (period as f64 + 1.0),
            lines: LineSeries::new(&["ema"], Mode::Full, minperiod),
        }
    }

    pub fn line(&self) -> &LineBuffer {
        self.lines.line(0)
    }

    fn seed_average(&self, at: i64) -> f64 {
        let source = self.source.borrow();
        let mut sum = 0.0;
        for k in 0..self.period as i64 {
            let v = source.get_at(at - k);
            if v.is_nan() {
                return f64::NAN;
            }
            sum += v;
        }
        sum / self.period as f64
    }
}

impl Indicator for Ema {
    fn lines(&self) -> &LineSeries {
        &self.lines
    }

    fn lines_mut(&mut self) -> &mut LineSeries {
        &mut self.lines
    }

    fn own_period(&self) -> usize {
        self.period
    }

    fn next(&mut self, at: i64) {
        let seed_position = self.period as i64 - 1;
        let value = if at < seed_position {
            f64::NAN
        } else if at == seed_position {
            self.seed_average(at)
        } else {
            let previous = self.lines.line(0).get_at(at - 1);
            let current = self.source.borrow().get_at(at);
            if previous.is_nan() || current.is_nan() {
                f64::NAN
            } else {
                self.alpha * current + (1.0 - self.alpha) * previous
            }
        };
        self.lines.line_mut(0).set_at(at, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn seeded_buffer(values: &[f64]) -> Rc<RefCell<LineBuffer>> {
        let mut buf = LineBuffer::new(Mode::Full, 1);
        for &v in values {
            buf.forward(1);
            buf.set(0, v);
        }
        Rc::new(RefCell::new(buf))
    }

    #[test]
    fn ema_seeds_from_sma_then_exponentially_smooths() {
        let source = seeded_buffer(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let mut ema = Ema::new(source, 3);
        ema.lines_mut().forward(5);
        ema.once(0, 5);

        assert!(ema.line().get_at(0).is_nan());
        assert!(ema.line().get_at(1).is_nan());
        assert_relative_eq!(ema.line().get_at(2), 2.0, epsilon = 1e-9, "seeded from sma(3) of [1,2,3]");

        let alpha = 2.0 / 4.0;
        let expected_3 = alpha * 4.0 + (1.0 - alpha) * 2.0;
        assert_relative_eq!(ema.line().get_at(3), expected_3, epsilon = 1e-9);
    }

    #[test]
    fn next_loop_and_once_produce_identical_output() {
        let source = seeded_buffer(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let mut tick_ema = Ema::new(source.clone(), 3);
        tick_ema.lines_mut().forward(6);
        for at in 0..6 {
            tick_ema.next(at);
        }

        let mut vec_ema = Ema::new(source, 3);
        vec_ema.lines_mut().forward(6);
        vec_ema.once(0, 6);

        for at in 0..6 {
            let a = tick_ema.line().get_at(at);
            let b = vec_ema.line().get_at(at);
            if a.is_nan() {
                assert!(b.is_nan());
            } else {
                assert_relative_eq!(a, b, epsilon = 1e-9);
            }
        }
    }
}

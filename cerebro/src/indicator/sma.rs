use crate::indicator::{compose_minperiod, Indicator};
use cerebro_data::line::{LineBuffer, LineSeries, Mode};
use std::cell::RefCell;
use std::rc::Rc;

/// Simple moving average over the last `period` values of `source`.
#[derive(Debug, Clone)]
pub struct Sma {
    source: Rc<RefCell<LineBuffer>>,
    period: usize,
    lines: LineSeries,
}

impl Sma {
    pub fn new(source: Rc<RefCell<LineBuffer>>, period: usize) -> Self {
        let source_minperiod = source.borrow().minperiod();
        let minperiod = compose_minperiod(&[source_minperiod], period);
        Self {
            source,
            period,
            lines: LineSeries::new(&["sma"], Mode::Full, minperiod),
        }
    }

    pub fn line(&self) -> &LineBuffer {
        self.lines.line(0)
    }

    fn eval_at(&self, at: i64) -> f64 {
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

impl Indicator for Sma {
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
        let value = self.eval_at(at);
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
    fn sma_is_average_of_trailing_window() {
        let source = seeded_buffer(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let mut sma = Sma::new(source, 3);
        sma.lines_mut().forward(5);

        for at in 0..5 {
            sma.next(at);
        }

        assert!(sma.line().get_at(0).is_nan(), "undefined before minperiod");
        assert!(sma.line().get_at(1).is_nan());
        assert_relative_eq!(sma.line().get_at(2), 2.0, epsilon = 1e-9);
        assert_relative_eq!(sma.line().get_at(3), 3.0, epsilon = 1e-9);
        assert_relative_eq!(sma.line().get_at(4), 4.0, epsilon = 1e-9);
    }

    #[test]
    fn next_and_once_produce_identical_output() {
        let source = seeded_buffer(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let mut tick_sma = Sma::new(source.clone(), 3);
        tick_sma.lines_mut().forward(6);
        for at in 0..6 {
            tick_sma.next(at);
        }

        let mut vec_sma = Sma::new(source, 3);
        vec_sma.lines_mut().forward(6);
        vec_sma.once(0, 6);

        for at in 0..6 {
            let tick_value = tick_sma.line().get_at(at);
            let vec_value = vec_sma.line().get_at(at);
            if tick_value.is_nan() {
                assert!(vec_value.is_nan());
            } else {
                assert_relative_eq!(tick_value, vec_value, epsilon = 1e-9);
            }
        }
    }
}

use crate::line::buffer::{LineBuffer, Mode};
use indexmap::IndexMap;

/// An ordered, named collection of [`LineBuffer`]s that share one logical pointer: `advance`/`forward`/`rewind`/`backward`/`home` are applied to every contained
/// line identically, so they never drift out of lockstep.
///
/// [`crate::feed::DataFeed`] implementations embed a `LineSeries` with the seven standard OHLCV
/// lines (see [`crate::line::OHLCV_LINE_NAMES`]); indicators embed one with whatever lines their
/// computation produces.
#[derive(Debug, Clone)]
pub struct LineSeries {
    names: IndexMap<String, usize>,
    lines: Vec<LineBuffer>,
}

impl LineSeries {
    /// Construct a `LineSeries` with the given line names, in order, each using `mode` and
    /// `minperiod`.
    pub fn new(names: &[&str], mode: Mode, minperiod: usize) -> Self {
        let mut indexed = IndexMap::with_capacity(names.len());
        let mut lines = Vec::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            indexed.insert((*name).to_string(), i);
            lines.push(LineBuffer::new(mode, minperiod));
        }
        Self {
            names: indexed,
            lines,
        }
    }

    pub fn line_names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }

    pub fn line(&self, index: usize) -> &LineBuffer {
        &self.lines[index]
    }

    pub fn line_mut(&mut self, index: usize) -> &mut LineBuffer {
        &mut self.lines[index]
    }

    pub fn by_name(&self, name: &str) -> Option<&LineBuffer> {
        self.names.get(name).map(|&i| &self.lines[i])
    }

    pub fn by_name_mut(&mut self, name: &str) -> Option<&mut LineBuffer> {
        let idx = *self.names.get(name)?;
        Some(&mut self.lines[idx])
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied()
    }

    pub fn num_lines(&self) -> usize {
        self.lines.len()
    }

    /// Current pointer length — identical across every contained line by construction.
    pub fn len(&self) -> usize {
        self.lines.first().map(LineBuffer::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn buflen(&self) -> usize {
        self.lines.first().map(LineBuffer::buflen).unwrap_or(0)
    }

    pub fn set_minperiod(&mut self, minperiod: usize) {
        for line in &mut self.lines {
            line.set_minperiod(minperiod);
        }
    }

    pub fn minperiod(&self) -> usize {
        self.lines.first().map(LineBuffer::minperiod).unwrap_or(1)
    }

    pub fn forward(&mut self, n: usize) {
        for line in &mut self.lines {
            line.forward(n);
        }
    }

    pub fn advance(&mut self, n: usize) {
        for line in &mut self.lines {
            line.advance(n);
        }
    }

    pub fn rewind(&mut self, n: usize) {
        for line in &mut self.lines {
            line.rewind(n);
        }
    }

    pub fn backward(&mut self, n: usize, force: bool) {
        for line in &mut self.lines {
            line.backward(n, force);
        }
    }

    pub fn home(&mut self) {
        for line in &mut self.lines {
            line.home();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_stay_in_lockstep_across_forward() {
        let mut series = LineSeries::new(&["a", "b"], Mode::Full, 1);
        series.forward(1);
        series.line_mut(0).set(0, 1.0);
        series.line_mut(1).set(0, 2.0);
        series.forward(1);
        series.line_mut(0).set(0, 3.0);
        series.line_mut(1).set(0, 4.0);

        assert_eq!(series.len(), 2);
        assert_eq!(series.by_name("a").unwrap().get(0), 3.0);
        assert_eq!(series.by_name("b").unwrap().get(0), 4.0);
        assert_eq!(series.by_name("a").unwrap().get(1), 1.0);
    }

    #[test]
    fn home_then_advance_keeps_lines_synchronised() {
        let mut series = LineSeries::new(&["close"], Mode::Full, 1);
        for v in [1.0, 2.0, 3.0] {
            series.forward(1);
            series.line_mut(0).set(0, v);
        }
        series.home();
        series.advance(2);
        assert_eq!(series.len(), 2);
        assert_eq!(series.by_name("close").unwrap().get(0), 2.0);
    }
}

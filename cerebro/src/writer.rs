use cerebro_integration::datetime::NumericDate;

/// A sink for one row of run output per tick — equity curve, per-bar indicator values, whatever a
/// caller wants persisted as the engine runs.
///
/// The engine only depends on this trait, never a concrete file format — CSV/parquet/DB adapters
/// live outside the core and implement it.
pub trait Writer {
    fn write_row(&mut self, at: NumericDate, row: &[(&str, String)]);
    fn flush(&mut self) {}
}

/// An in-memory [`Writer`] that just accumulates rows, used by tests and by callers that want the
/// output back as a value rather than on disk.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    rows: Vec<(NumericDate, Vec<(String, String)>)>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[(NumericDate, Vec<(String, String)>)] {
        &self.rows
    }
}

impl Writer for MemoryWriter {
    fn write_row(&mut self, at: NumericDate, row: &[(&str, String)]) {
        self.rows.push((
            at,
            row.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_writer_accumulates_rows_in_order() {
        let mut writer = MemoryWriter::new();
        writer.write_row(0.0, &[("close", "10".to_string())]);
        writer.write_row(1.0, &[("close", "11".to_string())]);

        assert_eq!(writer.rows().len(), 2);
        assert_eq!(writer.rows()[1].0, 1.0);
        assert_eq!(writer.rows()[1].1[0], ("close".to_string(), "11".to_string()));
    }
}

use crate::error::DataError;
use serde::{Deserialize, Serialize};

/// Memory-management policy for a [`LineBuffer`].
///
/// `Full` keeps every value ever written (the default for backtests, where the whole line is
/// useful for later analysis). `Bounded`/`Extended` trim the oldest values once the buffer grows
/// past `window`, trading the ability to read far into the past for a flat memory footprint on
/// long live runs.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum Mode {
    /// Keep every value; `buflen()` grows without bound.
    Full,
    /// Ring of at least `window` slots (must be `>= minperiod`).
    Bounded { window: usize },
    /// Ring of `window` slots plus headroom for forward (preload) peeking.
    Extended { window: usize },
}

impl Mode {
    fn window(&self) -> Option<usize> {
        match self {
            Mode::Full => None,
            Mode::Bounded { window } | Mode::Extended { window } => Some(*window),
        }
    }
}

/// An append-only numeric column with time-indexed reverse (and, when preloaded, forward) access.
///
/// `idx` is the *logical* read position: `get(0)` reads the value at `idx`, `get(k)` for `k > 0`
/// reads `k` steps into the past, and (once preloaded ahead of `idx`) `get(-k)` peeks `k` steps
/// into the future. Values logically older than the retained window, or not yet written, read as
/// `NaN` through [`LineBuffer::get`]; [`LineBuffer::get_strict`] reports [`DataError::OutOfRange`]
/// instead, for call sites (e.g. the broker's order-expiry check) that must distinguish "no
/// value" from "out of range".
#[derive(Debug, Clone)]
pub struct LineBuffer {
    storage: Vec<f64>,
    /// Logical index of `storage[0]`; increases as `Bounded`/`Extended` buffers trim their front.
    base: i64,
    /// Current logical pointer. `-1` before the first `forward()`; `home()` resets here.
    idx: i64,
    minperiod: usize,
    mode: Mode,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new(Mode::Full, 1)
    }
}

impl LineBuffer {
    pub fn new(mode: Mode, minperiod: usize) -> Self {
        Self {
            storage: Vec::new(),
            base: 0,
            idx: -1,
            minperiod: minperiod.max(1),
            mode,
        }
    }

    pub fn minperiod(&self) -> usize {
        self.minperiod
    }

    pub fn set_minperiod(&mut self, minperiod: usize) {
        self.minperiod = minperiod.max(1);
    }

    /// Current pointer length: `idx + 1`, clamped to zero before the first bar.
    pub fn len(&self) -> usize {
        (self.idx + 1).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Underlying storage length: `>= len()` once preloaded.
    pub fn buflen(&self) -> usize {
        (self.base + self.storage.len() as i64).max(0) as usize
    }

    /// `true` once `len() >= minperiod()`, ie/ the value at `get(0)` is well-defined.
    pub fn past_minperiod(&self) -> bool {
        self.len() >= self.minperiod
    }

    fn logical_of(&self, ago: i64) -> i64 {
        self.idx - ago
    }

    fn slot(&self, logical: i64) -> Option<usize> {
        if logical < self.base || logical >= self.base + self.storage.len() as i64 {
            None
        } else {
            Some((logical - self.base) as usize)
        }
    }

    /// Read the value `ago` steps behind the pointer (`ago = 0` is current, `ago > 0` is history,
    /// `ago < 0` peeks ahead of the pointer when preloaded). Out-of-range reads return `NaN`.
    pub fn get(&self, ago: i64) -> f64 {
        self.get_strict(ago).unwrap_or(f64::NAN)
    }

    /// As [`LineBuffer::get`], but reports [`DataError::OutOfRange`] instead of substituting
    /// `NaN` — used by call sites (e.g. order expiry) that must not silently treat "unreachable"
    /// the same as "not-a-number".
    pub fn get_strict(&self, ago: i64) -> Result<f64, DataError> {
        let logical = self.logical_of(ago);
        match self.slot(logical) {
            Some(slot) => Ok(self.storage[slot]),
            None => Err(DataError::OutOfRange {
                index: logical,
                len: self.buflen(),
            }),
        }
    }

    /// Overwrite the value `ago` steps behind the pointer. The slot must already be allocated
    /// (via a prior [`LineBuffer::forward`]).
    pub fn set(&mut self, ago: i64, value: f64) {
        let logical = self.logical_of(ago);
        if let Some(slot) = self.slot(logical) {
            self.storage[slot] = value;
        }
    }

    /// Read the value at an absolute logical position, independent of the current pointer.
    ///
    /// This is what lets [`crate::line::ops::LineOp`] produce bit-identical output whether it is
    /// driven tick-by-tick (`next`, which always evaluates at the pointer's current position) or
    /// vectorized (`once`, which evaluates every position in a range) — both paths bottom out in
    /// the same `get_at`/`set_at` calls.
    pub fn get_at(&self, absolute: i64) -> f64 {
        self.slot(absolute)
            .map(|slot| self.storage[slot])
            .unwrap_or(f64::NAN)
    }

    /// Overwrite the value at an absolute logical position. The slot must already be allocated.
    pub fn set_at(&mut self, absolute: i64, value: f64) {
        if let Some(slot) = self.slot(absolute) {
            self.storage[slot] = value;
        }
    }

    /// Allocate `n` new (NaN) slots and move the pointer forward by `n`.
    pub fn forward(&mut self, n: usize) {
        for _ in 0..n {
            self.storage.push(f64::NAN);
        }
        self.idx += n as i64;
        self.compact();
    }

    /// Move the pointer forward by `n` without allocating (used once preloaded). Clamped so the
    /// pointer never runs past the last allocated slot.
    pub fn advance(&mut self, n: usize) {
        let max_idx = self.base + self.storage.len() as i64 - 1;
        self.idx = (self.idx + n as i64).min(max_idx);
    }

    /// Move the pointer back by `n` without deallocating (inverse of [`LineBuffer::advance`]).
    pub fn rewind(&mut self, n: usize) {
        self.idx = (self.idx - n as i64).max(self.base - 1);
    }

    /// Deallocate the last `n` slots and move the pointer back by `n` (inverse of
    /// [`LineBuffer::forward`]); used by the resampler to retract a bar it folded into an
    /// aggregate. `force = true` permits retracting below `minperiod`, which
    /// would otherwise be refused since it would leave the line without a well-defined current
    /// value for any already-dependent indicator.
    pub fn backward(&mut self, n: usize, force: bool) {
        let allowed = if force {
            n
        } else {
            n.min(self.len().saturating_sub(self.minperiod.saturating_sub(1)))
        };
        for _ in 0..allowed.min(self.storage.len()) {
            self.storage.pop();
        }
        self.idx = (self.idx - allowed as i64).max(self.base - 1);
    }

    /// Reset the pointer to before the first bar, without touching storage.
    pub fn home(&mut self) {
        self.idx = self.base - 1;
    }

    /// Trim the front of the buffer once it exceeds its `Mode`'s window, advancing `base`
    /// accordingly. A no-op in `Mode::Full`.
    fn compact(&mut self) {
        let Some(window) = self.mode.window() else {
            return;
        };
        let excess = self.storage.len().saturating_sub(window);
        if excess == 0 {
            return;
        }
        self.storage.drain(0..excess);
        self.base += excess as i64;
    }
}

use crate::error::Error;
use std::ops::{Range, RangeFrom, RangeFull, RangeTo};

///
/// Slice
///
/// `(start, stop, step)` with every bound optional: start defaults to 0,
/// stop to the current length, step to 1. Negative bounds normalize by
/// adding the length (repeatedly while still negative). A normalized
/// `start >= stop` yields an empty selection, never an error.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Slice {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: Option<i64>,
}

impl Slice {
    #[must_use]
    pub const fn new(start: Option<i64>, stop: Option<i64>) -> Self {
        Self {
            start,
            stop,
            step: None,
        }
    }

    #[must_use]
    pub const fn full() -> Self {
        Self {
            start: None,
            stop: None,
            step: None,
        }
    }

    #[must_use]
    pub const fn step(mut self, step: i64) -> Self {
        self.step = Some(step);
        self
    }

    pub(crate) fn normalize(self, len: usize) -> Result<NormalSlice, Error> {
        let step = self.step.unwrap_or(1);
        if step < 1 {
            return Err(Error::type_mismatch(format!(
                "slice step must be a positive integer, got {step}"
            )));
        }

        let n = len as i64;
        let start = wrap(self.start.unwrap_or(0), n).min(n);
        let stop = wrap(self.stop.unwrap_or(n), n).min(n);

        Ok(NormalSlice {
            start: start as usize,
            stop: stop as usize,
            step: step as usize,
        })
    }
}

fn wrap(bound: i64, n: i64) -> i64 {
    if bound >= 0 {
        bound
    } else if n == 0 {
        0
    } else {
        // Same result as adding n until non-negative, in constant time.
        bound.rem_euclid(n)
    }
}

impl From<Range<i64>> for Slice {
    fn from(range: Range<i64>) -> Self {
        Self::new(Some(range.start), Some(range.end))
    }
}

impl From<RangeFrom<i64>> for Slice {
    fn from(range: RangeFrom<i64>) -> Self {
        Self::new(Some(range.start), None)
    }
}

impl From<RangeTo<i64>> for Slice {
    fn from(range: RangeTo<i64>) -> Self {
        Self::new(None, Some(range.end))
    }
}

impl From<RangeFull> for Slice {
    fn from(_: RangeFull) -> Self {
        Self::full()
    }
}

///
/// NormalSlice
///
/// A slice resolved against a concrete length: `start <= stop <= len`,
/// `step >= 1`.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct NormalSlice {
    pub(crate) start: usize,
    pub(crate) stop: usize,
    pub(crate) step: usize,
}

impl NormalSlice {
    pub(crate) const fn is_empty(&self) -> bool {
        self.start >= self.stop
    }

    /// Selected positions in ascending order.
    pub(crate) fn positions(&self) -> impl Iterator<Item = usize> + use<> {
        (self.start..self.stop).step_by(self.step)
    }
}

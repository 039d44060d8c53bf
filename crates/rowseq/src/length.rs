///
/// LengthMode
///
/// How a binding tracks row count. `Cached` keeps an incrementally-updated
/// counter and is only sound with a single mutating agent; `Live` recounts
/// on every call, which removes counter staleness but not the
/// count-then-act window between cooperating sessions.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LengthMode {
    #[default]
    Cached,
    Live,
}

///
/// LengthState
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum LengthState {
    Cached(usize),
    Live,
}

impl LengthState {
    pub(crate) const fn prime(mode: LengthMode, count: usize) -> Self {
        match mode {
            LengthMode::Cached => Self::Cached(count),
            LengthMode::Live => Self::Live,
        }
    }

    /// Stored counter, if this binding caches one.
    pub(crate) const fn stored(&self) -> Option<usize> {
        match self {
            Self::Cached(count) => Some(*count),
            Self::Live => None,
        }
    }

    pub(crate) const fn record_insert(&mut self) {
        if let Self::Cached(count) = self {
            *count += 1;
        }
    }

    pub(crate) const fn record_delete(&mut self, removed: usize) {
        if let Self::Cached(count) = self {
            *count = count.saturating_sub(removed);
        }
    }

    /// Replace a cached counter with a fresh live count, e.g. after a
    /// rollback discarded staged mutations.
    pub(crate) const fn reprime(&mut self, count: usize) {
        if let Self::Cached(stored) = self {
            *stored = count;
        }
    }
}

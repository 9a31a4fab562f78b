//! Sequence model.

/// A database sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sequence {
    /// Sequence name.
    pub name: String,
    /// `START WITH`.
    pub start: Option<i64>,
    /// `INCREMENT BY`.
    pub increment: Option<i64>,
    /// `MINVALUE`.
    pub min_value: Option<i64>,
    /// `MAXVALUE`, clamped to the dialect's limit when rendered.
    pub max_value: Option<i64>,
    /// `CYCLE` / `NO CYCLE`.
    pub cycle: Option<bool>,
    /// `CACHE`.
    pub cache: Option<i64>,
}

impl Sequence {
    /// A sequence with no explicit parameters.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: String::from(name),
            start: None,
            increment: None,
            min_value: None,
            max_value: None,
            cycle: None,
            cache: None,
        }
    }

    /// The sequence generated for an auto-increment column.
    #[must_use]
    pub fn auto_increment(name: &str) -> Self {
        Self {
            start: Some(1),
            increment: Some(1),
            min_value: Some(1),
            max_value: Some(i64::MAX),
            ..Self::new(name)
        }
    }

    /// Sets `START WITH`.
    #[must_use]
    pub const fn start(mut self, start: i64) -> Self {
        self.start = Some(start);
        self
    }

    /// Sets `INCREMENT BY`.
    #[must_use]
    pub const fn increment(mut self, increment: i64) -> Self {
        self.increment = Some(increment);
        self
    }

    /// Sets `MINVALUE`.
    #[must_use]
    pub const fn min_value(mut self, min: i64) -> Self {
        self.min_value = Some(min);
        self
    }

    /// Sets `MAXVALUE`.
    #[must_use]
    pub const fn max_value(mut self, max: i64) -> Self {
        self.max_value = Some(max);
        self
    }

    /// Sets `CYCLE`.
    #[must_use]
    pub const fn cycle(mut self, cycle: bool) -> Self {
        self.cycle = Some(cycle);
        self
    }

    /// Sets `CACHE`.
    #[must_use]
    pub const fn cache(mut self, cache: i64) -> Self {
        self.cache = Some(cache);
        self
    }
}

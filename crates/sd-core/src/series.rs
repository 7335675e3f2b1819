/// Spans narrower than this normalize to 0.
pub const ALMOST_ZERO: f64 = 1e-10;

/// The logged history of one equation together with the running range used
/// to normalize it for display.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    values: Vec<f64>,
    min: f64,
    max: f64,
}

impl Series {
    /// Start an empty series. Both range bounds start unset.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// Fold a value into the running range without logging it.
    pub fn observe(&mut self, value: f64) {
        if value > self.max {
            self.max = value;
        }
        if value < self.min {
            self.min = value;
        }
    }

    /// Append a value and fold it into the running range.
    pub fn push(&mut self, value: f64) {
        self.values.push(value);
        self.observe(value);
    }

    /// Logged values, oldest first.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of logged values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if nothing has been logged yet.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Smallest value seen, if any.
    pub fn min(&self) -> Option<f64> {
        self.min.is_finite().then_some(self.min)
    }

    /// Largest value seen, if any.
    pub fn max(&self) -> Option<f64> {
        self.max.is_finite().then_some(self.max)
    }

    /// Map `value` into `[0, 1]` relative to the running range.
    ///
    /// Degenerates to 0 while the range is unset or narrower than
    /// [`ALMOST_ZERO`].
    pub fn normalize(&self, value: f64) -> f64 {
        match self.span() {
            Some(span) => (value - self.min) / span,
            None => 0.0,
        }
    }

    /// Width of the running range, or `None` when normalization degenerates.
    pub(crate) fn span(&self) -> Option<f64> {
        let (min, max) = (self.min()?, self.max()?);
        let span = max - min;
        (span.abs() >= ALMOST_ZERO).then_some(span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn new_series_is_unset() {
        let series = Series::with_capacity(4);
        assert!(series.is_empty());
        assert_eq!(series.min(), None);
        assert_eq!(series.max(), None);
        assert_eq!(series.normalize(42.0), 0.0);
    }

    #[test]
    fn flat_series_normalizes_to_zero() {
        let mut series = Series::with_capacity(4);
        series.push(5.0);
        series.push(5.0);
        assert_eq!(series.normalize(5.0), 0.0);
    }

    #[test]
    fn range_tracks_extremes() {
        let mut series = Series::with_capacity(4);
        series.push(3.0);
        series.observe(-1.0);
        series.push(7.0);
        assert_eq!(series.values(), &[3.0, 7.0]);
        assert_eq!(series.min(), Some(-1.0));
        assert_eq!(series.max(), Some(7.0));
        assert!((series.normalize(3.0) - 0.5).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn logged_values_normalize_into_unit_interval(
            values in prop::collection::vec(-1e6f64..1e6, 1..64)
        ) {
            let mut series = Series::with_capacity(values.len());
            for v in &values {
                series.push(*v);
            }
            for v in series.values() {
                let n = series.normalize(*v);
                prop_assert!((0.0..=1.0).contains(&n), "normalized {v} to {n}");
            }
        }
    }
}

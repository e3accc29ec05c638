//! Min/max fold shared by every domain computation.

use crate::domain::{Domain, Metric, Record};
use crate::error::PipelineError;

/// Running `(min, max)` accumulator.
///
/// Starts at `(+inf, -inf)`; [`MinMax::finish`] refuses to hand those
/// sentinels to a caller.
#[derive(Debug, Clone, Copy)]
pub struct MinMax {
    min: f64,
    max: f64,
}

impl Default for MinMax {
    fn default() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl MinMax {
    pub fn push(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// `None` until at least one value has been pushed.
    pub fn finish(self) -> Option<Domain> {
        if self.min.is_finite() && self.max.is_finite() {
            Some(Domain {
                min: self.min,
                max: self.max,
            })
        } else {
            None
        }
    }
}

/// Read `metric` from `record`, rejecting missing and non-finite values.
pub fn require_metric<R: Record + ?Sized>(record: &R, metric: Metric) -> Result<f64, PipelineError> {
    match record.metric(metric) {
        Some(v) if v.is_finite() => Ok(v),
        Some(v) => Err(PipelineError::invalid_record(metric.column(), v.to_string())),
        None => Err(PipelineError::invalid_record(
            metric.column(),
            format!("<missing> (entity '{}')", record.name()),
        )),
    }
}

/// Left fold of `metric` over `records` into a [`Domain`].
///
/// `dataset` only labels the `EmptyDataset` error.
pub fn fold_domain<R: Record>(records: &[R], metric: Metric, dataset: &str) -> Result<Domain, PipelineError> {
    let mut acc = MinMax::default();
    for record in records {
        acc.push(require_metric(record, metric)?);
    }
    acc.finish().ok_or_else(|| PipelineError::empty(dataset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AggregateRow;

    fn row(name: &str, del: Option<f64>) -> AggregateRow {
        AggregateRow {
            name: name.to_string(),
            mean_del: del,
            mean_npa: None,
        }
    }

    #[test]
    fn empty_accumulator_yields_no_domain() {
        assert!(MinMax::default().finish().is_none());
    }

    #[test]
    fn single_value_domain_is_degenerate() {
        let d = fold_domain(&[row("AL", Some(2.5))], Metric::MeanDel, "t").unwrap();
        assert_eq!(d.min, 2.5);
        assert_eq!(d.max, 2.5);
    }

    #[test]
    fn missing_metric_is_invalid_record() {
        let err = fold_domain(&[row("AL", Some(1.0)), row("AK", None)], Metric::MeanDel, "t").unwrap_err();
        match err {
            PipelineError::InvalidRecord { field, raw_value, .. } => {
                assert_eq!(field, "mean_del");
                assert!(raw_value.contains("AK"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn nan_is_rejected_instead_of_propagated() {
        let err = fold_domain(&[row("AL", Some(f64::NAN))], Metric::MeanDel, "t").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRecord { .. }));
    }
}

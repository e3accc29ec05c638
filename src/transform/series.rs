//! Time-series grouping: dated observations -> per-entity series + domains.

use crate::domain::{Domain, Metric, Record, SeriesGroup, TimeDomain, TimedRow};
use crate::error::PipelineError;
use crate::transform::fold::fold_domain;

/// Group `records` by `key`, preserving input order inside each group.
pub fn group_by<R, F>(records: &[R], key: F) -> SeriesGroup<R>
where
    R: Clone,
    F: Fn(&R) -> &str,
{
    let mut groups = SeriesGroup::default();
    for record in records {
        groups.push(key(record), record.clone());
    }
    groups
}

/// Earliest and latest observation, compared by epoch time.
///
/// Comparisons are strict, so on equal timestamps the first-seen date
/// string is kept.
pub fn time_domain(records: &[TimedRow]) -> Result<TimeDomain, PipelineError> {
    let mut iter = records.iter();
    let first = iter.next().ok_or_else(|| PipelineError::empty("time series"))?;

    let mut domain = TimeDomain {
        min: first.date_raw.clone(),
        max: first.date_raw.clone(),
        min_epoch_ms: first.epoch_ms(),
        max_epoch_ms: first.epoch_ms(),
    };

    for row in iter {
        let t = row.epoch_ms();
        if t < domain.min_epoch_ms {
            domain.min_epoch_ms = t;
            domain.min = row.date_raw.clone();
        }
        if t > domain.max_epoch_ms {
            domain.max_epoch_ms = t;
            domain.max = row.date_raw.clone();
        }
    }

    Ok(domain)
}

/// `[min, max]` of `metric` over a time series.
pub fn value_domain<R: Record>(records: &[R], metric: Metric) -> Result<Domain, PipelineError> {
    fold_domain(records, metric, &format!("time series ({})", metric.column()))
}

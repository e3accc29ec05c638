//! Aggregate join: per-entity tables -> name lookups + color domain.
//!
//! One table row per entity is the expected shape. When a name repeats, the
//! later row wins and the name is reported (logged + kept on the `Lookup`),
//! since a repeated name may be a data error or an intentional override.

use std::collections::{HashMap, HashSet};

use crate::domain::{Domain, Lookup, Metric, Record};
use crate::error::PipelineError;
use crate::transform::fold::{fold_domain, require_metric};

/// `[min, max]` of `metric` over `records`.
///
/// Fails with `InvalidRecord` on the first missing/non-finite value and with
/// `EmptyDataset` when `records` is empty.
pub fn compute_domain<R: Record>(records: &[R], metric: Metric) -> Result<Domain, PipelineError> {
    fold_domain(records, metric, metric.column())
}

/// Fold `records` into `name -> metric` (last write wins).
pub fn build_lookup<R: Record>(records: &[R], metric: Metric) -> Result<Lookup, PipelineError> {
    let mut values = HashMap::with_capacity(records.len());
    let mut duplicates = Vec::new();
    let mut reported = HashSet::new();

    for record in records {
        let value = require_metric(record, metric)?;
        let name = record.name();
        if values.insert(name.to_string(), value).is_some() && reported.insert(name.to_string()) {
            tracing::warn!(entity = name, metric = %metric, "duplicate entity name; later row overrides earlier value");
            duplicates.push(name.to_string());
        }
    }

    Ok(Lookup { values, duplicates })
}

/// How well a set of geometry names is covered by a lookup.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JoinCoverage {
    pub matched: usize,
    /// Geometry names with no lookup value, in input order.
    pub unmatched: Vec<String>,
}

pub fn join_coverage<'a>(names: impl IntoIterator<Item = &'a str>, lookup: &Lookup) -> JoinCoverage {
    let mut coverage = JoinCoverage::default();
    for name in names {
        if lookup.get(name).is_some() {
            coverage.matched += 1;
        } else {
            coverage.unmatched.push(name.to_string());
        }
    }
    coverage
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AggregateRow;

    fn del(name: &str, v: f64) -> AggregateRow {
        AggregateRow {
            name: name.to_string(),
            mean_del: Some(v),
            mean_npa: None,
        }
    }

    #[test]
    fn domain_endpoints_are_observed_values() {
        let rows = vec![del("AL", 2.0), del("AK", 4.0), del("AZ", 3.1)];
        let d = compute_domain(&rows, Metric::MeanDel).unwrap();
        assert!(d.min <= d.max);
        assert!(rows.iter().any(|r| r.mean_del == Some(d.min)));
        assert!(rows.iter().any(|r| r.mean_del == Some(d.max)));
        assert_eq!((d.min, d.max), (2.0, 4.0));
    }

    #[test]
    fn empty_domain_is_an_error() {
        let rows: Vec<AggregateRow> = Vec::new();
        let err = compute_domain(&rows, Metric::MeanDel).unwrap_err();
        assert_eq!(err, PipelineError::empty("mean_del"));
    }

    #[test]
    fn lookup_has_one_entry_per_unique_name() {
        let rows = vec![del("AL", 2.0), del("AK", 4.0)];
        let lookup = build_lookup(&rows, Metric::MeanDel).unwrap();
        assert_eq!(lookup.len(), 2);
        for r in &rows {
            assert_eq!(lookup.get(&r.name), r.mean_del);
        }
        assert!(lookup.duplicates.is_empty());
    }

    #[test]
    fn lookup_last_duplicate_wins_and_is_reported() {
        let rows = vec![del("AL", 2.0), del("AL", 5.0), del("AK", 4.0), del("AL", 7.0)];
        let lookup = build_lookup(&rows, Metric::MeanDel).unwrap();
        assert_eq!(lookup.len(), 2);
        assert_eq!(lookup.get("AL"), Some(7.0));
        assert_eq!(lookup.duplicates, vec!["AL".to_string()]);
    }

    #[test]
    fn lookup_rejects_rows_without_the_metric() {
        let rows = vec![del("AL", 2.0)];
        let err = build_lookup(&rows, Metric::MeanNpa).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRecord { ref field, .. } if field == "mean_npa"));
    }

    #[test]
    fn coverage_lists_unmatched_features() {
        let lookup = build_lookup(&[del("AL", 1.0)], Metric::MeanDel).unwrap();
        let cov = join_coverage(["AL", "AK"], &lookup);
        assert_eq!(cov.matched, 1);
        assert_eq!(cov.unmatched, vec!["AK".to_string()]);
    }
}

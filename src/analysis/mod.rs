//! Analysis modules.
//!
//! Classification, region partitioning and per-region aggregation.

pub mod aggregator;
pub mod classifier;
pub mod partition;

pub use aggregator::*;
pub use classifier::{RecordClassifier, RowIssue};
pub use partition::{partition_records, PartitionSet};

use crate::models::{RawRow, RegionOutcome};
use chrono::NaiveDate;
use tracing::{info, warn};

/// Settings for one pipeline pass.
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub as_of: NaiveDate,
    pub min_age_days: i64,
    pub aggregate: AggregateOptions,
}

/// Everything a run produces before rendering.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub rows_read: usize,
    pub issues: Vec<RowIssue>,
    pub partitions: PartitionSet,
    pub outcomes: Vec<RegionOutcome>,
}

impl PipelineOutput {
    pub fn rows_retained(&self) -> usize {
        self.partitions.total_records()
    }
}

/// Classify, partition and summarize a batch of rows.
pub fn run_pipeline(rows: &[RawRow], options: &PipelineOptions) -> PipelineOutput {
    let classifier = RecordClassifier::new(options.as_of, options.min_age_days);
    let batch = classifier.classify(rows);

    if !batch.issues.is_empty() {
        warn!(
            "{} row(s) had an empty or unparsable creation date and were excluded",
            batch.issues.len()
        );
    }
    info!(
        "Classified {} rows: {} retained, {} excluded by the {}-day filter",
        batch.rows_read,
        batch.records.len(),
        batch.excluded,
        options.min_age_days
    );

    let partitions = partition_records(batch.records);
    let outcomes = partitions
        .iter()
        .map(|p| RegionOutcome {
            region: p.region,
            summary: summarize(p, options.as_of, options.aggregate),
        })
        .collect();

    PipelineOutput {
        rows_read: batch.rows_read,
        issues: batch.issues,
        partitions,
        outcomes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Region;

    fn row(ext: &str, created: &str, reason: &str) -> RawRow {
        RawRow {
            created_on: Some(created.to_string()),
            external_id: Some(ext.to_string()),
            reason: Some(reason.to_string()),
            process_status: Some("Open".to_string()),
            material_number: Some("M1234".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_run_pipeline_without_germany_rows() {
        let options = PipelineOptions {
            as_of: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            min_age_days: 10,
            aggregate: AggregateOptions::default(),
        };
        let rows = vec![
            row("7001", "2024-03-01", "Credit"),
            row("7002", "2024-03-30", "Credit"),
            row("7003", "garbage", "Credit"),
        ];

        let output = run_pipeline(&rows, &options);

        assert_eq!(output.rows_read, 3);
        assert_eq!(output.rows_retained(), 1);
        assert_eq!(output.issues.len(), 1);
        assert!(output.partitions.germany.is_empty());
        assert_eq!(output.outcomes.len(), 2);
        assert_eq!(output.outcomes[0].region, Region::Usa);
        assert!(output.outcomes[0].summary.is_some());
        assert_eq!(output.outcomes[1].region, Region::Germany);
        assert!(output.outcomes[1].summary.is_none());
    }
}

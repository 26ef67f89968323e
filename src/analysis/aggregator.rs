//! Per-region aggregation and statistics.
//!
//! Every view here reads a [`Partition`] and builds a new value; none of
//! them touch the records. Display-only derivations (bucket labels, model
//! prefixes) stay inside the returned summaries.

use crate::models::{
    AgeBucket, BucketReasonCount, HeadlineMetrics, ModelReasonMatrix, Partition, ReasonCount,
    Record, RegionSummary, StatusShare, TopAgingRow, WeeklyTrendPoint,
};
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Knobs for the summary views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateOptions {
    /// Rows in the top-aging table.
    pub top_n: usize,
    /// Characters of the material number used as the model key.
    pub model_prefix_len: usize,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            top_n: 10,
            model_prefix_len: 4,
        }
    }
}

/// Build every summary view for a partition. Empty partitions yield `None`.
pub fn summarize(
    partition: &Partition,
    as_of: NaiveDate,
    options: AggregateOptions,
) -> Option<RegionSummary> {
    if partition.is_empty() {
        return None;
    }

    Some(RegionSummary {
        region: partition.region,
        headline: headline_metrics(partition, as_of),
        weekly_trend: weekly_trend(partition),
        bucket_reasons: bucket_reason_counts(partition),
        reasons: reason_counts(partition),
        statuses: status_shares(partition),
        top_aging: top_aging(partition, options.top_n),
        model_matrix: model_reason_matrix(partition, options.model_prefix_len),
    })
}

/// `count / total * 100` to one decimal, zero for an empty total.
pub fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round1(count as f64 / total as f64 * 100.0)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Totals, aging shares, closures this month and average age.
pub fn headline_metrics(partition: &Partition, as_of: NaiveDate) -> HeadlineMetrics {
    let total = partition.len();
    let over_30 = partition.records().filter(|r| r.days_open() > 30).count();
    let over_60 = partition.records().filter(|r| r.days_open() > 60).count();
    let closed_this_month = partition
        .records()
        .filter(|r| created_in_month_of(r, as_of) && is_closed(&r.process_status))
        .count();

    let average_age = if total == 0 {
        0.0
    } else {
        let sum: i64 = partition.records().map(Record::days_open).sum();
        round1(sum as f64 / total as f64)
    };

    HeadlineMetrics {
        total,
        over_30,
        over_30_pct: percentage(over_30, total),
        over_60,
        over_60_pct: percentage(over_60, total),
        closed_this_month,
        average_age,
    }
}

fn created_in_month_of(record: &Record, as_of: NaiveDate) -> bool {
    record
        .created_on
        .map(|d| d.month() == as_of.month() && d.year() == as_of.year())
        .unwrap_or(false)
}

fn is_closed(status: &str) -> bool {
    let status = status.to_lowercase();
    status.contains("closed") || status.contains("completed")
}

/// Monday that starts the ISO week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Weekly counts by creation week, oldest week first.
pub fn weekly_trend(partition: &Partition) -> Vec<WeeklyTrendPoint> {
    let mut weeks: BTreeMap<NaiveDate, WeeklyTrendPoint> = BTreeMap::new();

    for record in partition.records() {
        let Some(created) = record.created_on else {
            continue;
        };
        let start = week_start(created.date());
        let point = weeks.entry(start).or_insert_with(|| WeeklyTrendPoint {
            week_start: start,
            total: 0,
            over_30: 0,
            over_60: 0,
        });
        point.total += 1;
        if record.days_open() > 30 {
            point.over_30 += 1;
        }
        if record.days_open() > 60 {
            point.over_60 += 1;
        }
    }

    weeks.into_values().collect()
}

/// Counts per (age bucket, reason), buckets in order and reasons sorted.
pub fn bucket_reason_counts(partition: &Partition) -> Vec<BucketReasonCount> {
    let mut counts: BTreeMap<(AgeBucket, String), usize> = BTreeMap::new();

    for record in partition.records() {
        if let Some(bucket) = AgeBucket::from_days(record.days_open()) {
            *counts
                .entry((bucket, record.reason_code.as_str().to_string()))
                .or_default() += 1;
        }
    }

    counts
        .into_iter()
        .map(|((bucket, reason), count)| BucketReasonCount {
            bucket,
            reason,
            count,
        })
        .collect()
}

/// Records per reason, most frequent first. Ties keep first appearance.
pub fn reason_counts(partition: &Partition) -> Vec<ReasonCount> {
    counts_in_first_seen_order(partition.records().map(|r| r.reason_code.as_str()))
        .into_iter()
        .map(|(reason, count)| ReasonCount { reason, count })
        .collect()
}

/// Records per process status with share of the partition total.
///
/// Blank statuses are left out of the histogram.
pub fn status_shares(partition: &Partition) -> Vec<StatusShare> {
    let total = partition.len();
    counts_in_first_seen_order(
        partition
            .records()
            .map(|r| r.process_status.as_str())
            .filter(|s| !s.is_empty()),
    )
    .into_iter()
    .map(|(status, count)| StatusShare {
        status,
        count,
        percent: percentage(count, total),
    })
    .collect()
}

fn counts_in_first_seen_order<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for key in keys {
        let count = counts.entry(key).or_insert_with(|| {
            order.push(key);
            0
        });
        *count += 1;
    }

    let mut ranked: Vec<(String, usize)> = order
        .into_iter()
        .map(|key| (key.to_string(), counts[key]))
        .collect();
    ranked.sort_by_key(|(_, count)| std::cmp::Reverse(*count));
    ranked
}

/// The `n` oldest records. The partition is already sorted oldest first.
pub fn top_aging(partition: &Partition, n: usize) -> Vec<TopAgingRow> {
    partition
        .records()
        .take(n)
        .map(|r| TopAgingRow {
            delivery_no: r.delivery_no.clone(),
            created_on: r.created_on_iso(),
            days_open: r.days_open(),
            material: r.material_number.clone(),
            customer_ref: r.customer_ref.clone(),
            reason: r.reason_code.as_str().to_string(),
        })
        .collect()
}

/// Leading `len` characters of a material number.
pub fn model_key(material_number: &str, len: usize) -> String {
    material_number.chars().take(len).collect()
}

/// Model x reason cross-tab, zero-filled, keys sorted.
pub fn model_reason_matrix(partition: &Partition, prefix_len: usize) -> ModelReasonMatrix {
    let mut pairs: HashMap<(String, String), usize> = HashMap::new();
    let mut models: BTreeSet<String> = BTreeSet::new();
    let mut reasons: BTreeSet<String> = BTreeSet::new();

    for record in partition.records() {
        let model = model_key(&record.material_number, prefix_len);
        let reason = record.reason_code.as_str().to_string();
        models.insert(model.clone());
        reasons.insert(reason.clone());
        *pairs.entry((model, reason)).or_default() += 1;
    }

    let models: Vec<String> = models.into_iter().collect();
    let reasons: Vec<String> = reasons.into_iter().collect();
    let counts = models
        .iter()
        .map(|m| {
            reasons
                .iter()
                .map(|r| pairs.get(&(m.clone(), r.clone())).copied().unwrap_or(0))
                .collect()
        })
        .collect();

    ModelReasonMatrix {
        models,
        reasons,
        counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExternalId, PartitionRow, ReasonCode, Region};
    use chrono::NaiveDateTime;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()
    }

    fn created(age: i64) -> NaiveDateTime {
        (as_of() - Duration::days(age)).and_hms_opt(0, 0, 0).unwrap()
    }

    fn record(age: i64, reason: &str, status: &str, material: &str) -> Record {
        Record {
            external_id: ExternalId::Delivery("7001".to_string()),
            created_on: Some(created(age)),
            age_days: Some(age),
            region: Region::Usa,
            reason_code: if reason.is_empty() {
                ReasonCode::DefaultSentinel
            } else {
                ReasonCode::Given(reason.to_string())
            },
            process_status: status.to_string(),
            delivery_no: format!("D{}", age),
            customer_ref: "CR".to_string(),
            material_number: material.to_string(),
            material_description: String::new(),
            quantity: "1".to_string(),
            model_series: String::new(),
        }
    }

    /// Build a partition the way the partitioner would: oldest first.
    fn partition(mut records: Vec<Record>) -> Partition {
        records.sort_by_key(|r| std::cmp::Reverse(r.days_open()));
        Partition {
            region: Region::Usa,
            rows: records
                .into_iter()
                .enumerate()
                .map(|(i, record)| PartitionRow {
                    sr_no: i + 1,
                    record,
                })
                .collect(),
        }
    }

    fn sample() -> Partition {
        partition(vec![
            record(15, "Credit", "Open", "A100-1"),
            record(30, "Credit", "Closed", "A100-2"),
            record(45, "", "In progress", "B2"),
            record(61, "Stock", "Completed", "A100-3"),
            record(95, "Stock", "Open", "C300"),
        ])
    }

    #[test]
    fn test_headline_metrics() {
        let metrics = headline_metrics(&sample(), as_of());

        assert_eq!(metrics.total, 5);
        assert_eq!(metrics.over_30, 3);
        assert_eq!(metrics.over_30_pct, 60.0);
        assert_eq!(metrics.over_60, 2);
        assert_eq!(metrics.over_60_pct, 40.0);
        assert_eq!(metrics.average_age, 49.2);
        // 15 and 30 days old were created in March; only the latter is closed.
        assert_eq!(metrics.closed_this_month, 1);
    }

    #[test]
    fn test_closed_this_month_requires_month_and_year() {
        let mut this_month = record(12, "Credit", "CLOSED by user", "A1");
        this_month.created_on = Some(
            NaiveDate::from_ymd_opt(2024, 3, 19)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        );
        let mut last_year = record(378, "Credit", "completed", "A1");
        last_year.created_on = Some(
            NaiveDate::from_ymd_opt(2023, 3, 19)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        );

        let metrics = headline_metrics(&partition(vec![this_month, last_year]), as_of());
        assert_eq!(metrics.closed_this_month, 1);
    }

    #[test]
    fn test_empty_partition_guards() {
        let empty = Partition::empty(Region::Germany);
        let metrics = headline_metrics(&empty, as_of());

        assert_eq!(metrics.total, 0);
        assert_eq!(metrics.over_30_pct, 0.0);
        assert_eq!(metrics.average_age, 0.0);
        assert!(summarize(&empty, as_of(), AggregateOptions::default()).is_none());
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(2, 3), 66.7);
        assert_eq!(percentage(3, 3), 100.0);
    }

    #[test]
    fn test_week_start_is_monday() {
        // 2024-03-31 is a Sunday.
        assert_eq!(
            week_start(as_of()),
            NaiveDate::from_ymd_opt(2024, 3, 25).unwrap()
        );
        let monday = NaiveDate::from_ymd_opt(2024, 3, 25).unwrap();
        assert_eq!(week_start(monday), monday);
    }

    #[test]
    fn test_weekly_trend() {
        let trend = weekly_trend(&sample());

        assert_eq!(trend.iter().map(|p| p.total).sum::<usize>(), 5);
        assert!(trend.windows(2).all(|w| w[0].week_start < w[1].week_start));
        let oldest = &trend[0];
        assert_eq!(oldest.total, 1);
        assert_eq!(oldest.over_30, 1);
        assert_eq!(oldest.over_60, 1);
    }

    #[test]
    fn test_bucket_reason_counts_sum_to_total() {
        let part = sample();
        let counts = bucket_reason_counts(&part);

        assert_eq!(counts.iter().map(|c| c.count).sum::<usize>(), part.len());
        // Exactly 30 days lands in the second bucket.
        assert!(counts
            .iter()
            .any(|c| c.bucket == AgeBucket::UpTo60 && c.reason == "Credit" && c.count == 1));
        assert!(counts
            .iter()
            .any(|c| c.bucket == AgeBucket::UpTo60 && c.reason == "GSS classic"));
    }

    #[test]
    fn test_reason_counts_descending() {
        let counts = reason_counts(&sample());

        assert_eq!(counts.len(), 3);
        assert!(counts.windows(2).all(|w| w[0].count >= w[1].count));
        assert_eq!(counts[2].reason, "GSS classic");
        assert_eq!(counts[2].count, 1);
    }

    #[test]
    fn test_status_shares() {
        let shares = status_shares(&sample());

        let open = shares.iter().find(|s| s.status == "Open").unwrap();
        assert_eq!(open.count, 2);
        assert_eq!(open.percent, 40.0);
        assert!(shares.iter().all(|s| (0.0..=100.0).contains(&s.percent)));
    }

    #[test]
    fn test_top_aging() {
        let rows: Vec<Record> = (11..30).map(|age| record(age, "Credit", "Open", "A1")).collect();
        let top = top_aging(&partition(rows), 10);

        assert_eq!(top.len(), 10);
        assert_eq!(top[0].days_open, 29);
        assert_eq!(top[9].days_open, 20);
        assert_eq!(top[0].created_on, created(29).format("%Y-%m-%d").to_string());
    }

    #[test]
    fn test_model_reason_matrix() {
        let matrix = model_reason_matrix(&sample(), 4);

        assert_eq!(matrix.models, vec!["A100", "B2", "C300"]);
        assert_eq!(matrix.reasons, vec!["Credit", "GSS classic", "Stock"]);
        assert_eq!(matrix.get("A100", "Credit"), 2);
        assert_eq!(matrix.get("A100", "Stock"), 1);
        assert_eq!(matrix.get("B2", "Credit"), 0);
        let total: usize = matrix.counts.iter().flatten().sum();
        assert_eq!(total, 5);
    }

    #[test]
    fn test_model_key_does_not_pad() {
        assert_eq!(model_key("AB", 4), "AB");
        assert_eq!(model_key("ABCDEF", 4), "ABCD");
    }

    #[test]
    fn test_summarize_does_not_mutate() {
        let part = sample();
        let before = part.clone();
        let summary = summarize(&part, as_of(), AggregateOptions::default()).unwrap();

        assert_eq!(part, before);
        assert_eq!(summary.region, Region::Usa);
        assert_eq!(summary.top_aging.len(), 5);
    }
}

//! Record classification.
//!
//! Turns raw text rows into [`Record`]s: parses creation dates, computes
//! aging, resolves external id, region and reason code, then applies the
//! aging filter.

use crate::models::{ExternalId, RawRow, ReasonCode, Record, Region};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Status text that marks a record as the GSS classic category.
const STATUS_SENTINEL_MARKER: &str = "GSS Classic";

const SECONDS_PER_DAY: i64 = 86_400;

const DATETIME_FORMATS: [&str; 12] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%d.%m.%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d.%m.%Y %H:%M",
    "%m/%d/%Y %H:%M",
    "%Y/%m/%d %H:%M",
];

// Dotted dates are day-first (SAP German locale); slashed dates are month-first.
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d.%m.%Y", "%m/%d/%Y", "%Y/%m/%d"];

/// A per-row problem that was recovered locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowIssue {
    /// 1-based data row number (header excluded).
    pub row: usize,
    pub kind: RowIssueKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RowIssueKind {
    MissingCreatedOn,
    UnparsableCreatedOn(String),
}

impl fmt::Display for RowIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            RowIssueKind::MissingCreatedOn => write!(f, "row {}: no creation date", self.row),
            RowIssueKind::UnparsableCreatedOn(text) => {
                write!(f, "row {}: unparsable creation date '{}'", self.row, text)
            }
        }
    }
}

/// Output of one classification pass.
#[derive(Debug, Clone, Default)]
pub struct ClassifiedBatch {
    /// Records that passed the aging filter, in input order.
    pub records: Vec<Record>,
    /// Rows read from the input.
    pub rows_read: usize,
    /// Rows dropped by the aging filter.
    pub excluded: usize,
    pub issues: Vec<RowIssue>,
}

/// Classifies raw rows against a fixed "today".
#[derive(Debug, Clone)]
pub struct RecordClassifier {
    today: NaiveDateTime,
    min_age_days: i64,
}

impl RecordClassifier {
    /// Create a classifier. Records must be strictly older than `min_age_days`.
    pub fn new(today: NaiveDate, min_age_days: i64) -> Self {
        Self {
            today: today.and_time(NaiveTime::MIN),
            min_age_days,
        }
    }

    /// Classify and filter a batch of rows.
    pub fn classify(&self, rows: &[RawRow]) -> ClassifiedBatch {
        let mut batch = ClassifiedBatch {
            rows_read: rows.len(),
            ..Default::default()
        };

        for (i, raw) in rows.iter().enumerate() {
            let (record, issue) = self.classify_row(raw);
            if let Some(kind) = issue {
                let issue = RowIssue { row: i + 1, kind };
                debug!("{}", issue);
                batch.issues.push(issue);
            }

            if self.is_retained(&record) {
                batch.records.push(record);
            } else {
                batch.excluded += 1;
            }
        }

        batch
    }

    /// Aging filter: strictly older than the threshold. Undated records fail.
    pub fn is_retained(&self, record: &Record) -> bool {
        record
            .age_days
            .map(|age| age > self.min_age_days)
            .unwrap_or(false)
    }

    /// Derive one record. Never fails; date problems come back as an issue.
    pub fn classify_row(&self, raw: &RawRow) -> (Record, Option<RowIssueKind>) {
        let (created_on, issue) = match non_empty(&raw.created_on) {
            None => (None, Some(RowIssueKind::MissingCreatedOn)),
            Some(text) => match parse_created_on(text) {
                Some(dt) => (Some(dt), None),
                None => (None, Some(RowIssueKind::UnparsableCreatedOn(text.to_string()))),
            },
        };

        let age_days = created_on.map(|created| age_in_days(self.today, created));

        let status_sentinel = raw
            .combined_status
            .as_deref()
            .map(|s| s.contains(STATUS_SENTINEL_MARKER))
            .unwrap_or(false);

        let mut external_id = if status_sentinel {
            ExternalId::StatusSentinel
        } else {
            match &raw.external_id {
                Some(id) => ExternalId::Delivery(id.clone()),
                None => ExternalId::Missing,
            }
        };

        // Region is fixed before the sentinel blanking below.
        let region = Region::from_external_id(&external_id);

        let reason_code = match non_empty(&raw.reason) {
            Some(reason) => ReasonCode::Given(reason.to_string()),
            None => ReasonCode::DefaultSentinel,
        };

        if reason_code.is_sentinel() {
            external_id = ExternalId::Blanked;
        }

        let record = Record {
            external_id,
            created_on,
            age_days,
            region,
            reason_code,
            process_status: text_or_empty(&raw.process_status),
            delivery_no: text_or_empty(&raw.delivery_no),
            customer_ref: text_or_empty(&raw.customer_ref),
            material_number: text_or_empty(&raw.material_number),
            material_description: text_or_empty(&raw.material_description),
            quantity: text_or_empty(&raw.quantity),
            model_series: text_or_empty(&raw.model_series),
        };

        (record, issue)
    }
}

/// Parse a creation timestamp from cell text.
pub fn parse_created_on(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// Whole days from `created` to `today`, floored.
pub fn age_in_days(today: NaiveDateTime, created: NaiveDateTime) -> i64 {
    (today - created).num_seconds().div_euclid(SECONDS_PER_DAY)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn text_or_empty(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

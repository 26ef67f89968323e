//! Data models for the LIPA pipeline.
//!
//! This module contains the core data structures shared by the
//! classifier, partitioner, aggregator and report writers.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Display text shared by both sentinel categories.
pub const SENTINEL_TEXT: &str = "GSS classic";

/// Header names of the projected columns, in output order.
pub const PROJECTED_COLUMNS: [&str; 12] = [
    "Sr No.",
    "LIPA EX33 FZ / ExtDlvID",
    "LIPA Created On",
    "Day",
    "LIPA No. / Delivery",
    "Process status",
    "Reason code desc.",
    "Customer Ref. Ord.No.",
    "Material number",
    "Material Description",
    "Delivery Quantity",
    "Model series",
];

/// Geographic partition a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Region {
    #[serde(rename = "USA")]
    Usa,
    Germany,
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::Usa => write!(f, "USA"),
            Region::Germany => write!(f, "Germany"),
        }
    }
}

impl Region {
    /// Both regions in report order.
    pub const ALL: [Region; 2] = [Region::Usa, Region::Germany];

    /// Derive the region from the pre-overwrite external id.
    ///
    /// Ids whose text starts with '7' are USA; everything else, including a
    /// missing id, is Germany.
    pub fn from_external_id(id: &ExternalId) -> Self {
        if id.region_key().starts_with('7') {
            Region::Usa
        } else {
            Region::Germany
        }
    }
}

/// External delivery id after classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ExternalId {
    /// Id taken as-is from the `LIPA EX33 FZ / ExtDlvID` column.
    Delivery(String),
    /// "GSS Classic" appeared in the combined status column.
    StatusSentinel,
    /// Cleared because the reason code fell back to the sentinel.
    Blanked,
    /// No id in the source row.
    Missing,
}

impl ExternalId {
    /// Text written to output cells.
    pub fn as_text(&self) -> &str {
        match self {
            ExternalId::Delivery(id) => id,
            ExternalId::StatusSentinel => SENTINEL_TEXT,
            ExternalId::Blanked | ExternalId::Missing => "",
        }
    }

    /// Text used for region derivation. A missing id reads as "None".
    fn region_key(&self) -> &str {
        match self {
            ExternalId::Missing => "None",
            other => other.as_text(),
        }
    }
}

/// Reason code after classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ReasonCode {
    /// Non-empty reason from the source row.
    Given(String),
    /// The source reason was empty.
    DefaultSentinel,
}

impl ReasonCode {
    pub fn as_str(&self) -> &str {
        match self {
            ReasonCode::Given(reason) => reason,
            ReasonCode::DefaultSentinel => SENTINEL_TEXT,
        }
    }

    /// True when the reason reads as the sentinel, whichever way it got there.
    pub fn is_sentinel(&self) -> bool {
        self.as_str() == SENTINEL_TEXT
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One input row with every cell read as text.
///
/// Empty cells are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    pub created_on: Option<String>,
    pub combined_status: Option<String>,
    pub external_id: Option<String>,
    pub reason: Option<String>,
    pub delivery_no: Option<String>,
    pub process_status: Option<String>,
    pub customer_ref: Option<String>,
    pub material_number: Option<String>,
    pub material_description: Option<String>,
    pub quantity: Option<String>,
    pub model_series: Option<String>,
}

/// A classified LIPA record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub external_id: ExternalId,
    pub created_on: Option<NaiveDateTime>,
    pub age_days: Option<i64>,
    pub region: Region,
    pub reason_code: ReasonCode,
    pub process_status: String,
    pub delivery_no: String,
    pub customer_ref: String,
    pub material_number: String,
    pub material_description: String,
    pub quantity: String,
    pub model_series: String,
}

impl Record {
    /// Days open. Records without a creation date count as zero.
    pub fn days_open(&self) -> i64 {
        self.age_days.unwrap_or(0)
    }

    /// Creation date formatted as an ISO date, or empty.
    pub fn created_on_iso(&self) -> String {
        self.created_on
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }
}

/// A record inside a region partition, with its 1-based sequence number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionRow {
    pub sr_no: usize,
    pub record: Record,
}

/// All records of one region, sorted by descending age.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    pub region: Region,
    pub rows: Vec<PartitionRow>,
}

impl Partition {
    /// An explicit empty result for a region with no records.
    pub fn empty(region: Region) -> Self {
        Self {
            region,
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.rows.iter().map(|r| &r.record)
    }
}

/// Fixed aging bucket over days open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeBucket {
    /// [0, 30)
    UpTo30,
    /// [30, 60)
    UpTo60,
    /// [60, 90)
    UpTo90,
    /// [90, inf)
    Over90,
}

impl AgeBucket {
    pub const ALL: [AgeBucket; 4] = [
        AgeBucket::UpTo30,
        AgeBucket::UpTo60,
        AgeBucket::UpTo90,
        AgeBucket::Over90,
    ];

    /// Bucket containing `days`, using half-open `[lower, upper)` ranges.
    pub fn from_days(days: i64) -> Option<Self> {
        match days {
            d if d < 0 => None,
            d if d < 30 => Some(AgeBucket::UpTo30),
            d if d < 60 => Some(AgeBucket::UpTo60),
            d if d < 90 => Some(AgeBucket::UpTo90),
            _ => Some(AgeBucket::Over90),
        }
    }

    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            AgeBucket::UpTo30 => "0-30 days",
            AgeBucket::UpTo60 => "31-60 days",
            AgeBucket::UpTo90 => "61-90 days",
            AgeBucket::Over90 => ">90 days",
        }
    }
}

impl fmt::Display for AgeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Headline counts for one region.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadlineMetrics {
    pub total: usize,
    pub over_30: usize,
    pub over_30_pct: f64,
    pub over_60: usize,
    pub over_60_pct: f64,
    pub closed_this_month: usize,
    pub average_age: f64,
}

/// Counts for one calendar week, keyed by the Monday that starts it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyTrendPoint {
    pub week_start: NaiveDate,
    pub total: usize,
    pub over_30: usize,
    pub over_60: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketReasonCount {
    pub bucket: AgeBucket,
    pub reason: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasonCount {
    pub reason: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusShare {
    pub status: String,
    pub count: usize,
    pub percent: f64,
}

/// Display projection of one of the oldest records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopAgingRow {
    pub delivery_no: String,
    pub created_on: String,
    pub days_open: i64,
    pub material: String,
    pub customer_ref: String,
    pub reason: String,
}

/// Counts per (model, reason) pair, zero-filled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelReasonMatrix {
    pub models: Vec<String>,
    pub reasons: Vec<String>,
    /// `counts[model][reason]`, indexed like `models` and `reasons`.
    pub counts: Vec<Vec<usize>>,
}

impl ModelReasonMatrix {
    /// Count for a pair, zero when either key is absent.
    pub fn get(&self, model: &str, reason: &str) -> usize {
        let row = self.models.iter().position(|m| m == model);
        let col = self.reasons.iter().position(|r| r == reason);
        match (row, col) {
            (Some(r), Some(c)) => self.counts[r][c],
            _ => 0,
        }
    }
}

/// Every summary view for one non-empty region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSummary {
    pub region: Region,
    pub headline: HeadlineMetrics,
    pub weekly_trend: Vec<WeeklyTrendPoint>,
    pub bucket_reasons: Vec<BucketReasonCount>,
    pub reasons: Vec<ReasonCount>,
    pub statuses: Vec<StatusShare>,
    pub top_aging: Vec<TopAgingRow>,
    pub model_matrix: ModelReasonMatrix,
}

/// Summary slot for a region; `summary` is `None` when the region has no records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionOutcome {
    pub region: Region,
    pub summary: Option<RegionSummary>,
}

/// Metadata about one processing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Input workbook path.
    pub source_file: String,
    /// Wall-clock time the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Date ages were computed against.
    pub as_of: NaiveDate,
    /// Data rows read from the sheet.
    pub rows_read: usize,
    /// Rows that passed the aging filter.
    pub rows_retained: usize,
    /// Rows with a recovered derivation problem.
    pub row_issues: usize,
}

/// The complete analytics report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub metadata: RunMetadata,
    pub regions: Vec<RegionOutcome>,
}

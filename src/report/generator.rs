//! Analytics report generation.
//!
//! Renders the per-region summary views as Markdown or JSON.

use crate::models::{
    AgeBucket, AnalyticsReport, HeadlineMetrics, ModelReasonMatrix, RegionOutcome,
    RegionSummary, RunMetadata,
};
use anyhow::Result;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &AnalyticsReport) -> String {
    let mut output = String::new();

    output.push_str("# LIPA - 360 Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));

    for (i, outcome) in report.regions.iter().enumerate() {
        if i > 0 {
            output.push_str("---\n\n");
        }
        output.push_str(&generate_region_section(outcome));
    }

    output.push_str(&generate_footer());

    output
}

/// Generate a JSON report.
pub fn generate_json_report(report: &AnalyticsReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

fn generate_metadata_section(metadata: &RunMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source File:** {}\n", metadata.source_file));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **As Of:** {}\n", metadata.as_of));
    section.push_str(&format!("- **Rows Read:** {}\n", metadata.rows_read));
    section.push_str(&format!("- **Rows Retained:** {}\n", metadata.rows_retained));
    if metadata.row_issues > 0 {
        section.push_str(&format!(
            "- **Rows Without Usable Date:** {}\n",
            metadata.row_issues
        ));
    }
    section.push('\n');

    section
}

fn generate_region_section(outcome: &RegionOutcome) -> String {
    let Some(summary) = &outcome.summary else {
        return format!("No {} data found in the uploaded file.\n\n", outcome.region);
    };

    let mut section = String::new();
    section.push_str(&format!("## {} Data Analysis\n\n", summary.region));
    section.push_str(&generate_kpi_section(&summary.headline));
    section.push_str(&generate_trend_section(summary));
    section.push_str(&generate_bucket_section(summary));
    section.push_str(&generate_reason_section(summary));
    section.push_str(&generate_status_section(summary));
    section.push_str(&generate_top_aging_section(summary));
    section.push_str(&generate_matrix_section(&summary.model_matrix));

    section
}

fn generate_kpi_section(headline: &HeadlineMetrics) -> String {
    let mut section = String::new();

    section.push_str("### Key Metrics\n\n");
    section.push_str("| Total Open LIPAs | LIPAs > 30 Days | LIPAs > 60 Days | Closed This Month | Avg. Aging Days |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} ({:.1}%) | {} ({:.1}%) | {} | {:.1} |\n\n",
        headline.total,
        headline.over_30,
        headline.over_30_pct,
        headline.over_60,
        headline.over_60_pct,
        headline.closed_this_month,
        headline.average_age
    ));

    section
}

fn generate_trend_section(summary: &RegionSummary) -> String {
    let mut section = String::new();

    section.push_str("### Aging Trend\n\n");
    section.push_str("| Week | Total LIPAs | >30 Days | >60 Days |\n");
    section.push_str("|:---|:---:|:---:|:---:|\n");
    for point in &summary.weekly_trend {
        section.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            point.week_start, point.total, point.over_30, point.over_60
        ));
    }
    section.push('\n');

    section
}

fn generate_bucket_section(summary: &RegionSummary) -> String {
    let mut section = String::new();

    section.push_str("### Aging Bucket Distribution\n\n");
    section.push_str("| Age Bucket | Reason Code | Count |\n");
    section.push_str("|:---|:---|:---:|\n");
    for bucket in AgeBucket::ALL {
        for entry in summary.bucket_reasons.iter().filter(|e| e.bucket == bucket) {
            section.push_str(&format!(
                "| {} | {} | {} |\n",
                bucket.label(),
                escape_cell(&entry.reason),
                entry.count
            ));
        }
    }
    section.push('\n');

    section
}

fn generate_reason_section(summary: &RegionSummary) -> String {
    let mut section = String::new();

    section.push_str("### LIPAs by Reason\n\n");
    section.push_str("| Reason Code | Number of LIPAs |\n");
    section.push_str("|:---|:---:|\n");
    for reason in &summary.reasons {
        section.push_str(&format!(
            "| {} | {} |\n",
            escape_cell(&reason.reason),
            reason.count
        ));
    }
    section.push('\n');

    section
}

fn generate_status_section(summary: &RegionSummary) -> String {
    let mut section = String::new();

    section.push_str("### Process Status Distribution\n\n");
    section.push_str("| Status | Count | Share |\n");
    section.push_str("|:---|:---:|:---:|\n");
    for status in &summary.statuses {
        section.push_str(&format!(
            "| {} | {} | {:.1}% |\n",
            escape_cell(&status.status),
            status.count,
            status.percent
        ));
    }
    section.push('\n');

    section
}

fn generate_top_aging_section(summary: &RegionSummary) -> String {
    let mut section = String::new();

    section.push_str(&format!(
        "### {} - Top {} Aging LIPAs\n\n",
        summary.region,
        summary.top_aging.len()
    ));
    section.push_str("| LIPA No. | Created On | Days Open | Material | Customer Ref | Reason |\n");
    section.push_str("|:---|:---|:---:|:---|:---|:---|\n");
    for row in &summary.top_aging {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            escape_cell(&row.delivery_no),
            row.created_on,
            row.days_open,
            escape_cell(&row.material),
            escape_cell(&row.customer_ref),
            escape_cell(&row.reason)
        ));
    }
    section.push('\n');

    section
}

fn generate_matrix_section(matrix: &ModelReasonMatrix) -> String {
    let mut section = String::new();

    section.push_str("### LIPAs by Model vs. Reason\n\n");
    section.push_str("| Model |");
    for reason in &matrix.reasons {
        section.push_str(&format!(" {} |", escape_cell(reason)));
    }
    section.push('\n');
    section.push_str("|:---|");
    section.push_str(&":---:|".repeat(matrix.reasons.len()));
    section.push('\n');

    for model in &matrix.models {
        section.push_str(&format!("| {} |", escape_cell(model)));
        for reason in &matrix.reasons {
            section.push_str(&format!(" {} |", matrix.get(model, reason)));
        }
        section.push('\n');
    }
    section.push('\n');

    section
}

/// Keep free text from splitting a table row.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

fn generate_footer() -> String {
    "*Report generated by lipa360*\n".to_string()
}

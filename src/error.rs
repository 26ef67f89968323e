//! Failure taxonomy for a processing run.
//!
//! Row-level derivation problems are not errors; the classifier records
//! them as [`crate::analysis::RowIssue`] values and carries on.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LipaError {
    /// The input workbook could not be opened or read.
    #[error("failed to read workbook: {0}")]
    Parse(String),

    /// The sheet is missing columns the pipeline needs.
    #[error("missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// Writing the output workbook failed.
    #[error("failed to assemble workbook: {0}")]
    Assembly(#[from] rust_xlsxwriter::XlsxError),

    /// A sender or recipient address could not be parsed.
    #[error("invalid email address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    /// The notification could not be delivered.
    #[error("failed to send email: {0}")]
    Transmission(String),
}

impl From<calamine::Error> for LipaError {
    fn from(err: calamine::Error) -> Self {
        LipaError::Parse(err.to_string())
    }
}

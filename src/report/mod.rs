//! Report generation modules.
//!
//! Workbook assembly for the partition data and Markdown/JSON rendering
//! of the analytics summaries.

pub mod generator;
pub mod workbook;

pub use generator::*;
pub use workbook::{assemble_region_workbook, assemble_workbook};

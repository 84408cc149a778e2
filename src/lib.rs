//! Test Case Export - flatten test plans into an Excel test script
//!
//! This library reads test plans (steps, nested groups, shared steps and
//! data-driven parameter tables), flattens every test case into ordered
//! step rows once per parameter row, and writes them to a worksheet with
//! merged test case columns.
//!
//! # Features
//!
//! - Depth-first flattening of groups and shared-step references
//! - `@name` parameter substitution, one pass per data table row
//! - Continuous step numbering across nested groups
//! - Linked user stories (`Tests` relation) per test case
//! - HTML step text rendered as rich text cells
//! - Atomic .xlsx output
//!
//! # Example
//!
//! ```no_run
//! use testcase_export::config::ExportOptions;
//! use testcase_export::core::ReportAssembler;
//! use testcase_export::excel::ExcelExporter;
//! use testcase_export::parser::parse_plan_file;
//! use std::path::Path;
//!
//! let file = parse_plan_file(Path::new("plan.yaml"))?;
//! let plan = file.select_plan(Some("Release 1"))?;
//!
//! let options = ExportOptions::default();
//! let report = ReportAssembler::new(&file, &options).assemble_plan(plan)?;
//! println!("Rows: {}", report.row_count());
//!
//! ExcelExporter::new(report).export(Path::new("script.xlsx"))?;
//! # Ok::<(), testcase_export::error::ExportError>(())
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod excel;
pub mod parser;
pub mod types;

// Re-export commonly used types
pub use config::{EmptyCasePolicy, ExportOptions};
pub use error::{ExportError, ExportResult};
pub use types::{Action, ReplacementSet, Report, RowGroup, StepRow, TestCase, TestStep};

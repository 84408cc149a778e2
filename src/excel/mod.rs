//! Excel export module
//!
//! Writes an assembled [`Report`](crate::types::Report) as a single test
//! script worksheet: a styled header row, merged test case columns and one
//! rich-text row per step.

mod exporter;
pub mod rich_text;

pub use exporter::{ExcelExporter, COLUMN_WIDTHS, HEADERS, HEADER_FILL};
pub use rich_text::{HtmlRenderer, RichText, Span, SpanStyle};

//! Excel exporter implementation

use crate::error::{ExportError, ExportResult};
use crate::excel::rich_text::{HtmlRenderer, SpanStyle};
use crate::types::{Report, RowGroup, StepRow};
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatPattern, FormatUnderline, Workbook, Worksheet};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Header titles, one per column
pub const HEADERS: [&str; 7] = [
    "Test Case ID",
    "User Story ID",
    "Test Condition",
    "Step Number",
    "Action/Description",
    "Attachment Name",
    "Expected Result",
];

/// Column widths in character units, aligned with [`HEADERS`]
pub const COLUMN_WIDTHS: [f64; 7] = [15.0, 15.0, 15.0, 15.0, 50.0, 25.0, 50.0];

/// Header background, RGB(226, 238, 18)
pub const HEADER_FILL: u32 = 0xE2EE12;

const COL_ID: u16 = 0;
const COL_STORIES: u16 = 1;
const COL_TITLE: u16 = 2;
const COL_STEP: u16 = 3;
const COL_ACTION: u16 = 4;
const COL_ATTACHMENT: u16 = 5;
const COL_EXPECTED: u16 = 6;

/// Excel exporter for assembled test scripts
pub struct ExcelExporter {
    report: Report,
}

impl ExcelExporter {
    /// Create a new Excel exporter
    pub fn new(report: Report) -> Self {
        Self { report }
    }

    /// Export the report to an Excel .xlsx file.
    ///
    /// The workbook is rendered in memory first and then moved into place, so
    /// a failed export never leaves a partial file at `output_path`.
    pub fn export(&self, output_path: &Path) -> ExportResult<()> {
        let buffer = self.render_workbook()?;
        write_atomically(output_path, &buffer)?;

        info!(
            path = %output_path.display(),
            groups = self.report.groups.len(),
            rows = self.report.row_count(),
            "test script saved"
        );
        Ok(())
    }

    /// Render the workbook to .xlsx bytes
    pub fn render_workbook(&self) -> ExportResult<Vec<u8>> {
        let writer = SheetWriter::new()?;
        let mut workbook = Workbook::new();

        let worksheet = workbook.add_worksheet();
        worksheet
            .set_name(self.report.sheet_name.as_str())
            .map_err(|e| ExportError::Export(format!("Failed to set worksheet name: {}", e)))?;

        writer.write_header(worksheet)?;
        for group in &self.report.groups {
            writer.write_group(worksheet, group)?;
        }

        workbook
            .save_to_buffer()
            .map_err(|e| ExportError::Export(format!("Failed to build Excel file: {}", e)))
    }
}

/// Cell formats and the rich-text renderer shared by every write
struct SheetWriter {
    renderer: HtmlRenderer,
    header: Format,
    merged: Format,
    body: Format,
}

impl SheetWriter {
    fn new() -> ExportResult<Self> {
        Ok(Self {
            renderer: HtmlRenderer::new()?,
            header: Format::new()
                .set_bold()
                .set_text_wrap()
                .set_pattern(FormatPattern::Solid)
                .set_background_color(Color::RGB(HEADER_FILL)),
            merged: Format::new()
                .set_text_wrap()
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::Top),
            body: Format::new().set_text_wrap(),
        })
    }

    fn write_header(&self, worksheet: &mut Worksheet) -> ExportResult<()> {
        for (col_idx, (title, width)) in HEADERS.iter().zip(COLUMN_WIDTHS).enumerate() {
            let col = col_idx as u16;
            worksheet
                .write_string_with_format(0, col, *title, &self.header)
                .map_err(|e| ExportError::Export(format!("Failed to write header: {}", e)))?;
            worksheet
                .set_column_width(col, width)
                .map_err(|e| ExportError::Export(format!("Failed to set column width: {}", e)))?;
        }
        Ok(())
    }

    fn write_group(&self, worksheet: &mut Worksheet, group: &RowGroup) -> ExportResult<()> {
        let Some((first, last)) = group.row_span() else {
            return Ok(());
        };
        debug!(
            test_case = group.test_case_id,
            first, last, "writing row group"
        );

        self.write_merged(worksheet, first, last, COL_ID, &group.test_case_id.to_string())?;
        self.write_merged(worksheet, first, last, COL_STORIES, &group.stories)?;
        self.write_merged(worksheet, first, last, COL_TITLE, &group.title)?;

        for row in &group.rows {
            self.write_step_row(worksheet, row)?;
        }
        Ok(())
    }

    fn write_step_row(&self, worksheet: &mut Worksheet, row: &StepRow) -> ExportResult<()> {
        self.write_text(worksheet, row.row, COL_STEP, &row.label, &self.body)?;
        self.write_text(worksheet, row.row, COL_ACTION, &row.action, &self.body)?;
        self.write_text(
            worksheet,
            row.row,
            COL_ATTACHMENT,
            row.attachments.as_deref().unwrap_or(""),
            &self.body,
        )?;
        self.write_text(worksheet, row.row, COL_EXPECTED, &row.expected, &self.body)?;
        Ok(())
    }

    /// One value spanning rows `first..=last` of a column
    fn write_merged(
        &self,
        worksheet: &mut Worksheet,
        first: u32,
        last: u32,
        col: u16,
        text: &str,
    ) -> ExportResult<()> {
        // a single cell cannot be merged
        if first != last {
            worksheet
                .merge_range(first, col, last, col, "", &self.merged)
                .map_err(|e| ExportError::Export(format!("Failed to merge cells: {}", e)))?;
        }
        self.write_text(worksheet, first, col, text, &self.merged)
    }

    /// Write `text` as rich text after converting its HTML markup
    fn write_text(
        &self,
        worksheet: &mut Worksheet,
        row: u32,
        col: u16,
        text: &str,
        format: &Format,
    ) -> ExportResult<()> {
        let rich = self.renderer.render(text);

        let result = match rich.spans() {
            [] => worksheet.write_blank(row, col, format),
            [only] => worksheet.write_string_with_format(
                row,
                col,
                only.text.as_str(),
                &styled(format, only.style),
            ),
            spans => {
                let owned: Vec<(Format, &str)> = spans
                    .iter()
                    .map(|span| (styled(format, span.style), span.text.as_str()))
                    .collect();
                let segments: Vec<(&Format, &str)> =
                    owned.iter().map(|(f, text)| (f, *text)).collect();
                worksheet.write_rich_string_with_format(row, col, &segments, format)
            }
        };

        result
            .map(|_| ())
            .map_err(|e| ExportError::Export(format!("Failed to write cell ({}, {}): {}", row, col, e)))
    }
}

fn styled(base: &Format, style: SpanStyle) -> Format {
    let mut format = base.clone();
    if style.bold {
        format = format.set_bold();
    }
    if style.italic {
        format = format.set_italic();
    }
    if style.underline {
        format = format.set_underline(FormatUnderline::Single);
    }
    format
}

/// Write to a temporary file next to `output_path`, then rename it into place
fn write_atomically(output_path: &Path, bytes: &[u8]) -> ExportResult<()> {
    let dir = match output_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(output_path).map_err(|e| ExportError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(row: u32, n: u32, action: &str) -> StepRow {
        StepRow {
            row,
            step_number: Some(n),
            label: format!("test step {}", n),
            action: action.to_string(),
            attachments: None,
            expected: String::new(),
        }
    }

    fn group(id: u64, rows: Vec<StepRow>) -> RowGroup {
        RowGroup {
            test_case_id: id,
            title: format!("case {}", id),
            stories: "1\n2".to_string(),
            rows,
        }
    }

    #[test]
    fn test_header_constants_aligned() {
        assert_eq!(HEADERS.len(), COLUMN_WIDTHS.len());
        assert_eq!(HEADERS[COL_STEP as usize], "Step Number");
        assert_eq!(HEADERS[COL_EXPECTED as usize], "Expected Result");
    }

    #[test]
    fn test_export_empty_report() {
        let dir = TempDir::new().unwrap();
        let output_path = dir.path().join("empty.xlsx");

        let exporter = ExcelExporter::new(Report::new("Test Script"));
        assert!(exporter.export(&output_path).is_ok());
        assert!(output_path.exists());
    }

    #[test]
    fn test_export_single_and_multi_row_groups() {
        let dir = TempDir::new().unwrap();
        let output_path = dir.path().join("groups.xlsx");

        let mut report = Report::new("Test Script");
        report.groups.push(group(1, vec![row(1, 1, "only")]));
        report
            .groups
            .push(group(2, vec![row(2, 1, "a"), row(3, 2, "<b>b</b> then <i>c</i>")]));
        report.groups.push(group(3, vec![StepRow::placeholder(4)]));

        let exporter = ExcelExporter::new(report);
        let result = exporter.export(&output_path);
        assert!(result.is_ok(), "{:?}", result);
        assert!(output_path.exists());
    }

    #[test]
    fn test_export_invalid_sheet_name() {
        let dir = TempDir::new().unwrap();
        let output_path = dir.path().join("bad.xlsx");

        let exporter = ExcelExporter::new(Report::new("bad[name]"));
        let result = exporter.export(&output_path);
        assert!(matches!(result, Err(ExportError::Export(_))));
        assert!(!output_path.exists());
    }

    #[test]
    fn test_export_to_nonexistent_directory_fails() {
        let dir = TempDir::new().unwrap();
        let output_path = dir.path().join("missing").join("out.xlsx");

        let exporter = ExcelExporter::new(Report::new("Test Script"));
        let result = exporter.export(&output_path);
        assert!(matches!(result, Err(ExportError::Io(_))));
        assert!(!output_path.exists());
    }

    #[test]
    fn test_export_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let output_path = dir.path().join("clean.xlsx");

        ExcelExporter::new(Report::new("Test Script"))
            .export(&output_path)
            .unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_export_overwrites_existing_file() {
        let dir = TempDir::new().unwrap();
        let output_path = dir.path().join("again.xlsx");
        std::fs::write(&output_path, b"old").unwrap();

        ExcelExporter::new(Report::new("Test Script"))
            .export(&output_path)
            .unwrap();

        let bytes = std::fs::read(&output_path).unwrap();
        // .xlsx is a zip archive
        assert_eq!(&bytes[..2], b"PK");
    }
}

use crate::config::ExportOptions;
use crate::core::ReportAssembler;
use crate::error::ExportResult;
use crate::excel::ExcelExporter;
use crate::parser;
use crate::types::Report;
use colored::Colorize;
use std::path::{Path, PathBuf};

/// Load a plan file, select a plan and assemble its row stream
pub fn build_report(
    input: &Path,
    plan: Option<&str>,
    options: &ExportOptions,
    verbose: bool,
) -> ExportResult<Report> {
    if verbose {
        println!("{}", "📖 Parsing plan file...".cyan());
    }

    let file = parser::parse_plan_file(input)?;
    let selected = file.select_plan(plan)?;

    if verbose {
        println!(
            "   Plan: {} ({} test cases, {} shared steps)\n",
            selected.name.bright_blue().bold(),
            selected.all_test_cases().len(),
            file.shared_steps.len()
        );
        println!("{}", "🧩 Flattening test cases...".cyan());
    }

    ReportAssembler::new(&file, options).assemble_plan(selected)
}

/// Execute the export command
pub fn export(
    input: PathBuf,
    output: PathBuf,
    plan: Option<String>,
    options: ExportOptions,
    verbose: bool,
) -> ExportResult<()> {
    println!("{}", "📋 Test Case Export".bold().green());
    println!("   Input:  {}", input.display());
    println!("   Output: {}\n", output.display());

    let report = build_report(&input, plan.as_deref(), &options, verbose)?;

    if verbose {
        println!(
            "   {} row groups, {} rows\n",
            report.groups.len(),
            report.row_count()
        );
        println!("{}", "📊 Writing Excel workbook...".cyan());
    }

    let groups = report.groups.len();
    let rows = report.row_count();
    let exporter = ExcelExporter::new(report);
    exporter.export(&output)?;

    println!("{}", "✅ Export Complete!".bold().green());
    println!("   Sheet:  {}", options.sheet_name);
    println!("   Groups: {}", groups);
    println!("   Rows:   {}", rows);
    println!("   Excel file: {}\n", output.display());

    Ok(())
}

/// Execute the preview command: print the row stream as JSON
pub fn preview(input: PathBuf, plan: Option<String>, options: ExportOptions) -> ExportResult<()> {
    let report = build_report(&input, plan.as_deref(), &options, false)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

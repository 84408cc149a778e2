use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use testcase_export::cli;
use testcase_export::config::{
    EmptyCasePolicy, ExportOptions, DEFAULT_SHEET_NAME, DEFAULT_STORY_RELATION,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tcexport")]
#[command(about = "Export test plans to a flattened Excel test script")]
#[command(long_about = "tcexport - Test plan to Excel test script

Flattens every test case of a plan (steps, nested groups, shared steps) into
one row per step, repeated once per row of the test case's parameter table.

COMMANDS:
  export   - Write the test script to an .xlsx file
  preview  - Print the flattened rows as JSON

EXAMPLES:
  tcexport export plan.yaml script.xlsx
  tcexport export plan.yaml script.xlsx --plan \"Release 1\" --sheet-name Regression
  tcexport preview plan.yaml --plan \"Release 1\"

LOGGING:
  Set RUST_LOG (e.g. RUST_LOG=testcase_export=debug) for diagnostic output.")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that assembles rows
#[derive(clap::Args)]
struct AssembleArgs {
    /// Name of the plan to export (required when the file declares several)
    #[arg(short, long)]
    plan: Option<String>,

    /// Link relation naming the user stories a test case covers
    #[arg(long, env = "TCEXPORT_STORY_RELATION", default_value = DEFAULT_STORY_RELATION)]
    story_relation: String,

    /// Leave out test cases without any steps instead of writing a blank row
    #[arg(long)]
    skip_empty: bool,
}

impl AssembleArgs {
    fn options(&self) -> ExportOptions {
        let policy = if self.skip_empty {
            EmptyCasePolicy::Skip
        } else {
            EmptyCasePolicy::Placeholder
        };
        ExportOptions::default()
            .with_story_relation(self.story_relation.clone())
            .with_empty_cases(policy)
    }
}

#[derive(Subcommand)]
enum Commands {
    #[command(long_about = "Export a test plan to an Excel .xlsx test script.

One worksheet with the columns:
  Test Case ID | User Story ID | Test Condition | Step Number |
  Action/Description | Attachment Name | Expected Result

Test case ID, user stories and title are merged across the rows of each
test case pass. Step text may contain HTML (<b>, <i>, <u>, <br>, <p>), which
is written as rich text.

PARAMETERS:
  A test case with a parameter table is written once per table row, with
  every @name token replaced by that row's value.

The file is written only after every test case has been flattened; a
failed export leaves no partial file behind.")]
    /// Export a test plan to an Excel test script
    Export {
        /// Path to the plan file (YAML)
        input: PathBuf,

        /// Output Excel file path (.xlsx)
        output: PathBuf,

        #[command(flatten)]
        assemble: AssembleArgs,

        /// Worksheet name
        #[arg(long, env = "TCEXPORT_SHEET_NAME", default_value = DEFAULT_SHEET_NAME)]
        sheet_name: String,

        /// Show verbose export steps
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the flattened row stream as JSON
    Preview {
        /// Path to the plan file (YAML)
        input: PathBuf,

        #[command(flatten)]
        assemble: AssembleArgs,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "tcexport=debug,testcase_export=debug"
    } else {
        "tcexport=info,testcase_export=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            input,
            output,
            assemble,
            sheet_name,
            verbose,
        } => {
            init_tracing(verbose);
            let options = assemble.options().with_sheet_name(sheet_name);
            cli::export(input.clone(), output, assemble.plan, options, verbose)
                .with_context(|| format!("export of {} failed", input.display()))
        }

        Commands::Preview { input, assemble } => {
            init_tracing(false);
            let options = assemble.options();
            cli::preview(input.clone(), assemble.plan, options)
                .with_context(|| format!("preview of {} failed", input.display()))
        }
    }
}

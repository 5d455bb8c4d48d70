//! HR field mapper CLI
//!
//! Command-line tool for classifying source sheets, compiling mapping
//! configurations and running a mapping pass over exported CSV tables.

use clap::{Parser, Subcommand};
use hrmap_core::{
    classify, compile_tables, export_to_file, load_tables, run_pass, ExportFormat, PassOutput,
    QualityReport, Settings, Table,
};
use std::path::{Path, PathBuf};
use tracing::Level;

#[derive(Parser)]
#[command(name = "hrmap")]
#[command(about = "Map HR source tables onto a normalized employee record", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the role assigned to each input table
    Classify {
        /// CSV files or directories of CSV files
        #[arg(short, long, required = true)]
        input: Vec<PathBuf>,

        /// Settings file (JSON)
        #[arg(short, long)]
        settings: Option<PathBuf>,
    },

    /// Compile the mapping configuration and print the rules as JSON
    Compile {
        /// CSV files or directories of CSV files
        #[arg(short, long, required = true)]
        input: Vec<PathBuf>,

        /// Settings file (JSON)
        #[arg(short, long)]
        settings: Option<PathBuf>,
    },

    /// Run a mapping pass and export the result
    Transform {
        /// CSV files or directories of CSV files
        #[arg(short, long, required = true)]
        input: Vec<PathBuf>,

        /// Settings file (JSON)
        #[arg(short, long)]
        settings: Option<PathBuf>,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Output format (csv or json)
        #[arg(long, default_value = "csv")]
        format: ExportFormat,

        /// Print a data quality report after exporting
        #[arg(long)]
        report: bool,
    },

    /// Run a mapping pass and print the data quality report
    Report {
        /// CSV files or directories of CSV files
        #[arg(short, long, required = true)]
        input: Vec<PathBuf>,

        /// Settings file (JSON)
        #[arg(short, long)]
        settings: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the default settings to a file for editing
    InitSettings {
        /// Output path for the settings file
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Install a stderr subscriber so stdout stays clean for data
fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::ERROR,
        (false, 0) => Level::WARN,
        (false, 1) => Level::INFO,
        (false, 2) => Level::DEBUG,
        (false, _) => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands) -> hrmap_core::Result<()> {
    match command {
        Commands::Classify { input, settings } => cmd_classify(&input, settings.as_deref()),
        Commands::Compile { input, settings } => cmd_compile(&input, settings.as_deref()),
        Commands::Transform {
            input,
            settings,
            output,
            format,
            report,
        } => cmd_transform(&input, settings.as_deref(), &output, format, report),
        Commands::Report {
            input,
            settings,
            json,
        } => cmd_report(&input, settings.as_deref(), json),
        Commands::InitSettings { output } => cmd_init_settings(&output),
    }
}

fn load_settings(path: Option<&Path>) -> hrmap_core::Result<Settings> {
    match path {
        Some(path) => Settings::load(path),
        None => Ok(Settings::default()),
    }
}

fn load_inputs(input: &[PathBuf]) -> hrmap_core::Result<Vec<Table>> {
    let tables = load_tables(input)?;
    tracing::info!(tables = tables.len(), "loaded input tables");
    Ok(tables)
}

fn cmd_classify(input: &[PathBuf], settings: Option<&Path>) -> hrmap_core::Result<()> {
    let settings = load_settings(settings)?;
    let tables = load_inputs(input)?;
    let result = classify(&tables, &settings);

    println!("Tables ({}):", tables.len());
    println!();
    for table in &tables {
        let role = result
            .role_of(&table.name)
            .map(|r| r.to_string())
            .unwrap_or_default();
        println!(
            "  {:<32} {:<13} {} columns, {} rows",
            table.name,
            role,
            table.column_count(),
            table.row_count()
        );
    }

    print_diagnostics(&result.diagnostics);
    Ok(())
}

fn cmd_compile(input: &[PathBuf], settings: Option<&Path>) -> hrmap_core::Result<()> {
    let settings = load_settings(settings)?;
    let tables = load_inputs(input)?;
    let compiled = compile_tables(&tables, &settings)?;

    let json = serde_json::to_string_pretty(&compiled.rules)?;
    println!("{}", json);

    print_diagnostics(&compiled.diagnostics);
    Ok(())
}

fn cmd_transform(
    input: &[PathBuf],
    settings: Option<&Path>,
    output: &Path,
    format: ExportFormat,
    report: bool,
) -> hrmap_core::Result<()> {
    let settings = load_settings(settings)?;
    let tables = load_inputs(input)?;
    let pass = run_pass(&tables, &settings)?;

    export_to_file(&pass.output, output, format)?;

    println!(
        "Exported {} records with {} fields to {}",
        pass.output.row_count(),
        pass.output.columns.len(),
        output.display()
    );
    print_summary(&pass);

    if report {
        println!();
        print_report(&QualityReport::from_output(&pass.output));
    }

    print_diagnostics(&pass.diagnostics);
    Ok(())
}

fn cmd_report(input: &[PathBuf], settings: Option<&Path>, json: bool) -> hrmap_core::Result<()> {
    let settings = load_settings(settings)?;
    let tables = load_inputs(input)?;
    let pass = run_pass(&tables, &settings)?;
    let report = QualityReport::from_output(&pass.output);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
        print_diagnostics(&pass.diagnostics);
    }

    Ok(())
}

fn cmd_init_settings(output: &Path) -> hrmap_core::Result<()> {
    Settings::default().save(output)?;
    println!("Created settings file: {}", output.display());
    println!();
    println!("Edit the file to adjust aliases and value maps, then run:");
    println!("  hrmap transform --input <dir> --settings {} --output <file>", output.display());
    Ok(())
}

fn print_summary(pass: &PassOutput) {
    let summary = &pass.summary;
    println!(
        "  {} entities x {} rules: {} values found, {} null cells, {} defaults used",
        summary.entities, summary.rules, summary.found, summary.null_cells, summary.defaults_used
    );
    for (reason, count) in &summary.missing {
        println!("  missing ({:?}): {}", reason, count);
    }
}

fn print_report(report: &QualityReport) {
    println!("Data Quality Report");
    println!("Total records: {}", report.total_records);
    println!("Average completeness: {:.1}%", report.average_completeness);
    println!();
    println!("{:<32} {:>10} {:>14}", "Field", "Records", "Completeness");
    println!("{}", "-".repeat(58));
    for field in report.ranked() {
        println!(
            "{:<32} {:>10} {:>13.2}%",
            field.field, field.non_null_count, field.completeness_percent
        );
    }
}

fn print_diagnostics(diagnostics: &[hrmap_core::Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }
    println!();
    println!("Warnings ({}):", diagnostics.len());
    for diagnostic in diagnostics {
        println!("  - {}", diagnostic);
    }
}

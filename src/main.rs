//! Sheetdiff CLI - Compare CSV files by a key column
//!
//! # Main Commands
//!
//! ```bash
//! sheetdiff serve                                      # Start HTTP server (port 3000)
//! sheetdiff compare a.csv b.csv -c ID -t 1.5           # Compare files, write XLSX report
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! sheetdiff parse input.csv        # Normalize a CSV and dump the typed dataset
//! ```

use clap::{Parser, Subcommand};
use sheetdiff::{
    normalize_file, report_filename, run_files, write_report, CompareOptions, ReportModel,
    RunStatus,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sheetdiff")]
#[command(
    about = "Compare CSV files by a key column and highlight significant differences",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a CSV file and output the typed dataset as JSON
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compare CSV files; the first file is the reference dataset
    Compare {
        /// Input CSV files (at least two; the first is the reference)
        #[arg(required = true, num_args = 2..)]
        files: Vec<PathBuf>,

        /// Column used to align rows across files
        #[arg(short = 'c', long)]
        operation_column: String,

        /// Differences strictly above this value flag the row
        #[arg(short, long)]
        threshold: f64,

        /// Path for the XLSX report (default: comparison_report_<timestamp>.xlsx)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the full report model as JSON
        #[arg(long)]
        json: Option<PathBuf>,

        /// Skip writing the XLSX report
        #[arg(long)]
        no_excel: bool,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),

        Commands::Compare {
            files,
            operation_column,
            threshold,
            output,
            json,
            no_excel,
        } => cmd_compare(
            &files,
            operation_column,
            threshold,
            output.as_deref(),
            json.as_deref(),
            no_excel,
        ),

        Commands::Serve { port } => cmd_serve(port).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing CSV: {}", input.display());

    let result = normalize_file(input)?;

    eprintln!("   Encoding: {}", result.encoding);
    eprintln!(
        "   Delimiter: '{}' (auto-detected)",
        match result.delimiter {
            '\t' => "\\t".to_string(),
            c => c.to_string(),
        }
    );
    eprintln!("   Columns: {}", result.dataset.columns.join(", "));
    eprintln!("✅ Parsed {} rows", result.dataset.row_count());

    let json = serde_json::to_string_pretty(&result.dataset)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_compare(
    files: &[PathBuf],
    operation_column: String,
    threshold: f64,
    output: Option<&Path>,
    json_output: Option<&Path>,
    no_excel: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Comparing {} files on '{}'", files.len(), operation_column);

    let options = CompareOptions {
        operation_column,
        threshold,
    };
    let report = run_files(files, &options);

    print_report_summary(&report);

    if let Some(json_path) = json_output {
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(json_path, json)?;
        eprintln!("💾 Report model saved to: {}", json_path.display());
    }

    if !no_excel && !report.comparisons.is_empty() {
        let path = match output {
            Some(p) => p.to_path_buf(),
            None => PathBuf::from(report_filename("comparison_report")),
        };
        write_report(&report, &path)?;
        eprintln!("💾 XLSX report saved to: {}", path.display());
    }

    if report.status == RunStatus::Failed {
        return Err("no dataset could be validated for comparison".into());
    }

    eprintln!("\n✨ Done!");
    Ok(())
}

fn print_report_summary(report: &ReportModel) {
    eprintln!("\n📊 Status: {}", report.status);

    for comparison in &report.comparisons {
        eprintln!(
            "   {} ({} vs {}): {} rows, mean {:.3}, std {:.3}, min {:.3}, max {:.3}",
            comparison.compared_column,
            comparison.reference_file,
            comparison.other_file,
            comparison.rows_compared,
            comparison.mean,
            comparison.std,
            comparison.min,
            comparison.max,
        );
    }

    for sheet in &report.sheets {
        eprintln!(
            "   {}: {} rows, {} highlighted",
            sheet.dataset.name,
            sheet.dataset.row_count(),
            sheet.highlighted_rows.len()
        );
    }

    if !report.warnings.is_empty() {
        eprintln!("\n⚠️  Warnings:");
        for warning in report.warnings.iter().take(10) {
            eprintln!("   - {}", warning);
        }
        if report.warnings.len() > 10 {
            eprintln!("   ... +{}", report.warnings.len() - 10);
        }
    }

    if !report.errors.is_empty() {
        eprintln!("\n❌ Errors:");
        for issue in &report.errors {
            eprintln!("   - {}: {}", issue.file, issue.message);
        }
    }
}

async fn cmd_serve(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    sheetdiff::server::start_server(port).await
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}

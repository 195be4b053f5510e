//! dmarc-report - DMARC aggregate report checker
//!
//! Decodes DMARC aggregate reports (plain XML, `.gz` or `.zip`), shows the
//! published policy and every record, and tells whether each record passed
//! its disposition, alignment and authentication checks.
//!
//! Exit status: 0 when every record passes, 1 when a record fails, 2 when a
//! file cannot be decoded.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use prettytable::{row, Cell, Row, Table};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use dmarc_report::models::Record;
use dmarc_report::{Aggregate, Config, Decoder, RecordFailure};

/// CLI arguments for dmarc-report.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "DMARC aggregate report decoder and policy checker",
    long_about = "dmarc-report decodes DMARC aggregate reports (.xml, .xml.gz or .zip), \
                  displays the published DMARC policy and every record, and checks \
                  disposition, DKIM/SPF alignment and DKIM/SPF authentication.\n\n\
                  USAGE:\n  dmarc-report <FILE>... [--output <table|csv|json>] [--verbose]"
)]
struct Cli {
    /// DMARC report files
    #[arg(value_parser, required = true)]
    files: Vec<PathBuf>,

    /// Output format: table, csv, json
    #[arg(short, long, default_value = "table")]
    output: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Supported output formats.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum OutputFormat {
    Table,
    Csv,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid output format: {}", s)),
        }
    }
}

/// One decoded report as printed in JSON mode.
#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    file: String,
    report: &'a Aggregate,
    failures: Vec<RecordFailure>,
}

/// One record flattened for CSV output.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    file: String,
    report_id: &'a str,
    source_ip: &'a str,
    count: u64,
    header_from: &'a str,
    disposition: &'a str,
    dkim_aligned: &'a str,
    spf_aligned: &'a str,
    dkim_result: &'a str,
    spf_result: &'a str,
    passed: bool,
}

impl<'a> CsvRow<'a> {
    fn new(file: &Path, report: &'a Aggregate, record: &'a Record) -> Self {
        let evaluated = &record.row.policy_evaluated;
        CsvRow {
            file: file.display().to_string(),
            report_id: &report.metadata.report_id,
            source_ip: &record.row.source_ip,
            count: record.row.count,
            header_from: &record.identifiers.header_from,
            disposition: &evaluated.disposition,
            dkim_aligned: &evaluated.dkim,
            spf_aligned: &evaluated.spf,
            dkim_result: &record.auth_results.dkim.result,
            spf_result: &record.auth_results.spf.result,
            passed: record.validate().is_ok(),
        }
    }
}

/// Shows a possibly empty field as a dash.
fn or_dash(value: &str) -> &str {
    if value.trim().is_empty() {
        "-"
    } else {
        value
    }
}

/// Formats an alignment verdict and the raw result it came with.
fn format_check(aligned: &str, result: &str, domain: &str) -> String {
    if domain.trim().is_empty() {
        format!("{} ({})", or_dash(aligned), or_dash(result))
    } else {
        format!("{} ({} for {})", or_dash(aligned), or_dash(result), domain)
    }
}

fn print_table(path: &Path, report: &Aggregate) {
    let meta = &report.metadata;
    let policy = &report.policy_published;

    println!("{}", path.display().to_string().bold().blue());
    println!("{}", "----------------------------".dimmed());
    println!("{}: {} <{}>", "Reporter".bold(), meta.org_name, meta.email);
    println!("{}: {}", "Report ID".bold(), meta.report_id);
    println!(
        "{}: {} - {}",
        "Period".bold(),
        meta.date_range.begin.format("%Y-%m-%d %H:%M:%S UTC"),
        meta.date_range.end.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("{}: {}", "Domain".bold(), policy.domain);
    println!("{}: {}", "DKIM Alignment".bold(), or_dash(&policy.adkim));
    println!("{}: {}", "SPF Alignment".bold(), or_dash(&policy.aspf));
    println!("{}: {}", "Policy".bold(), or_dash(&policy.policy));
    println!("{}: {}", "Subdomain Policy".bold(), or_dash(&policy.subdomain_policy));
    match policy.percentage {
        Some(pct) => println!("{}: {}\n", "Percentage Applied".bold(), pct),
        None => println!("{}: {}\n", "Percentage Applied".bold(), "-"),
    }

    if report.records.is_empty() {
        println!("{}\n", "No DMARC records found.".yellow());
        return;
    }

    let mut table = Table::new();
    table.add_row(row!["Source IP", "Count", "Header From", "Disposition", "DKIM", "SPF"]);
    for record in &report.records {
        let evaluated = &record.row.policy_evaluated;
        let auth = &record.auth_results;
        table.add_row(Row::new(vec![
            Cell::new(&record.row.source_ip),
            Cell::new(&record.row.count.to_string()),
            Cell::new(or_dash(&record.identifiers.header_from)),
            Cell::new(or_dash(&evaluated.disposition)),
            Cell::new(&format_check(&evaluated.dkim, &auth.dkim.result, &auth.dkim.domain)),
            Cell::new(&format_check(&evaluated.spf, &auth.spf.result, &auth.spf.domain)),
        ]));
    }
    table.printstd();

    let failed = report.failed_records().count();
    println!(
        "{} records, {} messages, {} failing",
        report.records.len(),
        report.message_count(),
        failed
    );
    match report.validate() {
        Ok(()) => println!("{}\n", "All records passed".green()),
        Err(failure) => println!("{}", failure.to_string().red()),
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity.
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(if cli.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info })
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    let decoder = Decoder::new(config);

    let decoded: Vec<_> = cli
        .files
        .par_iter()
        .map(|path| (path, decoder.decode_path(path)))
        .collect();

    let mut reports = Vec::new();
    let mut decode_failed = false;
    for (path, result) in decoded {
        match result {
            Ok(report) => {
                log::info!("Decoded {} ({} records)", path.display(), report.records.len());
                reports.push((path, report));
            }
            Err(e) => {
                log::error!("Failed to decode {}: {}", path.display(), e);
                decode_failed = true;
            }
        }
    }

    match cli.output {
        OutputFormat::Json => {
            let out: Vec<JsonReport> = reports
                .iter()
                .map(|(path, report)| JsonReport {
                    file: path.display().to_string(),
                    report,
                    failures: report.failed_records().collect(),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(std::io::stdout());
            for (path, report) in &reports {
                for record in &report.records {
                    wtr.serialize(CsvRow::new(path, report, record))?;
                }
            }
            wtr.flush()?;
        }
        OutputFormat::Table => {
            for (path, report) in &reports {
                print_table(path, report);
            }
        }
    }

    let policy_failed = reports.iter().any(|(_, report)| report.validate().is_err());
    if decode_failed {
        Ok(ExitCode::from(2))
    } else if policy_failed {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

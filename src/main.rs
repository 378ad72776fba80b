//! ioc-crawler: extract indicators of compromise from files and mount points.
//!
//! This is the main entry point for the CLI application.

use anyhow::{Context, Result};
use ioc_crawler::core::config::Config;
use ioc_crawler::core::error::Error;
use ioc_crawler::scanner::{ConsoleProgressReporter, FileScanner, ScanReport};
use ioc_crawler::ui::cli::{Cli, OutputMode};
use ioc_crawler::ui::console::{format_summary, MatchPrinter};
use ioc_crawler::ui::report::{generate_report, ReportFormat};
use ioc_crawler::utils::logging::{init_logging, LogConfig};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_failure(&e);
            ExitCode::from(exit_status(&e))
        }
    }
}

/// Exit status of a failed run: 130 for a user interrupt, 1 otherwise.
fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<Error>() {
        Some(Error::ScanCancelled) => 130,
        _ => 1,
    }
}

fn report_failure(err: &anyhow::Error) {
    match err.downcast_ref::<Error>() {
        Some(Error::ScanCancelled) => println!("[!] User interrupt."),
        Some(e) => {
            eprintln!("[!] {} error: {:#}", e.category(), err);
            if let Some(hint) = e.suggestion() {
                eprintln!("    {}", hint);
            }
        }
        None => eprintln!("[!] {:#}", err),
    }
}

async fn run() -> Result<()> {
    let started = Instant::now();

    // Parse command-line arguments
    let cli = Cli::parse_args();
    cli.validate()?;

    // Load configuration and apply command-line overrides
    let mut config = match cli.config {
        Some(ref path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::load_or_default(),
    };
    if let Some(threads) = cli.threads {
        config.scan.workers = threads;
    }
    if let Some(columns) = cli.columns() {
        config.output.result_columns = columns;
    }
    if cli.no_highlight {
        config.output.match_highlighting = false;
    }

    let log_config = if cli.verbose {
        match config.logging.log_file.clone() {
            Some(path) => LogConfig::verbose().with_file(path),
            None => LogConfig::verbose(),
        }
    } else {
        LogConfig::from_config(&config.logging)
    };
    init_logging(log_config).context("Failed to initialise logging")?;

    log::debug!("ioc-crawler v{}", env!("CARGO_PKG_VERSION"));
    log::debug!("Arguments: {:?}", cli);

    config.validate().context("Invalid configuration")?;
    let config = Arc::new(config);
    let print_live = cli.mode == OutputMode::Stdout;

    let mut scanner = FileScanner::new(Arc::clone(&config), &cli.categories())
        .context("Failed to prepare the scanner")?;
    if print_live {
        let printer = MatchPrinter::new(
            &config.output.result_columns,
            config.output.match_highlighting,
        );
        scanner = scanner.with_match_callback(printer.into_callback());
    } else {
        println!("[+] Crawling {}", cli.target.display());
        let reporter = ConsoleProgressReporter::new();
        scanner.set_progress_callback(move |progress| reporter.report(&progress));
    }

    let report = scan_until_interrupted(Arc::new(scanner), &cli.target)
        .await
        .with_context(|| format!("Scan of {} failed", cli.target.display()))?;

    if let Some(ref output) = cli.output {
        let format = match cli.mode {
            OutputMode::Json => ReportFormat::Json,
            OutputMode::Csv | OutputMode::Stdout => ReportFormat::Csv,
        };
        export(&report, format, &config, output)
            .with_context(|| format!("Failed to export results to {}", output.display()))?;
    }

    if cli.time || cli.verbose {
        println!(
            "[+] Jobs finished in: {:.3}s",
            started.elapsed().as_secs_f64()
        );
    }

    if !print_live {
        for line in format_summary(&report.summary) {
            println!("{}", line);
        }
    }

    Ok(())
}

/// Run the scan, cancelling it on Ctrl-C.
async fn scan_until_interrupted(scanner: Arc<FileScanner>, target: &Path) -> ioc_crawler::Result<ScanReport> {
    let interrupt = {
        let scanner = Arc::clone(&scanner);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupt received, stopping workers");
                scanner.cancel();
            }
        })
    };

    let outcome = scanner.scan(target).await;
    interrupt.abort();
    outcome
}

fn export(report: &ScanReport, format: ReportFormat, config: &Config, output: &Path) -> Result<()> {
    generate_report(
        report,
        format,
        &config.output.result_columns,
        config.output.delimiter,
        output,
    )?;
    println!("[+] Results written to: {}", output.display());
    Ok(())
}

//! mailprobe - Email registration checker.
//!
//! CLI entry point.

use clap::Parser;
use mailprobe::merge::has_registrations;
use mailprobe::notify::ConsoleOutput;
use mailprobe::{
    Catalog, Commands, Config, ExportFormat, MailprobeError, ReportExporter, ScanConfig,
    ScanSession, Scanner,
};
use std::io::Write;
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

type Input = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    // Set up logging
    let filter = if config.verbose {
        EnvFilter::new("mailprobe=debug,info")
    } else {
        EnvFilter::new("mailprobe=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let mut work = Box::pin(dispatch(&config));
    let outcome = tokio::select! {
        result = &mut work => Some(result),
        _ = shutdown_signal() => None,
    };

    match outcome {
        Some(Ok(())) => ExitCode::SUCCESS,
        Some(Err(code)) => code,
        None => {
            // Dropping the pending scan drops the running tool's Child, and
            // kill_on_drop kills it. process::exit runs no destructors.
            drop(work);
            eprintln!("\nInterrupted.");
            std::process::exit(130);
        }
    }
}

async fn dispatch(config: &Config) -> Result<(), ExitCode> {
    if !config.no_banner {
        print_banner();
    }

    match config.command.clone() {
        Some(Commands::Scan(mut scan_config)) => {
            scan_config.verbose = config.verbose;
            run_scan(scan_config, config).await
        }
        Some(Commands::Sites) => run_sites(config),
        Some(Commands::Reports) => run_reports(config),
        None => run_interactive(config).await,
    }
}

/// Resolves on SIGTERM or SIGINT. Never resolves if the handlers cannot be
/// registered.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let (Ok(mut sigterm), Ok(mut sigint)) = (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) else {
            warn!("Could not register signal handlers");
            return std::future::pending().await;
        };

        tokio::select! {
            _ = sigterm.recv() => {},
            _ = sigint.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_err() {
            warn!("Could not register Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    }
}

fn load_catalog(config: &Config) -> Result<Catalog, ExitCode> {
    Catalog::resolve(config.sites.as_deref()).map_err(|e| {
        error!("Failed to load site catalog: {}", e);
        ExitCode::FAILURE
    })
}

async fn run_scan(scan_config: ScanConfig, global_config: &Config) -> Result<(), ExitCode> {
    let catalog = load_catalog(global_config)?;
    let format = scan_config.export;
    let console = ConsoleOutput::new(scan_config.verbose, scan_config.quiet);
    let mut session = ScanSession::new(scan_config.email.clone());

    let scanner = match Scanner::new(scan_config, catalog) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create scanner: {}", e);
            return Err(ExitCode::FAILURE);
        }
    };

    match session.run(&scanner).await {
        Ok(report) => console.print_report(report),
        Err(e) => {
            error!("Scan failed: {}", e);
            return Err(ExitCode::FAILURE);
        }
    }

    let exporter = ReportExporter::new(&global_config.reports_dir);
    match session.export(&exporter, format) {
        Ok(paths) => console.print_exported(&paths),
        Err(e) => {
            error!("Export failed: {}", e);
            return Err(ExitCode::FAILURE);
        }
    }

    if let Some(report) = session.report() {
        if has_registrations(&report.results) {
            eprintln!(
                "\n{} registrations found for {}",
                report.count(mailprobe::Status::Taken),
                report.email
            );
        }
    }

    Ok(())
}

fn run_sites(config: &Config) -> Result<(), ExitCode> {
    let catalog = load_catalog(config)?;
    ConsoleOutput::new(config.verbose, false).print_catalog(&catalog);
    Ok(())
}

fn run_reports(config: &Config) -> Result<(), ExitCode> {
    let exporter = ReportExporter::new(&config.reports_dir);
    match exporter.list_reports() {
        Ok(files) => {
            ConsoleOutput::new(config.verbose, false).print_reports(&files);
            Ok(())
        }
        Err(e) => {
            error!("Failed to list reports in {:?}: {}", exporter.reports_dir(), e);
            Err(ExitCode::FAILURE)
        }
    }
}

async fn run_interactive(config: &Config) -> Result<(), ExitCode> {
    let catalog = load_catalog(config)?;
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    loop {
        println!();
        println!("  1) Scan an email address");
        println!("  2) List sites and lookup tools");
        println!("  3) List reports");
        println!("  4) Quit");

        let Some(choice) = prompt(&mut input, "Choice: ").await else {
            return Ok(());
        };

        match choice.as_str() {
            "1" => interactive_scan(config, &catalog, &mut input).await,
            "2" => ConsoleOutput::new(config.verbose, false).print_catalog(&catalog),
            "3" => {
                let _ = run_reports(config);
            }
            "4" | "q" | "quit" | "exit" => return Ok(()),
            other => println!("Unknown choice '{}'", other),
        }
    }
}

async fn interactive_scan(config: &Config, catalog: &Catalog, input: &mut Input) {
    let Some(email) = prompt(input, "Email address: ").await else {
        return;
    };

    let scan_config = ScanConfig {
        email: email.clone(),
        verbose: config.verbose,
        ..Default::default()
    };
    let console = ConsoleOutput::new(config.verbose, false);

    let scanner = match Scanner::new(scan_config, catalog.clone()) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create scanner: {}", e);
            return;
        }
    };

    let mut session = ScanSession::new(email);
    match session.run(&scanner).await {
        Ok(report) => console.print_report(report),
        Err(e) => {
            error!("Scan failed: {}", e);
            return;
        }
    }

    let exporter = ReportExporter::new(&config.reports_dir);
    loop {
        let Some(answer) = prompt(input, "Export as json/txt/both/none [json]: ").await else {
            return;
        };
        let format = match answer.to_lowercase().as_str() {
            "" | "json" => ExportFormat::Json,
            "txt" => ExportFormat::Txt,
            "both" => ExportFormat::Both,
            "none" => ExportFormat::None,
            other => {
                println!("Unknown format '{}'", other);
                continue;
            }
        };

        match session.export(&exporter, format) {
            Ok(paths) => {
                console.print_exported(&paths);
                return;
            }
            Err(e @ (MailprobeError::FileExists(_) | MailprobeError::ExportError(_))) => {
                error!("Export failed: {}", e);
            }
            Err(e) => {
                error!("Export failed: {}", e);
                return;
            }
        }
    }
}

/// Print `message` and read one trimmed line. `None` on end of input.
async fn prompt(input: &mut Input, message: &str) -> Option<String> {
    print!("{}", message);
    let _ = std::io::stdout().flush();
    match input.next_line().await {
        Ok(Some(line)) => Some(line.trim().to_string()),
        Ok(None) => None,
        Err(e) => {
            warn!("Failed to read input: {}", e);
            None
        }
    }
}

fn print_banner() {
    println!();
    println!("\x1b[36m╔══════════════════════════════════════════════════════════════╗\x1b[0m");
    println!(
        "\x1b[36m║                    MAILPROBE v{:<31}║\x1b[0m",
        env!("CARGO_PKG_VERSION")
    );
    println!("\x1b[36m║             Email Registration Checker                       ║\x1b[0m");
    println!("\x1b[36m╚══════════════════════════════════════════════════════════════╝\x1b[0m");
    println!();
}

use anyhow::Context;
use clap::ArgMatches;
use colored::Colorize;
use commands::command_argument_builder;
use indicatif::{ProgressBar, ProgressStyle};
use pagescope::logging::setup_logging;
use pagescope::{AppState, run_server};
use pagescope_core::report::{ReportFormat, render_report};
use pagescope_core::{AnalysisService, LogFormat, Metrics, ServiceConfig};
use pagescope_scanner::AnalyzerConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

mod commands;

fn main() -> anyhow::Result<()> {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();

    match chosen_command.subcommand() {
        Some(("serve", primary_command)) => handle_serve(primary_command),
        Some(("analyze", primary_command)) => handle_analyze(primary_command),
        _ => unreachable!("clap should ensure we don't get here"),
    }
}

fn handle_serve(args: &ArgMatches) -> anyhow::Result<()> {
    let config = ServiceConfig::from_matches(args).context("invalid configuration")?;
    setup_logging(&config.log_level, config.log_format)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.concurrency)
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let metrics = Arc::new(Metrics::new()?);
        let service = AnalysisService::new(config.analyzer_config(), metrics)?;
        info!(
            "Starting pagescope {} with {} worker threads",
            env!("CARGO_PKG_VERSION"),
            config.concurrency
        );

        let state = AppState {
            service: Arc::new(service),
            request_timeout: config.request_timeout,
        };
        run_server(&config, state).await
    })
}

fn handle_analyze(args: &ArgMatches) -> anyhow::Result<()> {
    let url = args
        .get_one::<String>("url")
        .context("--url is required")?
        .clone();
    let format = args
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text);
    let level = args
        .get_one::<String>("log-level")
        .map(String::as_str)
        .unwrap_or("warn");
    setup_logging(level, LogFormat::Text)?;

    let mut analyzer_config = AnalyzerConfig::default();
    if let Some(threads) = args.get_one::<usize>("threads") {
        analyzer_config.workers = (*threads).max(1);
    }

    let runtime = tokio::runtime::Runtime::new()?;
    let report = runtime.block_on(async {
        let metrics = Arc::new(Metrics::new()?);
        let service = AnalysisService::new(analyzer_config, metrics)?;

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner.set_message(format!("Analyzing {}", url));

        let cancel = CancellationToken::new();
        let ctrl_c = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                ctrl_c.cancel();
            }
        });

        let result = service.execute_analysis(&url, &cancel).await;
        spinner.finish_and_clear();
        anyhow::Ok(result)
    })?;

    match report {
        Ok(report) => {
            println!("{}", render_report(&report, format)?);
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}", "[ERROR]".red().bold(), e);
            std::process::exit(1);
        }
    }
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

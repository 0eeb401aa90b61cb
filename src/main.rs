use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

use listing_scout::config::AppConfig;
use listing_scout::crash_reporter::{ErrorBoundary, StdinPrompt};
use listing_scout::logging;
use listing_scout::models::SearchConfig;
use listing_scout::plugins::NotifyOutcome;
use listing_scout::scheduler::SearchScheduler;
use listing_scout::search::{CycleReport, SearchOutcome, SearchRunner};
use listing_scout::telemetry::TelemetryClient;

#[derive(Parser)]
#[command(name = "listing-scout", version, about = "Scrapes listing searches and notifies about results")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one search and notify about the results
    Search,
    /// Repeat the search on a fixed interval until interrupted
    Watch {
        /// Overrides scheduler.interval_minutes
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        interval_minutes: Option<u64>,
        /// Search once before the first tick
        #[arg(long)]
        run_now: bool,
    },
    /// Inspect or edit the saved search parameters
    Params {
        #[command(subcommand)]
        action: ParamsCommand,
    },
}

#[derive(Subcommand)]
enum ParamsCommand {
    List,
    /// Add or update a value
    Set { name: String, value: String },
    /// Add a new parameter, optionally with a list of choices
    Add {
        name: String,
        #[arg(default_value = "")]
        value: String,
        #[arg(long, value_delimiter = ',')]
        options: Vec<String>,
    },
    Remove { name: String },
    /// Replace the choices of an existing parameter
    Options {
        name: String,
        #[arg(required = true, value_delimiter = ',')]
        options: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    let telemetry = TelemetryClient::new(&config.telemetry).unwrap_or_else(|e| {
        tracing::warn!("Telemetry disabled: {}", e);
        TelemetryClient::disabled()
    });
    let boundary = ErrorBoundary::new(telemetry, config.logging.file_path(), Box::new(StdinPrompt));

    // Panics surface as a JoinError and go through the boundary like any other error
    let error = match tokio::spawn(run(cli.command, config)).await {
        Ok(Ok(())) => return ExitCode::SUCCESS,
        Ok(Err(e)) => e,
        Err(e) => anyhow::Error::new(e).context("Worker task aborted"),
    };

    boundary.handle(&error).await
}

async fn run(command: Command, mut config: AppConfig) -> Result<()> {
    match command {
        Command::Search => {
            let runner = SearchRunner::from_config(&config).await?;
            let report = runner.run_cycle().await?;
            print_report(&report);
        }
        Command::Watch {
            interval_minutes,
            run_now,
        } => {
            if let Some(minutes) = interval_minutes {
                config.scheduler.interval_minutes = minutes;
            }
            watch(&config, run_now).await?;
        }
        Command::Params { action } => edit_params(&config, action)?,
    }

    Ok(())
}

async fn watch(config: &AppConfig, run_now: bool) -> Result<()> {
    info!("Starting Listing Scout...");

    let runner = Arc::new(SearchRunner::from_config(config).await?);
    let mut scheduler = SearchScheduler::new(runner, &config.scheduler).await?;

    if run_now {
        let report = scheduler.run_now().await?;
        print_report(&report);
    }

    let (failures_tx, mut failures_rx) = mpsc::unbounded_channel();
    scheduler.start(failures_tx).await?;

    let outcome = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            info!("Shutting down...");
            signal.context("Failed to listen for shutdown signal")
        }
        Some(error) = failures_rx.recv() => Err(anyhow::Error::new(error).context("Scheduled search failed")),
    };

    let stats = scheduler.stats().await;
    info!(
        "Ran {} searches ({} skipped, {} failed, {} notified)",
        stats.run_count, stats.skipped_count, stats.error_count, stats.notified_count
    );
    scheduler.shutdown().await?;

    outcome
}

fn edit_params(config: &AppConfig, action: ParamsCommand) -> Result<()> {
    let path = &config.search.config_path;
    let mut search = SearchConfig::load(path)?;

    match action {
        ParamsCommand::List => {
            for name in search.search_params.keys() {
                let shown = search.display_value(name).unwrap_or_default();
                match search.combobox_options.get(name) {
                    Some(options) => println!("{} = {} [{}]", name, shown, options.join(", ")),
                    None => println!("{} = {}", name, shown),
                }
            }
            let missing = search.missing_fields(&config.search.required_fields);
            if !missing.is_empty() {
                println!("missing required: {}", missing.join(", "));
            }
            return Ok(());
        }
        ParamsCommand::Set { name, value } => search.set_param(&name, &value),
        ParamsCommand::Add {
            name,
            value,
            options,
        } => {
            if !search.add_param(&name, &value, &options) {
                anyhow::bail!("Parameter '{}' is empty or already exists", name);
            }
        }
        ParamsCommand::Remove { name } => {
            if search.remove_param(&name).is_none() {
                anyhow::bail!("No parameter named '{}'", name);
            }
        }
        ParamsCommand::Options { name, options } => {
            if !search.set_options(&name, &options) {
                anyhow::bail!("Parameter '{}' has no option list", name);
            }
        }
    }

    search
        .save(path)
        .with_context(|| format!("Failed to save {}", path.display()))?;
    Ok(())
}

fn print_report(report: &CycleReport) {
    match &report.search {
        SearchOutcome::Skipped => println!("A search is already running"),
        SearchOutcome::MissingParameters(missing) => {
            println!("Please fill in: {}", missing.join(", "))
        }
        SearchOutcome::Completed(listings) => {
            println!("Found {} listings", listings.len());
            for listing in listings {
                println!("  {}", listing.summary_line());
            }
        }
    }

    if let Some(NotifyOutcome::MissingRecipients) = report.notification {
        println!("Email or phone number missing; no notification sent");
    }
}

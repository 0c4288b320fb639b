use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use lazy_static::lazy_static;
use std::path::Path;
use time::macros::format_description;
use tracing::{event, Level};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, registry::Registry, EnvFilter};

use crate::cli_args::{Cli, Commands, ExportCsvArgs, RunArgs};
use hs_core::{create_client, persist, render_report, run, PriceQuoteClient};
use hs_store::csv_export::export_hotspot_csv;

mod cli_args;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Cli::parse();
    setup_tracing(args.log_dir.as_deref());

    match args.command {
        Commands::Run(run_args) => run_pricecheck(&run_args).await,
        Commands::ExportCsv(ExportCsvArgs {
            hotspots_path,
            output_path,
        }) => {
            let rows = export_hotspot_csv(&hotspots_path, &output_path)?;
            println!("Exported {rows} hotspots to {}", output_path.display());
            Ok(())
        }
    }
}

async fn run_pricecheck(run_args: &RunArgs) -> Result<()> {
    let cfg = run_args.to_configuration()?;

    let client = PriceQuoteClient::new(
        create_client(&cfg.user_agent, cfg.request_timeout)?,
        cfg.price_api_base_url.clone(),
    );

    let result = run(&cfg, &client, Utc::now()).await?;
    println!("{}", render_report(&result)?);

    persist(&cfg, &result)?;
    event!(Level::DEBUG, "Run computed at {} finished", result.computed_at);
    println!("Complete.");

    Ok(())
}

lazy_static! {
    static ref GUARD: std::sync::Mutex<Option<tracing_appender::non_blocking::WorkerGuard>> = std::sync::Mutex::new(None);
}

/// Console logs go to stderr, stdout carries the report.
fn setup_tracing(log_dir: Option<&Path>) {
    let timer = UtcTime::new(format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
    ));

    let console_layer = fmt::layer()
        .with_timer(timer.clone())
        .with_ansi(true)
        .with_target(true)
        .with_writer(std::io::stderr);

    let file_layer = log_dir.map(|dir| {
        let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, "excavation-pricechecker.log.ndjson");
        let (non_blocking_appender, guard) = tracing_appender::non_blocking(file_appender);

        // keep the writer alive for the program duration
        if let Ok(mut g) = GUARD.lock() {
            *g = Some(guard);
        }

        fmt::layer()
            .with_timer(timer)
            .with_ansi(false)
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(non_blocking_appender)
    });

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    Registry::default()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();
}

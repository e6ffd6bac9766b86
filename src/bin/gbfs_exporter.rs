// gbfs_exporter - Prometheus metrics exporter for GBFS bikeshare feeds
//
// Copyright 2024 Nick Pillitteri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use clap::Parser;
use gbfs_exporter::client::GbfsClient;
use gbfs_exporter::http::RequestContext;
use gbfs_exporter::metrics::BikeshareMetrics;
use gbfs_exporter::sampler::Sampler;
use gbfs_exporter::scheduler::Scheduler;
use prometheus_client::registry::Registry;
use reqwest::Client;
use std::error::Error;
use std::io;
use std::net::SocketAddr;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{self, SignalKind};
use tracing::Level;

const DEFAULT_LOG_LEVEL: Level = Level::INFO;
const DEFAULT_BIND_ADDR: ([u8; 4], u16) = ([0, 0, 0, 0], 9100);
const DEFAULT_REFRESH_SECS: u64 = 60;
const DEFAULT_TIMEOUT_MILLIS: u64 = 5000;
const DEFAULT_API_URL: &str = "https://gbfs.baywheels.com/gbfs/en";

#[derive(Debug, Parser)]
#[clap(name = "gbfs_exporter", version = clap::crate_version!())]
struct GbfsExporterApplication {
    /// Base URL of the GBFS feeds of the bikeshare system
    #[clap(long, default_value_t = DEFAULT_API_URL.into())]
    api_url: String,

    /// Logging verbosity. Allowed values are 'trace', 'debug', 'info', 'warn', and 'error'
    /// (case insensitive)
    #[clap(long, default_value_t = DEFAULT_LOG_LEVEL)]
    log_level: Level,

    /// Sample all GBFS feeds at this interval, in seconds.
    #[clap(long, default_value_t = DEFAULT_REFRESH_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    refresh_secs: u64,

    /// Timeout for fetching each GBFS feed, in milliseconds.
    #[clap(long, default_value_t = DEFAULT_TIMEOUT_MILLIS)]
    timeout_millis: u64,

    /// Address to listen on. By default, gbfs_exporter will bind to public address since
    /// the purpose is to expose metrics to an external system (Prometheus or another
    /// agent for ingestion)
    #[clap(long, default_value_t = DEFAULT_BIND_ADDR.into())]
    listen: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let opts = GbfsExporterApplication::parse();
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(opts.log_level)
            .finish(),
    )
    .expect("failed to set tracing subscriber");

    let timeout = Duration::from_millis(opts.timeout_millis);
    let http_client = Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
        tracing::error!(message = "unable to initialize HTTP client", error = %e);
        process::exit(1)
    });

    let client = GbfsClient::new(http_client, &opts.api_url).unwrap_or_else(|e| {
        tracing::error!(message = "invalid feed URL provided", error = %e);
        process::exit(1)
    });

    let mut registry = Registry::default();
    let metrics = BikeshareMetrics::new(&mut registry);
    let scheduler = Scheduler::new(
        Sampler::new(client, metrics),
        Duration::from_secs(opts.refresh_secs),
    );

    // Sample every feed once before starting the HTTP server so that the first scrape
    // after startup already has values from the bikeshare system.
    let summary = scheduler.startup().await;
    tracing::debug!(message = "initial sample complete", summary = ?summary);

    tokio::spawn(scheduler.run());

    let context = Arc::new(RequestContext::new(registry));
    let app = gbfs_exporter::http::app(context);
    let server = axum::Server::try_bind(&opts.listen).unwrap_or_else(|e| {
        tracing::error!(message = "error binding to address", address = %opts.listen, error = %e);
        process::exit(1)
    });

    tracing::info!(message = "server started", address = %opts.listen, api_url = %opts.api_url);

    server
        .serve(app.into_make_service())
        .with_graceful_shutdown(async {
            // Wait for either SIGTERM or SIGINT to shutdown
            tokio::select! {
                _ = sigterm() => {}
                _ = sigint() => {}
            }
        })
        .await?;

    tracing::info!("server shutdown");
    Ok(())
}

/// Return after the first SIGTERM signal received by this process
async fn sigterm() -> io::Result<()> {
    unix::signal(SignalKind::terminate())?.recv().await;
    Ok(())
}

/// Return after the first SIGINT signal received by this process
async fn sigint() -> io::Result<()> {
    unix::signal(SignalKind::interrupt())?.recv().await;
    Ok(())
}

//! `raincheck` binary: HTTP API server and one-shot command line analysis

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use raincheck::analysis::AnalysisOrchestrator;
use raincheck::api::AppState;
use raincheck::config::LoggingConfig;
use raincheck::models::{AnalysisRequest, Condition};
use raincheck::{RaincheckConfig, SourceChain, web};

/// Historical weather risk analysis for planned outdoor events
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Port to listen on (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Analyse one location and date and print the result as JSON
    Analyze(AnalyzeArgs),

    /// List the configured data-source chain
    Sources,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,

    #[arg(long, allow_negative_numbers = true)]
    lon: f64,

    /// Event date, YYYY-MM-DD
    #[arg(long)]
    date: String,

    /// Very hot above this temperature (°C)
    #[arg(long, allow_negative_numbers = true)]
    hot_temp: Option<f64>,

    /// Very cold below this temperature (°C)
    #[arg(long, allow_negative_numbers = true)]
    cold_temp: Option<f64>,

    /// Heavy rain above this daily total (mm)
    #[arg(long)]
    precipitation: Option<f64>,

    /// Strong wind above this speed (m/s)
    #[arg(long)]
    wind_speed: Option<f64>,

    /// High humidity above this relative humidity (%)
    #[arg(long)]
    humidity: Option<f64>,

    /// Poor air quality above this PM2.5 level (μg/m³)
    #[arg(long)]
    air_quality: Option<f64>,

    /// Average over a circle of this radius (km)
    #[arg(long)]
    radius_km: Option<f64>,

    /// Use synthetic data only, without contacting any source
    #[arg(long)]
    offline: bool,
}

impl AnalyzeArgs {
    fn request(&self) -> AnalysisRequest {
        let mut request = AnalysisRequest::new(self.lat, self.lon, self.date.clone());
        request.area_radius_km = self.radius_km;
        for (condition, value) in [
            (Condition::VeryHot, self.hot_temp),
            (Condition::VeryCold, self.cold_temp),
            (Condition::HeavyRain, self.precipitation),
            (Condition::StrongWind, self.wind_speed),
            (Condition::HighHumidity, self.humidity),
            (Condition::PoorAirQuality, self.air_quality),
        ] {
            if let Some(value) = value {
                request = request.with_threshold(condition.request_key(), value);
            }
        }
        request
    }
}

fn init_tracing(logging: &LoggingConfig, verbose: bool) {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if logging.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = RaincheckConfig::load_from_path(cli.config.clone())
        .with_context(|| "Failed to load configuration")?;
    init_tracing(&config.logging, cli.verbose);

    match cli.command {
        Commands::Serve { port } => {
            let port = port.unwrap_or(config.server.port);
            let state = Arc::new(AppState::from_config(&config)?);
            info!(port, "starting raincheck server");
            web::run(
                state,
                port,
                Duration::from_secs(config.server.request_timeout_seconds),
            )
            .await
        }
        Commands::Analyze(args) => {
            let chain = if args.offline {
                SourceChain::offline()
            } else {
                SourceChain::from_config(&config.sources)?
            };
            let orchestrator = AnalysisOrchestrator::new(Arc::new(chain), &config.analysis);
            let result = orchestrator
                .analyze(&args.request())
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Commands::Sources => {
            let chain = SourceChain::from_config(&config.sources)?;
            for (position, source) in chain.describe().iter().enumerate() {
                let status = if source.enabled { "enabled" } else { "disabled" };
                println!(
                    "{}. {} ({:?}, {status})",
                    position + 1,
                    source.name,
                    source.kind
                );
            }
            Ok(())
        }
    }
}

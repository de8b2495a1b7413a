use anyhow::{anyhow, Error};
use async_trait::async_trait;
use clap::Parser;
use reqwest::Client;
use slog::{debug, info, o, Drain, Level, Logger};
use spice_netcdf_core::{
    find_config_file, load_config, ConfigSource, CONFIG_ENV_VAR, CONFIG_FILENAME,
    DEFAULT_API_URL, DEFAULT_REQUEST_TIMEOUT,
};
use std::{collections::HashMap, env, time::Duration};

use crate::{
    parse_request_time, MetadataComposer, MetadataProfile, ObservationFetcher, ObservationQuery,
    PipelineError, Positioning, Provenance, StationTable,
};

#[derive(Parser, Clone, Debug, serde::Deserialize, Default)]
#[command(
    author,
    version,
    about = "Download SPICE station observations and save them as a netCDF file"
)]
pub struct Cli {
    /// SPICE station code, e.g. SPICE34
    #[serde(skip)]
    pub station: String,

    /// Start time in UTC (YYYY-MM-DDTHH:MM:SSZ)
    #[serde(skip)]
    pub start_ts: String,

    /// End time in UTC (YYYY-MM-DDTHH:MM:SSZ)
    #[serde(skip)]
    pub end_ts: String,

    /// Path (including filename) where the netCDF file will be saved
    #[serde(skip)]
    pub path: String,

    /// Path to config file (TOML format)
    /// Searched in order: this flag, $SPICE2NC_CONFIG, ./spice2nc.toml,
    /// $XDG_CONFIG_HOME/spice2nc/spice2nc.toml, /etc/spice2nc/spice2nc.toml
    #[arg(short, long)]
    #[serde(skip)]
    pub config: Option<String>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, env = "SPICE2NC_LEVEL")]
    pub level: Option<String>,

    /// SPICE data endpoint
    #[arg(short, long, env = "SPICE2NC_BASE_URL")]
    pub base_url: Option<String>,

    /// HTTP User-Agent header for station API requests
    #[arg(short, long, env = "SPICE2NC_USER_AGENT")]
    pub user_agent: Option<String>,

    /// Request timeout in seconds
    #[arg(short, long, env = "SPICE2NC_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Provenance attributes: fully populated or placeholders for manual completion
    #[arg(short, long, value_enum, env = "SPICE2NC_METADATA_PROFILE")]
    pub metadata_profile: Option<MetadataProfile>,

    /// Extra or replacement stations, config file only
    #[arg(skip)]
    pub stations: Option<HashMap<String, Positioning>>,

    /// Creator and licensing attributes, config file only
    #[arg(skip)]
    pub provenance: Option<Provenance>,
}

impl Cli {
    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    pub fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("spice2nc/{}", env!("CARGO_PKG_VERSION")))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT))
    }

    pub fn metadata_profile(&self) -> MetadataProfile {
        self.metadata_profile.unwrap_or_default()
    }

    pub fn station_table(&self) -> StationTable {
        StationTable::builtin().with_overrides(self.stations.clone().unwrap_or_default())
    }

    pub fn metadata_composer(&self) -> MetadataComposer {
        MetadataComposer::new(
            self.metadata_profile(),
            self.provenance.clone().unwrap_or_default(),
        )
    }

    /// Validates the positional arguments into a query.
    pub fn query(&self) -> Result<ObservationQuery, Error> {
        let start = parse_request_time(&self.start_ts)
            .map_err(|e| anyhow!("invalid start time {:?}: {}", self.start_ts, e))?;
        let end = parse_request_time(&self.end_ts)
            .map_err(|e| anyhow!("invalid end time {:?}: {}", self.end_ts, e))?;
        if end < start {
            return Err(anyhow!(
                "end time {} is before start time {}",
                self.end_ts,
                self.start_ts
            ));
        }
        Ok(ObservationQuery {
            station: self.station.clone(),
            start,
            end,
        })
    }

    /// CLI values win over the config file, env vars are handled by clap.
    fn merge(self, file_config: Cli) -> Cli {
        Cli {
            station: self.station,
            start_ts: self.start_ts,
            end_ts: self.end_ts,
            path: self.path,
            config: self.config,
            level: self.level.or(file_config.level),
            base_url: self.base_url.or(file_config.base_url),
            user_agent: self.user_agent.or(file_config.user_agent),
            timeout: self.timeout.or(file_config.timeout),
            metadata_profile: self.metadata_profile.or(file_config.metadata_profile),
            stations: file_config.stations,
            provenance: file_config.provenance,
        }
    }
}

/// Load configuration from CLI args, config file, and environment
pub fn get_config_info() -> Result<Cli, Error> {
    let cli_args = Cli::parse();

    let source = if let Some(ref path) = cli_args.config {
        ConfigSource::Explicit(path.into())
    } else {
        find_config_file(CONFIG_ENV_VAR, CONFIG_FILENAME)
    };

    let file_config: Cli = load_config(&source)?;
    Ok(cli_args.merge(file_config))
}

fn parse_level(raw: &str) -> Level {
    match raw.to_lowercase().as_str() {
        "trace" => Level::Trace,
        "debug" => Level::Debug,
        "info" => Level::Info,
        "warn" => Level::Warning,
        "error" => Level::Error,
        _ => Level::Info,
    }
}

pub fn setup_logger(cli: &Cli) -> Logger {
    let log_level = match cli.level.as_ref() {
        Some(level) => parse_level(level),
        None => parse_level(&env::var("RUST_LOG").unwrap_or_default()),
    };

    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::CompactFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let drain = drain.filter_level(log_level).fuse();
    slog::Logger::root(drain, o!("version" => env!("CARGO_PKG_VERSION")))
}

/// Single-shot HTTP client for the SPICE endpoint. No retries.
pub struct SpiceFetcher {
    logger: Logger,
    base_url: String,
    client: Client,
}

impl SpiceFetcher {
    pub fn new(
        logger: Logger,
        base_url: String,
        user_agent: String,
        timeout: Duration,
    ) -> Result<SpiceFetcher, Error> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            logger,
            base_url,
            client,
        })
    }

    pub fn build_request(&self, query: &ObservationQuery) -> Result<reqwest::Request, PipelineError> {
        self.client
            .get(&self.base_url)
            .query(&query.query_pairs()?)
            .build()
            .map_err(|e| PipelineError::Fetch(format!("error building request: {}", e)))
    }
}

#[async_trait]
impl ObservationFetcher for SpiceFetcher {
    async fn fetch(&self, query: &ObservationQuery) -> Result<String, PipelineError> {
        let request = self.build_request(query)?;
        debug!(self.logger, "requesting: {}", request.url());

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| PipelineError::Fetch(format!("error sending request: {}", e)))?;
        if !response.status().is_success() {
            return Err(PipelineError::Fetch(format!(
                "error response from request: {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| PipelineError::Fetch(format!("error reading body of request: {}", e)))?;
        info!(self.logger, "received {} bytes for {}", body.len(), query.station);
        Ok(body)
    }
}

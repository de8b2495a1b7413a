use async_trait::async_trait;
use slog::{debug, info, Logger};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use time::{macros::format_description, OffsetDateTime, PrimitiveDateTime};

use crate::{
    assemble_variables, format_utc_seconds, parse_response, DatasetWriter, MetadataComposer,
    OutputDataset, ParsedResponse, PipelineError, PositionResolver, RawObservationPayload,
    StationTable,
};

/// Parses a `YYYY-MM-DDTHH:MM:SSZ` request bound.
pub fn parse_request_time(raw: &str) -> Result<OffsetDateTime, time::error::Parse> {
    PrimitiveDateTime::parse(
        raw,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z"),
    )
    .map(PrimitiveDateTime::assume_utc)
}

/// One station and time window to download.
#[derive(Clone, Debug, PartialEq)]
pub struct ObservationQuery {
    pub station: String,
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
}

impl ObservationQuery {
    /// Query string expected by the SPICE endpoint: metadata and station id
    /// echo on, separate raw time field off.
    pub fn query_pairs(&self) -> Result<Vec<(&'static str, String)>, PipelineError> {
        Ok(vec![
            ("spice", self.station.clone()),
            ("startTs", format_utc_seconds(self.start)?),
            ("endTs", format_utc_seconds(self.end)?),
            ("meta", String::from("yes")),
            ("spiceID", String::from("yes")),
            ("time", String::from("no")),
        ])
    }

    pub fn describe_range(&self) -> String {
        match (format_utc_seconds(self.start), format_utc_seconds(self.end)) {
            (Ok(start), Ok(end)) => format!("{}-{}", start, end),
            _ => format!("{}-{}", self.start, self.end),
        }
    }
}

/// Source of raw response bodies for a query.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObservationFetcher: Send + Sync {
    async fn fetch(&self, query: &ObservationQuery) -> Result<String, PipelineError>;
}

#[derive(Debug, PartialEq)]
pub enum RunOutcome {
    Written(PathBuf),
    /// Upstream had no records for the station and range; nothing was written
    NoData,
}

/// Builds the complete in-memory dataset from a decoded payload.
pub fn assemble_dataset(
    payload: &RawObservationPayload,
    station_id: &str,
    resolver: PositionResolver,
    composer: &MetadataComposer,
    created_at: OffsetDateTime,
) -> Result<OutputDataset, PipelineError> {
    let series = assemble_variables(payload)?;
    let position = resolver.resolve(payload)?;
    let global_attributes = composer.compose(station_id, position, &series[0].times, created_at)?;
    OutputDataset::new(series, position, global_attributes)
}

pub struct SpiceService {
    pub logger: Logger,
    pub fetcher: Arc<dyn ObservationFetcher>,
    pub writer: Arc<dyn DatasetWriter>,
    pub stations: Arc<StationTable>,
    pub composer: MetadataComposer,
}

impl SpiceService {
    pub fn new(
        logger: Logger,
        fetcher: Arc<dyn ObservationFetcher>,
        writer: Arc<dyn DatasetWriter>,
        stations: Arc<StationTable>,
        composer: MetadataComposer,
    ) -> Self {
        SpiceService {
            logger,
            fetcher,
            writer,
            stations,
            composer,
        }
    }

    /// Fetches, assembles and writes one station file.
    pub async fn run(
        &self,
        query: &ObservationQuery,
        output: &Path,
    ) -> Result<RunOutcome, PipelineError> {
        let positioning = self
            .stations
            .get(&query.station)
            .ok_or_else(|| {
                let known: Vec<&str> = self.stations.ids().collect();
                PipelineError::UnknownStation(format!(
                    "{} (known: {})",
                    query.station,
                    known.join(", ")
                ))
            })?;
        let resolver = PositionResolver::from(positioning);

        info!(
            self.logger,
            "fetching {} for {}",
            query.station,
            query.describe_range()
        );
        let body = self.fetcher.fetch(query).await?;
        debug!(self.logger, "response length: {} bytes", body.len());

        let payload = match parse_response(&body)? {
            ParsedResponse::Payload(payload) => payload,
            ParsedResponse::NoData => return Ok(RunOutcome::NoData),
        };

        let dataset = assemble_dataset(
            &payload,
            &query.station,
            resolver,
            &self.composer,
            OffsetDateTime::now_utc(),
        )?;
        if let (Some(lat), Some(lon)) = (dataset.variable("lat"), dataset.variable("lon")) {
            debug!(
                self.logger,
                "station position: {:?}, {:?}", lat.values, lon.values
            );
        }
        info!(
            self.logger,
            "assembled {} variables over {} time steps",
            dataset.variables.len(),
            dataset.time.len()
        );

        self.writer.write(&dataset, output)?;
        Ok(RunOutcome::Written(output.to_path_buf()))
    }
}

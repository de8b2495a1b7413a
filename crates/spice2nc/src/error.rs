/// Failures that abort a run before any output file is committed.
///
/// An upstream "zero results" answer is not represented here; it is the
/// [`crate::RunOutcome::NoData`] outcome.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("unknown station: {0}")]
    UnknownStation(String),
    #[error("failed to fetch observations: {0}")]
    Fetch(String),
    #[error("response is neither JSON nor an empty-result marker: {0}")]
    MalformedResponse(#[source] serde_json::Error),
    #[error("payload structure mismatch: {0}")]
    StructuralMismatch(String),
    #[error("position weighting is undefined: {0}")]
    DegenerateWeighting(String),
    #[error("failed to encode dataset: {0}")]
    Encoding(String),
    #[error("failed to format time string: {0}")]
    TimeFormat(#[from] time::error::Format),
    #[error("netCDF error: {0}")]
    Netcdf(#[from] netcdf::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

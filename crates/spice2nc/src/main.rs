use slog::{error, info};
use spice2nc::{
    get_config_info, setup_logger, NetcdfWriter, RunOutcome, SpiceFetcher, SpiceService,
};
use std::{path::Path, sync::Arc};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), anyhow::Error> {
    let cli = get_config_info()?;
    let logger = setup_logger(&cli);
    let query = cli.query()?;

    info!(logger, "spice2nc starting...");
    info!(logger, "  Station: {}", query.station);
    info!(logger, "  Endpoint: {}", cli.base_url());
    info!(logger, "  Output: {}", cli.path);
    info!(logger, "  Metadata profile: {:?}", cli.metadata_profile());

    let fetcher = SpiceFetcher::new(
        logger.clone(),
        cli.base_url(),
        cli.user_agent(),
        cli.timeout(),
    )?;
    let service = SpiceService::new(
        logger.clone(),
        Arc::new(fetcher),
        Arc::new(NetcdfWriter::new(logger.clone())),
        Arc::new(cli.station_table()),
        cli.metadata_composer(),
    );

    match service.run(&query, Path::new(&cli.path)).await {
        Ok(RunOutcome::Written(path)) => {
            info!(logger, "saved {}", path.display());
        }
        Ok(RunOutcome::NoData) => {
            info!(
                logger,
                "{} does not have any data for the provided date range {}!",
                query.station,
                query.describe_range()
            );
        }
        Err(err) => {
            error!(logger, "failed to build {}: {}", cli.path, err);
            return Err(err.into());
        }
    }
    Ok(())
}

use std::path::PathBuf;

use anyhow::Result;
use lead_engine::utils::logging;
use lead_engine::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Optional config path as the only argument
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = Config::load(config_path.as_deref()).await?;

    logging::init(&config.log_level);
    let countries: Vec<String> = config.countries.iter().map(|p| p.code.to_string()).collect();
    logging::log_startup(config.workers, &countries, config.dry_run);

    App::initialize(config).await?.run().await?;

    Ok(())
}

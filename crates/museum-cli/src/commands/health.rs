//! Service health check command

use super::load_config;
use anyhow::Result;
use museum_gen::services::create_service;
use museum_gen::ServiceStatus;

pub fn run(service: Option<&str>) -> Result<()> {
    let config = load_config(service, None)?;
    let service = create_service(&config.service.kind, &config)?;

    match service.health_check()? {
        ServiceStatus::Available => {
            println!("{} at {}: available", service.name(), config.service.url);
            Ok(())
        }
        ServiceStatus::Unavailable(reason) => {
            anyhow::bail!("{} at {}: unavailable ({})", service.name(), config.service.url, reason)
        }
    }
}

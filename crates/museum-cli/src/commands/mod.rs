//! CLI command implementations

pub mod generate;
pub mod health;
pub mod scene;
pub mod workflow;

use anyhow::Result;
use museum_gen::MuseumConfig;

/// Load layered config, applying command-line overrides
pub fn load_config(service: Option<&str>, target: Option<&str>) -> Result<MuseumConfig> {
    let mut config = MuseumConfig::load()?;
    if let Some(service) = service {
        config.service.kind = service.to_string();
    }
    if let Some(target) = target {
        if target.is_empty() {
            anyhow::bail!("--target must not be empty");
        }
        config.target = target.to_string();
    }
    tracing::debug!(
        service = %config.service.kind,
        url = %config.service.url,
        target = %config.target,
        cache = %config.cache_dir.display(),
        "config loaded"
    );
    Ok(config)
}

/// Single-threaded runtime: the pipeline only suspends at network calls
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

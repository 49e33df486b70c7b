//! Service registry
//!
//! Maps service names to concrete implementations.

pub mod comfyui;
pub mod mock;

use crate::config::MuseumConfig;
use crate::service::SharedService;
use museum_core::{MuseumError, Result};
use std::sync::Arc;

/// Create a service by name with configuration
pub fn create_service(name: &str, config: &MuseumConfig) -> Result<SharedService> {
    match name {
        "comfyui" => Ok(Arc::new(comfyui::ComfyUiService::from_config(config))),
        "mock" => Ok(Arc::new(mock::MockService::new())),
        _ => Err(MuseumError::ConfigError(format!(
            "Unknown service '{}'. Available: {}",
            name,
            available_services().join(", ")
        ))),
    }
}

/// List all available service names
pub fn available_services() -> Vec<&'static str> {
    vec!["comfyui", "mock"]
}

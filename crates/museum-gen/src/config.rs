//! Layered configuration system
//!
//! Config is loaded with three layers of precedence (highest wins):
//! 1. Environment variables: `MUSEUM_SERVICE`, `MUSEUM_SERVICE_URL`,
//!    `MUSEUM_STAGE_TIMEOUT_SECS`, `MUSEUM_TARGET`
//! 2. Project-local: `.museum/config.toml`
//! 3. Global: `~/.museum/config.toml`

use crate::stage::StageLimits;
use museum_core::{MuseumError, Result};
use museum_scene::{TargetSelector, DEFAULT_TARGET};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default ComfyUI listen address
pub const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:8188";

/// Where and how to reach the generation service
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// Service implementation: "comfyui" or "mock"
    pub kind: String,
    pub url: String,
    /// Upper bound for each pipeline stage
    pub timeout_secs: u64,
    /// Delay between result polls while a job is still running
    pub poll_interval_ms: u64,
}

/// Defaults for the text-to-image workflow
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub checkpoint: String,
    pub width: u32,
    pub height: u32,
    pub batch_size: u32,
    pub steps: u32,
    pub cfg: f64,
    pub sampler: String,
    pub scheduler: String,
    pub denoise: f64,
    pub negative_prompt: String,
    pub filename_prefix: String,
    pub seed_min: u64,
    pub seed_max: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            checkpoint: "v1-5-pruned-emaonly.safetensors".to_string(),
            width: 512,
            height: 512,
            batch_size: 1,
            steps: 20,
            cfg: 8.0,
            sampler: "euler".to_string(),
            scheduler: "normal".to_string(),
            denoise: 1.0,
            negative_prompt: "text, watermark".to_string(),
            filename_prefix: "museum".to_string(),
            seed_min: 0,
            seed_max: u32::MAX as u64,
        }
    }
}

/// Resolved configuration with every layer applied
#[derive(Debug, Clone, PartialEq)]
pub struct MuseumConfig {
    pub service: ServiceConfig,
    pub generation: GenerationConfig,
    /// Name fragment selecting the meshes that receive textures
    pub target: String,
    /// Root under which per-session asset directories are created
    pub cache_dir: PathBuf,
}

impl Default for MuseumConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                kind: "comfyui".to_string(),
                url: DEFAULT_SERVICE_URL.to_string(),
                timeout_secs: 60,
                poll_interval_ms: 500,
            },
            generation: GenerationConfig::default(),
            target: DEFAULT_TARGET.to_string(),
            cache_dir: std::env::temp_dir().join("museum-cache"),
        }
    }
}

/// One config file; every field optional so layers can be stacked
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MuseumConfigFile {
    #[serde(default)]
    pub service: ServiceLayer,
    #[serde(default)]
    pub generation: GenerationLayer,
    #[serde(default)]
    pub scene: SceneLayer,
    #[serde(default)]
    pub cache: CacheLayer,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceLayer {
    pub kind: Option<String>,
    pub url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub poll_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationLayer {
    pub checkpoint: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub batch_size: Option<u32>,
    pub steps: Option<u32>,
    pub cfg: Option<f64>,
    pub sampler: Option<String>,
    pub scheduler: Option<String>,
    pub denoise: Option<f64>,
    pub negative_prompt: Option<String>,
    pub filename_prefix: Option<String>,
    pub seed_min: Option<u64>,
    pub seed_max: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneLayer {
    pub target: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheLayer {
    pub dir: Option<PathBuf>,
}

impl MuseumConfig {
    /// Load config with layered precedence: global < project < env vars
    pub fn load() -> Result<Self> {
        let mut layers = MuseumConfigFile::default();

        // Layer 1: Global config (~/.museum/config.toml)
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                let global = Self::load_file(&global_path)?;
                merge_into(&mut layers, global);
            }
        }

        // Layer 2: Project-local config (.museum/config.toml)
        let local_path = PathBuf::from(".museum/config.toml");
        if local_path.exists() {
            let local = Self::load_file(&local_path)?;
            merge_into(&mut layers, local);
        }

        // Layer 3: Environment variable overrides
        apply_env_overrides(&mut layers)?;

        Self::resolve(layers)
    }

    /// Load config from a specific file path only (plus env overrides)
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let mut layers = Self::load_file(path)?;
        apply_env_overrides(&mut layers)?;
        Self::resolve(layers)
    }

    /// Load config from a TOML string, without env overrides
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let layers: MuseumConfigFile = toml::from_str(content)?;
        Self::resolve(layers)
    }

    pub fn stage_limits(&self) -> StageLimits {
        StageLimits {
            timeout: Duration::from_secs(self.service.timeout_secs),
            poll_interval: Duration::from_millis(self.service.poll_interval_ms),
        }
    }

    pub fn selector(&self) -> TargetSelector {
        TargetSelector::name_contains(self.target.clone())
    }

    pub fn seed_range(&self) -> RangeInclusive<u64> {
        self.generation.seed_min..=self.generation.seed_max
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".museum").join("config.toml"))
    }

    fn load_file(path: &Path) -> Result<MuseumConfigFile> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            MuseumError::ConfigError(format!("Failed to parse config {}: {}", path.display(), e))
        })
    }

    fn resolve(layers: MuseumConfigFile) -> Result<Self> {
        let defaults = Self::default();
        let g = layers.generation;
        let d = defaults.generation;

        let config = Self {
            service: ServiceConfig {
                kind: layers.service.kind.unwrap_or(defaults.service.kind),
                url: layers.service.url.unwrap_or(defaults.service.url),
                timeout_secs: layers
                    .service
                    .timeout_secs
                    .unwrap_or(defaults.service.timeout_secs),
                poll_interval_ms: layers
                    .service
                    .poll_interval_ms
                    .unwrap_or(defaults.service.poll_interval_ms),
            },
            generation: GenerationConfig {
                checkpoint: g.checkpoint.unwrap_or(d.checkpoint),
                width: g.width.unwrap_or(d.width),
                height: g.height.unwrap_or(d.height),
                batch_size: g.batch_size.unwrap_or(d.batch_size),
                steps: g.steps.unwrap_or(d.steps),
                cfg: g.cfg.unwrap_or(d.cfg),
                sampler: g.sampler.unwrap_or(d.sampler),
                scheduler: g.scheduler.unwrap_or(d.scheduler),
                denoise: g.denoise.unwrap_or(d.denoise),
                negative_prompt: g.negative_prompt.unwrap_or(d.negative_prompt),
                filename_prefix: g.filename_prefix.unwrap_or(d.filename_prefix),
                seed_min: g.seed_min.unwrap_or(d.seed_min),
                seed_max: g.seed_max.unwrap_or(d.seed_max),
            },
            target: layers.scene.target.unwrap_or(defaults.target),
            cache_dir: layers.cache.dir.unwrap_or(defaults.cache_dir),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.service.timeout_secs == 0 {
            return Err(MuseumError::ConfigError(
                "service.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.generation.seed_min > self.generation.seed_max {
            return Err(MuseumError::ConfigError(format!(
                "generation.seed_min ({}) is above seed_max ({})",
                self.generation.seed_min, self.generation.seed_max
            )));
        }
        for (field, value) in [("width", self.generation.width), ("height", self.generation.height)] {
            if value == 0 || value % 8 != 0 {
                return Err(MuseumError::ConfigError(format!(
                    "generation.{} must be a positive multiple of 8, got {}",
                    field, value
                )));
            }
        }
        if self.target.is_empty() {
            return Err(MuseumError::ConfigError(
                "scene.target must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn overlay<T>(base: &mut Option<T>, over: Option<T>) {
    if over.is_some() {
        *base = over;
    }
}

fn merge_into(base: &mut MuseumConfigFile, over: MuseumConfigFile) {
    let (b, o) = (&mut base.service, over.service);
    overlay(&mut b.kind, o.kind);
    overlay(&mut b.url, o.url);
    overlay(&mut b.timeout_secs, o.timeout_secs);
    overlay(&mut b.poll_interval_ms, o.poll_interval_ms);

    let (b, o) = (&mut base.generation, over.generation);
    overlay(&mut b.checkpoint, o.checkpoint);
    overlay(&mut b.width, o.width);
    overlay(&mut b.height, o.height);
    overlay(&mut b.batch_size, o.batch_size);
    overlay(&mut b.steps, o.steps);
    overlay(&mut b.cfg, o.cfg);
    overlay(&mut b.sampler, o.sampler);
    overlay(&mut b.scheduler, o.scheduler);
    overlay(&mut b.denoise, o.denoise);
    overlay(&mut b.negative_prompt, o.negative_prompt);
    overlay(&mut b.filename_prefix, o.filename_prefix);
    overlay(&mut b.seed_min, o.seed_min);
    overlay(&mut b.seed_max, o.seed_max);

    overlay(&mut base.scene.target, over.scene.target);
    overlay(&mut base.cache.dir, over.cache.dir);
}

fn apply_env_overrides(config: &mut MuseumConfigFile) -> Result<()> {
    if let Ok(kind) = std::env::var("MUSEUM_SERVICE") {
        config.service.kind = Some(kind);
    }
    if let Ok(url) = std::env::var("MUSEUM_SERVICE_URL") {
        config.service.url = Some(url);
    }
    if let Ok(secs) = std::env::var("MUSEUM_STAGE_TIMEOUT_SECS") {
        let parsed = secs.trim().parse().map_err(|_| {
            MuseumError::ConfigError(format!(
                "MUSEUM_STAGE_TIMEOUT_SECS must be a whole number of seconds, got '{}'",
                secs
            ))
        })?;
        config.service.timeout_secs = Some(parsed);
    }
    if let Ok(target) = std::env::var("MUSEUM_TARGET") {
        config.scene.target = Some(target);
    }
    Ok(())
}

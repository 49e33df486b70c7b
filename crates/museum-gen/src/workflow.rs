//! Generation requests as ComfyUI-style workflow graphs

use crate::config::GenerationConfig;
use museum_core::{MuseumError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

/// Stage kinds that write an image and may serve as the output stage
pub const OUTPUT_KINDS: &[&str] = &["SaveImage", "PreviewImage"];

/// One input of a workflow stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StageInput {
    /// `[stage_id, output_slot]` reference to another stage's output
    Link(String, u32),
    /// Literal value (number, string, bool)
    Value(serde_json::Value),
}

/// A node of the workflow graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStage {
    pub class_type: String,
    #[serde(default)]
    pub inputs: BTreeMap<String, StageInput>,
}

impl WorkflowStage {
    pub fn new(class_type: impl Into<String>) -> Self {
        Self {
            class_type: class_type.into(),
            inputs: BTreeMap::new(),
        }
    }

    /// Add a literal input
    pub fn input(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.inputs
            .insert(key.into(), StageInput::Value(value.into()));
        self
    }

    /// Wire an input to output `slot` of stage `from`
    pub fn link(mut self, key: impl Into<String>, from: impl Into<String>, slot: u32) -> Self {
        self.inputs
            .insert(key.into(), StageInput::Link(from.into(), slot));
        self
    }

    pub fn is_output_kind(&self) -> bool {
        OUTPUT_KINDS.contains(&self.class_type.as_str())
    }

    fn links(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inputs.iter().filter_map(|(key, input)| match input {
            StageInput::Link(from, _) => Some((key.as_str(), from.as_str())),
            StageInput::Value(_) => None,
        })
    }
}

/// A complete workflow submitted as one generation job
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    stages: BTreeMap<String, WorkflowStage>,
    output_stage: String,
}

impl GenerationRequest {
    pub fn new(output_stage: impl Into<String>) -> Self {
        Self {
            stages: BTreeMap::new(),
            output_stage: output_stage.into(),
        }
    }

    /// Build from an already-serialised API prompt
    pub fn from_prompt(prompt: serde_json::Value, output_stage: impl Into<String>) -> Result<Self> {
        let stages: BTreeMap<String, WorkflowStage> = serde_json::from_value(prompt)?;
        Ok(Self {
            stages,
            output_stage: output_stage.into(),
        })
    }

    pub fn with_stage(mut self, id: impl Into<String>, stage: WorkflowStage) -> Self {
        self.stages.insert(id.into(), stage);
        self
    }

    pub fn stages(&self) -> &BTreeMap<String, WorkflowStage> {
        &self.stages
    }

    pub fn stage(&self, id: &str) -> Option<&WorkflowStage> {
        self.stages.get(id)
    }

    pub fn output_stage(&self) -> &str {
        &self.output_stage
    }

    /// Check the graph is well formed before anything is sent
    pub fn validate(&self) -> Result<()> {
        if self.stages.is_empty() {
            return Err(MuseumError::InvalidRequest(
                "workflow has no stages".to_string(),
            ));
        }

        let output = self.stages.get(&self.output_stage).ok_or_else(|| {
            MuseumError::InvalidRequest(format!(
                "output stage '{}' is not in the workflow",
                self.output_stage
            ))
        })?;
        if !output.is_output_kind() {
            return Err(MuseumError::InvalidRequest(format!(
                "output stage '{}' is a {}, expected one of {:?}",
                self.output_stage, output.class_type, OUTPUT_KINDS
            )));
        }

        for (id, stage) in &self.stages {
            if stage.class_type.is_empty() {
                return Err(MuseumError::InvalidRequest(format!(
                    "stage '{}' has no class_type",
                    id
                )));
            }
            if stage.is_output_kind() && *id != self.output_stage {
                return Err(MuseumError::InvalidRequest(format!(
                    "stage '{}' is a second image output; only '{}' may save",
                    id, self.output_stage
                )));
            }
            for (key, from) in stage.links() {
                if !self.stages.contains_key(from) {
                    return Err(MuseumError::InvalidRequest(format!(
                        "stage '{}' input '{}' links to missing stage '{}'",
                        id, key, from
                    )));
                }
            }
        }

        Ok(())
    }

    /// The ComfyUI API prompt object
    pub fn to_prompt(&self) -> serde_json::Value {
        serde_json::to_value(&self.stages).unwrap_or(serde_json::Value::Null)
    }
}

/// Pick a seed uniformly from an inclusive range
pub fn random_seed(range: RangeInclusive<u64>) -> Result<u64> {
    if range.is_empty() {
        return Err(MuseumError::InvalidRequest(format!(
            "empty seed range {}..={}",
            range.start(),
            range.end()
        )));
    }
    Ok(rand::rng().random_range(range))
}

/// Builder for the standard seven-stage text-to-image workflow:
/// checkpoint loader, empty latent, two text encoders, sampler,
/// VAE decoder and image saver.
#[derive(Debug, Clone)]
pub struct TextToImage {
    config: GenerationConfig,
    prompt: String,
    negative: Option<String>,
    seed: Option<u64>,
}

impl TextToImage {
    pub const SAMPLER: &'static str = "3";
    pub const CHECKPOINT: &'static str = "4";
    pub const LATENT: &'static str = "5";
    pub const POSITIVE: &'static str = "6";
    pub const NEGATIVE: &'static str = "7";
    pub const DECODE: &'static str = "8";
    pub const SAVE: &'static str = "9";

    pub fn new(config: &GenerationConfig, prompt: impl Into<String>) -> Self {
        Self {
            config: config.clone(),
            prompt: prompt.into(),
            negative: None,
            seed: None,
        }
    }

    pub fn with_negative(mut self, negative: impl Into<String>) -> Self {
        self.negative = Some(negative.into());
        self
    }

    /// Pin the sampler seed instead of drawing one
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<GenerationRequest> {
        let prompt = self.prompt.trim();
        if prompt.is_empty() {
            return Err(MuseumError::InvalidRequest(
                "prompt text is empty".to_string(),
            ));
        }

        let c = &self.config;
        let seed = match self.seed {
            Some(seed) => seed,
            None => random_seed(c.seed_min..=c.seed_max)?,
        };
        let negative = self.negative.as_deref().unwrap_or(&c.negative_prompt);
        tracing::debug!(seed, steps = c.steps, checkpoint = %c.checkpoint, "building text-to-image workflow");

        let request = GenerationRequest::new(Self::SAVE)
            .with_stage(
                Self::SAMPLER,
                WorkflowStage::new("KSampler")
                    .input("seed", seed)
                    .input("steps", c.steps)
                    .input("cfg", c.cfg)
                    .input("sampler_name", c.sampler.as_str())
                    .input("scheduler", c.scheduler.as_str())
                    .input("denoise", c.denoise)
                    .link("model", Self::CHECKPOINT, 0)
                    .link("positive", Self::POSITIVE, 0)
                    .link("negative", Self::NEGATIVE, 0)
                    .link("latent_image", Self::LATENT, 0),
            )
            .with_stage(
                Self::CHECKPOINT,
                WorkflowStage::new("CheckpointLoaderSimple")
                    .input("ckpt_name", c.checkpoint.as_str()),
            )
            .with_stage(
                Self::LATENT,
                WorkflowStage::new("EmptyLatentImage")
                    .input("width", c.width)
                    .input("height", c.height)
                    .input("batch_size", c.batch_size),
            )
            .with_stage(
                Self::POSITIVE,
                WorkflowStage::new("CLIPTextEncode")
                    .input("text", prompt)
                    .link("clip", Self::CHECKPOINT, 1),
            )
            .with_stage(
                Self::NEGATIVE,
                WorkflowStage::new("CLIPTextEncode")
                    .input("text", negative)
                    .link("clip", Self::CHECKPOINT, 1),
            )
            .with_stage(
                Self::DECODE,
                WorkflowStage::new("VAEDecode")
                    .link("samples", Self::SAMPLER, 0)
                    .link("vae", Self::CHECKPOINT, 2),
            )
            .with_stage(
                Self::SAVE,
                WorkflowStage::new("SaveImage")
                    .input("filename_prefix", c.filename_prefix.as_str())
                    .link("images", Self::DECODE, 0),
            );

        request.validate()?;
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GenerationConfig {
        GenerationConfig::default()
    }

    #[test]
    fn test_text_to_image_shape() {
        let request = TextToImage::new(&config(), "a quiet harbour at dusk")
            .with_seed(42)
            .build()
            .unwrap();

        assert_eq!(request.stages().len(), 7);
        assert_eq!(request.output_stage(), "9");
        assert_eq!(request.stage("9").unwrap().class_type, "SaveImage");

        let prompt = request.to_prompt();
        assert_eq!(prompt["3"]["inputs"]["seed"], 42);
        assert_eq!(prompt["3"]["inputs"]["model"], serde_json::json!(["4", 0]));
        assert_eq!(prompt["6"]["inputs"]["text"], "a quiet harbour at dusk");
        assert_eq!(prompt["7"]["inputs"]["text"], "text, watermark");
        assert_eq!(prompt["5"]["inputs"]["width"], 512);
        assert_eq!(prompt["9"]["inputs"]["filename_prefix"], "museum");
    }

    #[test]
    fn test_negative_override() {
        let request = TextToImage::new(&config(), "still life")
            .with_negative("blurry")
            .with_seed(1)
            .build()
            .unwrap();
        assert_eq!(request.to_prompt()["7"]["inputs"]["text"], "blurry");
    }

    #[test]
    fn test_random_seed_stays_in_range() {
        let mut cfg = config();
        cfg.seed_min = 10;
        cfg.seed_max = 12;
        for _ in 0..50 {
            let request = TextToImage::new(&cfg, "x").build().unwrap();
            let seed = request.to_prompt()["3"]["inputs"]["seed"].as_u64().unwrap();
            assert!((10..=12).contains(&seed));
        }
        assert_eq!(random_seed(7..=7).unwrap(), 7);
    }

    #[test]
    fn test_inverted_seed_range_rejected() {
        let mut cfg = config();
        cfg.seed_min = 10;
        cfg.seed_max = 5;
        assert!(matches!(
            TextToImage::new(&cfg, "x").build(),
            Err(MuseumError::InvalidRequest(_))
        ));
        assert!(random_seed(10..=5).is_err());

        // A pinned seed never consults the range
        assert!(TextToImage::new(&cfg, "x").with_seed(3).build().is_ok());
    }

    #[test]
    fn test_empty_prompt_rejected() {
        assert!(matches!(
            TextToImage::new(&config(), "   ").build(),
            Err(MuseumError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_dangling_link_rejected() {
        let request = GenerationRequest::new("9").with_stage(
            "9",
            WorkflowStage::new("SaveImage").link("images", "8", 0),
        );
        let err = request.validate().unwrap_err();
        assert!(err.to_string().contains("missing stage '8'"));
    }

    #[test]
    fn test_output_stage_rules() {
        assert!(GenerationRequest::new("9").validate().is_err());

        let missing = GenerationRequest::new("9")
            .with_stage("1", WorkflowStage::new("CheckpointLoaderSimple"));
        assert!(missing.validate().is_err());

        let wrong_kind = GenerationRequest::new("1")
            .with_stage("1", WorkflowStage::new("CheckpointLoaderSimple"));
        assert!(wrong_kind.validate().is_err());

        let two_savers = GenerationRequest::new("9")
            .with_stage("9", WorkflowStage::new("SaveImage"))
            .with_stage("10", WorkflowStage::new("PreviewImage"));
        assert!(two_savers.validate().is_err());

        let ok = GenerationRequest::new("9").with_stage("9", WorkflowStage::new("SaveImage"));
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_prompt_json_parses_back() {
        let request = TextToImage::new(&config(), "x").with_seed(3).build().unwrap();
        let parsed = GenerationRequest::from_prompt(request.to_prompt(), "9").unwrap();
        assert_eq!(parsed, request);
    }
}

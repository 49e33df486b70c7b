//! Mock service for testing
//!
//! Answers the three ComfyUI endpoints in-process. Jobs complete after a
//! configurable number of polls and produce solid-colour PNGs; every
//! endpoint can be made slow or failing.

use crate::service::{AssetLocator, GenerationService, ServiceStatus};
use crate::workflow::GenerationRequest;
use museum_core::{Result, ServiceFailure};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

const FALLBACK_SIZE: u32 = 64;

/// Scripted behaviour for a [`MockService`]
#[derive(Debug, Clone, Default)]
pub struct MockBehavior {
    /// Prompt ids handed out in order; generated ids follow once exhausted
    pub prompt_ids: Vec<String>,
    /// Replaces the image list of every history record
    pub images: Option<Vec<serde_json::Value>>,
    /// Returned verbatim for every history query
    pub history_override: Option<serde_json::Value>,
    /// Empty history answers before a job's record appears
    pub pending_polls: u32,
    pub submit_failure: Option<ServiceFailure>,
    pub history_failure: Option<ServiceFailure>,
    pub view_failure: Option<ServiceFailure>,
    /// Returned verbatim for every view request
    pub view_payload: Option<Vec<u8>>,
    pub submit_latency: Duration,
    pub history_latency: Duration,
    /// View delay for any asset whose name contains the given fragment
    pub view_latency: Vec<(String, Duration)>,
}

struct MockJob {
    output_stage: String,
    filename: String,
    size: (u32, u32),
    polls: u32,
}

#[derive(Default)]
struct MockState {
    submitted: usize,
    jobs: HashMap<String, MockJob>,
    viewed: Vec<AssetLocator>,
}

/// A generation service that never leaves the process
#[derive(Default)]
pub struct MockService {
    behavior: MockBehavior,
    state: Mutex<MockState>,
    submit_calls: AtomicUsize,
    history_calls: AtomicUsize,
    view_calls: AtomicUsize,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behavior(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            ..Self::default()
        }
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }

    pub fn view_calls(&self) -> usize {
        self.view_calls.load(Ordering::SeqCst)
    }

    /// Every locator passed to `view`, in call order
    pub fn viewed(&self) -> Vec<AssetLocator> {
        self.state().viewed.clone()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl GenerationService for MockService {
    fn name(&self) -> &str {
        "mock"
    }

    fn health_check(&self) -> Result<ServiceStatus> {
        Ok(ServiceStatus::Available)
    }

    fn submit_prompt(
        &self,
        request: &GenerationRequest,
    ) -> std::result::Result<serde_json::Value, ServiceFailure> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.behavior.submit_latency);
        if let Some(failure) = &self.behavior.submit_failure {
            return Err(failure.clone());
        }

        let mut state = self.state();
        let n = state.submitted;
        state.submitted += 1;

        let prompt_id = self
            .behavior
            .prompt_ids
            .get(n)
            .cloned()
            .unwrap_or_else(|| format!("mock-{}", uuid::Uuid::new_v4()));
        let prefix = request
            .stage(request.output_stage())
            .and_then(|s| s.inputs.get("filename_prefix"))
            .and_then(|input| match input {
                crate::workflow::StageInput::Value(v) => v.as_str(),
                crate::workflow::StageInput::Link(..) => None,
            })
            .unwrap_or("ComfyUI");

        state.jobs.insert(
            prompt_id.clone(),
            MockJob {
                output_stage: request.output_stage().to_string(),
                filename: format!("{}_{:05}_.png", prefix, n + 1),
                size: latent_size(request),
                polls: 0,
            },
        );

        Ok(json!({ "prompt_id": prompt_id, "number": n, "node_errors": {} }))
    }

    fn history(&self, prompt_id: &str) -> std::result::Result<serde_json::Value, ServiceFailure> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.behavior.history_latency);
        if let Some(failure) = &self.behavior.history_failure {
            return Err(failure.clone());
        }
        if let Some(body) = &self.behavior.history_override {
            return Ok(body.clone());
        }

        let mut state = self.state();
        let Some(job) = state.jobs.get_mut(prompt_id) else {
            return Ok(json!({}));
        };
        if job.polls < self.behavior.pending_polls {
            job.polls += 1;
            return Ok(json!({}));
        }

        let images = self.behavior.images.clone().unwrap_or_else(|| {
            vec![json!({ "filename": job.filename, "subfolder": "", "type": "output" })]
        });
        Ok(json!({
            prompt_id: {
                "outputs": { job.output_stage.as_str(): { "images": images } },
                "status": { "status_str": "success", "completed": true }
            }
        }))
    }

    fn view(&self, locator: &AssetLocator) -> std::result::Result<Vec<u8>, ServiceFailure> {
        self.view_calls.fetch_add(1, Ordering::SeqCst);
        if let Some((_, delay)) = self
            .behavior
            .view_latency
            .iter()
            .find(|(fragment, _)| locator.name.contains(fragment.as_str()))
        {
            std::thread::sleep(*delay);
        }

        let size = {
            let mut state = self.state();
            state.viewed.push(locator.clone());
            state
                .jobs
                .values()
                .find(|job| job.filename == locator.name)
                .map(|job| job.size)
                .unwrap_or((FALLBACK_SIZE, FALLBACK_SIZE))
        };

        if let Some(failure) = &self.behavior.view_failure {
            return Err(failure.clone());
        }
        if let Some(payload) = &self.behavior.view_payload {
            return Ok(payload.clone());
        }
        solid_png(size.0, size.1, name_color(&locator.name))
    }
}

/// Width and height of the first empty-latent stage, if any
fn latent_size(request: &GenerationRequest) -> (u32, u32) {
    let dim = |stage: &crate::workflow::WorkflowStage, key: &str| match stage.inputs.get(key) {
        Some(crate::workflow::StageInput::Value(v)) => v.as_u64().map(|n| n as u32),
        _ => None,
    };
    request
        .stages()
        .values()
        .filter(|s| s.class_type == "EmptyLatentImage")
        .find_map(|s| Some((dim(s, "width")?, dim(s, "height")?)))
        .unwrap_or((FALLBACK_SIZE, FALLBACK_SIZE))
}

/// A warm colour derived from the asset name, so different jobs look different
fn name_color(name: &str) -> [u8; 3] {
    let hash_val = name
        .bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
    [
        ((hash_val >> 16) & 0xFF) as u8,
        ((hash_val >> 8) & 0xFF) as u8,
        (hash_val & 0xFF) as u8,
    ]
}

/// Encode a solid-colour PNG in memory
pub fn solid_png(
    width: u32,
    height: u32,
    rgb: [u8; 3],
) -> std::result::Result<Vec<u8>, ServiceFailure> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([rgb[0], rgb[1], rgb[2], 255]));
    let mut bytes = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .map_err(|e| ServiceFailure::Malformed(format!("Failed to encode PNG: {}", e)))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationConfig;
    use crate::workflow::TextToImage;

    fn request() -> GenerationRequest {
        let config = GenerationConfig {
            width: 32,
            height: 16,
            ..Default::default()
        };
        TextToImage::new(&config, "a marble bust").with_seed(1).build().unwrap()
    }

    #[test]
    fn test_mock_job_lifecycle() {
        let mock = MockService::with_behavior(MockBehavior {
            prompt_ids: vec!["abc123".into()],
            pending_polls: 1,
            ..Default::default()
        });

        let submitted = mock.submit_prompt(&request()).unwrap();
        assert_eq!(submitted["prompt_id"], "abc123");

        assert_eq!(mock.history("abc123").unwrap(), json!({}));
        let record = mock.history("abc123").unwrap();
        let image = &record["abc123"]["outputs"]["9"]["images"][0];
        assert_eq!(image["filename"], "museum_00001_.png");

        let locator = AssetLocator::from_parts(image["filename"].as_str(), Some(""), Some("output"));
        let png = mock.view(&locator).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 16));
        assert_eq!(mock.view_calls(), 1);
    }

    #[test]
    fn test_unknown_prompt_has_empty_history() {
        let mock = MockService::new();
        assert_eq!(mock.history("nope").unwrap(), json!({}));
    }

    #[test]
    fn test_scripted_failures() {
        let mock = MockService::with_behavior(MockBehavior {
            view_failure: Some(ServiceFailure::Status {
                code: 404,
                body: "not found".into(),
            }),
            ..Default::default()
        });
        let locator = AssetLocator::from_parts(Some("x.png"), None, None);
        assert!(matches!(
            mock.view(&locator),
            Err(ServiceFailure::Status { code: 404, .. })
        ));
        assert_eq!(mock.viewed(), vec![locator]);
    }
}

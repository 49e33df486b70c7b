//! Museum Gen - remote texture generation pipeline
//!
//! Submits a text-to-image workflow to a ComfyUI-style service, waits for
//! the result record, downloads the produced image into a session cache
//! and binds it onto the picture frames of the live scene.
//!
//! Stages, in order: [`submit`], [`resolve`], [`fetch`], then
//! [`museum_scene::SceneStore::apply_texture`]. [`Pipeline`] runs them.

pub mod cache;
pub mod config;
pub mod events;
pub mod fetch;
pub mod pipeline;
pub mod protocol;
pub mod resolve;
pub mod service;
pub mod services;
pub mod stage;
pub mod submit;
pub mod workflow;

pub use cache::AssetCache;
pub use config::MuseumConfig;
pub use events::{AssetSummary, PipelineEvent, RunId, RunStatus};
pub use fetch::fetch;
pub use pipeline::{Pipeline, PipelineRun, RunReport};
pub use resolve::resolve;
pub use service::{AssetLocator, GenerationService, JobHandle, ServiceStatus, SharedService};
pub use stage::StageLimits;
pub use submit::submit;
pub use workflow::{GenerationRequest, StageInput, TextToImage, WorkflowStage};

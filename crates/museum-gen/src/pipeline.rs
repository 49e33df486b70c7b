//! Pipeline Orchestrator - submit, resolve, fetch, bind

use crate::cache::AssetCache;
use crate::config::MuseumConfig;
use crate::events::{AssetSummary, PipelineEvent, RunId, RunStatus};
use crate::fetch::fetch;
use crate::resolve::resolve;
use crate::service::{AssetLocator, SharedService};
use crate::stage::StageLimits;
use crate::submit::submit;
use crate::workflow::GenerationRequest;
use museum_core::{AssetHandle, MuseumError, Result};
use museum_scene::{SceneStore, TargetSelector};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

const EVENT_CAPACITY: usize = 64;

/// What a successful run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run: RunId,
    pub prompt_id: String,
    pub locator: AssetLocator,
    pub asset: AssetHandle,
    /// Number of scene nodes now showing the asset
    pub rebound: usize,
    pub elapsed: Duration,
}

/// A run started with [`Pipeline::spawn`]
#[derive(Debug)]
pub struct PipelineRun {
    id: RunId,
    handle: JoinHandle<Result<RunReport>>,
}

impl PipelineRun {
    pub fn id(&self) -> RunId {
        self.id
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the run to end
    pub async fn join(self) -> Result<RunReport> {
        self.handle
            .await
            .map_err(|e| MuseumError::TaskFailed(format!("run {}: {}", self.id, e)))?
    }
}

struct Shared {
    service: SharedService,
    cache: Arc<AssetCache>,
    scene: SceneStore,
    selector: TargetSelector,
    limits: StageLimits,
    events: broadcast::Sender<PipelineEvent>,
    active: Arc<AtomicUsize>,
}

/// Runs generation requests against one service and binds the results
/// into one scene.
///
/// Runs are independent: several may be in flight, each binds when it
/// completes, and the last to complete wins on any node they share. A
/// failed run never touches the scene.
#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<Shared>,
}

impl Pipeline {
    pub fn new(
        service: SharedService,
        cache: AssetCache,
        scene: SceneStore,
        selector: TargetSelector,
        limits: StageLimits,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Shared {
                service,
                cache: Arc::new(cache),
                scene,
                selector,
                limits,
                events,
                active: Arc::new(AtomicUsize::new(0)),
            }),
        }
    }

    /// Build a pipeline with the configured target, limits and cache root
    pub fn from_config(
        config: &MuseumConfig,
        service: SharedService,
        scene: SceneStore,
    ) -> Result<Self> {
        let cache = AssetCache::create(&config.cache_dir)?;
        Ok(Self::new(
            service,
            cache,
            scene,
            config.selector(),
            config.stage_limits(),
        ))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.inner.events.subscribe()
    }

    /// Runs started but not yet finished
    pub fn active_runs(&self) -> usize {
        self.inner.active.load(Ordering::SeqCst)
    }

    pub fn scene(&self) -> &SceneStore {
        &self.inner.scene
    }

    pub fn cache(&self) -> &AssetCache {
        &self.inner.cache
    }

    pub fn service(&self) -> &SharedService {
        &self.inner.service
    }

    /// Start a run in the background and return immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(&self, request: GenerationRequest) -> PipelineRun {
        let id = RunId::new_v4();
        let guard = ActiveGuard::enter(&self.inner.active);
        let pipeline = self.clone();
        let handle = tokio::spawn(async move { pipeline.execute(id, request, guard).await });
        PipelineRun { id, handle }
    }

    /// Run all four stages and wait for the outcome
    pub async fn run(&self, request: GenerationRequest) -> Result<RunReport> {
        let guard = ActiveGuard::enter(&self.inner.active);
        self.execute(RunId::new_v4(), request, guard).await
    }

    async fn execute(
        &self,
        run: RunId,
        request: GenerationRequest,
        _guard: ActiveGuard,
    ) -> Result<RunReport> {
        let started = Instant::now();
        tracing::info!(%run, output_stage = request.output_stage(), "run started");

        match self.stages(run, &request, started).await {
            Ok(report) => {
                tracing::info!(
                    %run,
                    prompt_id = %report.prompt_id,
                    rebound = report.rebound,
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "run complete"
                );
                self.emit(PipelineEvent::Completed {
                    run,
                    prompt_id: report.prompt_id.clone(),
                    rebound: report.rebound,
                    asset: AssetSummary::from(&report.asset),
                });
                Ok(report)
            }
            Err(err) => {
                let stage = err.stage();
                tracing::error!(%run, stage = ?stage, error = %err, "run failed");
                self.status(run, RunStatus::Failed);
                self.emit(PipelineEvent::Failed {
                    run,
                    stage,
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn stages(
        &self,
        run: RunId,
        request: &GenerationRequest,
        started: Instant,
    ) -> Result<RunReport> {
        let s = &self.inner;

        self.status(run, RunStatus::Submitting);
        let job = submit(&s.service, request, s.limits).await?;
        let prompt_id = job.prompt_id.clone();

        self.status(run, RunStatus::Resolving);
        let locator = resolve(&s.service, job, s.limits).await?;

        self.status(run, RunStatus::Fetching);
        let asset = fetch(&s.service, &s.cache, &locator, s.limits).await?;

        self.status(run, RunStatus::Binding);
        let rebound = s.scene.apply_texture(&asset, &s.selector);
        if rebound == 0 {
            tracing::warn!(%run, selector = %s.selector, "no scene nodes matched; asset not displayed");
        }
        self.status(run, RunStatus::Complete);

        Ok(RunReport {
            run,
            prompt_id,
            locator,
            asset,
            rebound,
            elapsed: started.elapsed(),
        })
    }

    fn status(&self, run: RunId, status: RunStatus) {
        tracing::debug!(%run, %status, "run status");
        self.emit(PipelineEvent::Status { run, status });
    }

    fn emit(&self, event: PipelineEvent) {
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }
}

/// Counts a run as active until dropped
struct ActiveGuard(Arc<AtomicUsize>);

impl ActiveGuard {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

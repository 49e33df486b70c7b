//! Generate command: run the full pipeline against a scene file

use super::{load_config, runtime};
use anyhow::{Context, Result};
use museum_core::AssetHandle;
use museum_gen::services::create_service;
use museum_gen::{Pipeline, PipelineEvent, RunReport, TextToImage};
use museum_scene::{graph_to_scene_file, load_scene, SceneStore};
use std::fs;
use std::path::{Path, PathBuf};

pub struct GenerateArgs {
    pub scene: String,
    pub prompt: String,
    pub negative: Option<String>,
    pub seed: Option<u64>,
    pub service: Option<String>,
    pub target: Option<String>,
    pub output: Option<String>,
}

pub fn run(args: GenerateArgs) -> Result<()> {
    let config = load_config(args.service.as_deref(), args.target.as_deref())?;
    let graph = load_scene(&args.scene)
        .with_context(|| format!("Failed to load scene: {}", args.scene))?;

    let mut builder = TextToImage::new(&config.generation, &args.prompt);
    if let Some(negative) = &args.negative {
        builder = builder.with_negative(negative.as_str());
    }
    if let Some(seed) = args.seed {
        builder = builder.with_seed(seed);
    }
    let request = builder.build()?;

    let service = create_service(&config.service.kind, &config)?;
    println!(
        "Generating with {} ({}) for targets matching {}",
        service.name(),
        config.service.url,
        config.selector()
    );

    let rt = runtime()?;
    rt.block_on(async {
        let pipeline = Pipeline::from_config(&config, service, SceneStore::new(graph))?;
        let mut events = pipeline.subscribe();
        let run = pipeline.spawn(request);
        let run_id = run.id();

        // Progress until this run reports an outcome
        while let Ok(event) = events.recv().await {
            if event.run() != run_id {
                continue;
            }
            match event {
                PipelineEvent::Status { status, .. } if status.is_active() => {
                    println!("  {}...", status);
                }
                PipelineEvent::Status { .. } => {}
                PipelineEvent::Completed { .. } | PipelineEvent::Failed { .. } => break,
            }
        }

        let report = run.join().await?;
        print_report(&report);

        if let Some(output) = &args.output {
            save_output(&pipeline, &report.asset, Path::new(output))?;
        }
        Ok::<(), anyhow::Error>(())
    })
}

fn print_report(report: &RunReport) {
    println!("  Prompt id: {}", report.prompt_id);
    println!("  Asset: {}", report.locator);
    let (w, h) = report.asset.dimensions();
    println!("  Image: {}x{}, {} bytes, {}", w, h, report.asset.byte_len(), report.asset.hash());
    if report.rebound == 0 {
        println!("  Warning: no meshes matched; nothing was rebound");
    } else {
        println!("  Rebound: {} mesh(es)", report.rebound);
    }
    println!("  Done in {:.1}s", report.elapsed.as_secs_f64());
}

/// Save the scene with the generated image copied beside it.
///
/// The session cache is removed on exit, so the saved scene must not
/// point into it.
fn save_output(pipeline: &Pipeline, asset: &AssetHandle, output: &Path) -> Result<()> {
    let extension = asset
        .path()
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("png");
    let stem = output
        .file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.trim_end_matches(".scene"))
        .unwrap_or("scene");
    let dir = output.parent().unwrap_or_else(|| Path::new(""));
    let kept: PathBuf = dir.join(format!("{}-{}.{}", stem, asset.hash().short(), extension));

    if !dir.as_os_str().is_empty() {
        fs::create_dir_all(dir)?;
    }
    fs::copy(asset.path(), &kept)
        .with_context(|| format!("Failed to copy generated image to {}", kept.display()))?;

    let cached = asset.path().display().to_string();
    let kept_name = kept
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| kept.display().to_string());

    let mut file = graph_to_scene_file(&pipeline.scene().snapshot());
    for def in file.materials.values_mut() {
        if def.map.as_deref() == Some(cached.as_str()) {
            def.map = Some(kept_name.clone());
        }
    }
    fs::write(output, toml::to_string_pretty(&file)?)?;

    println!("  Saved: {} (image: {})", output.display(), kept.display());
    Ok(())
}

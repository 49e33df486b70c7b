//! Scene inspection commands

use super::load_config;
use anyhow::{Context, Result};
use clap::Subcommand;
use museum_core::NodeId;
use museum_scene::{load_scene, matching_targets, SceneGraph};

#[derive(Subcommand)]
pub enum SceneCommands {
    /// List the meshes a generated texture would be bound onto
    Targets {
        /// Path to scene file
        path: String,

        /// Name fragment selecting the target meshes
        #[arg(long)]
        target: Option<String>,
    },

    /// Show scene information
    Info {
        /// Path to scene file
        path: String,
    },
}

pub fn run(cmd: SceneCommands) -> Result<()> {
    match cmd {
        SceneCommands::Targets { path, target } => targets(&path, target.as_deref()),
        SceneCommands::Info { path } => info(&path),
    }
}

fn targets(path: &str, target: Option<&str>) -> Result<()> {
    let config = load_config(None, target)?;
    let selector = config.selector();
    let graph = load_scene(path).with_context(|| format!("Failed to load scene: {}", path))?;

    let ids = matching_targets(&graph, &selector);
    if ids.is_empty() {
        println!("No meshes match {}", selector);
        return Ok(());
    }

    println!("{} mesh(es) match {}:", ids.len(), selector);
    for id in ids {
        if let Some(node) = graph.get(id) {
            println!("  {}", node.name());
        }
    }
    Ok(())
}

fn info(path: &str) -> Result<()> {
    let config = load_config(None, None)?;
    let graph = load_scene(path).with_context(|| format!("Failed to load scene: {}", path))?;

    let mut meshes = 0;
    let mut textured = 0;
    graph.traverse(|node| {
        if node.is_mesh() {
            meshes += 1;
            if node.material().and_then(|m| m.map.as_ref()).is_some() {
                textured += 1;
            }
        }
    });

    println!("Scene: {}", graph.name());
    println!("File: {}", path);
    println!("Nodes: {} ({} meshes, {} textured)", graph.node_count(), meshes, textured);
    println!(
        "Targets ({}): {}",
        config.selector(),
        matching_targets(&graph, &config.selector()).len()
    );
    println!();
    for &root in graph.roots() {
        print_tree(&graph, root, 0);
    }
    Ok(())
}

fn print_tree(graph: &SceneGraph, id: NodeId, depth: usize) {
    let Some(node) = graph.get(id) else {
        return;
    };
    let material = node
        .material()
        .map(|m| format!(" [{}]", m.name))
        .unwrap_or_default();
    println!("{}{} ({}){}", "  ".repeat(depth), node.name(), node.kind(), material);
    for &child in graph.children(id) {
        print_tree(graph, child, depth + 1);
    }
}

//! Museum CLI - generate artwork for the museum scene from the command line

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{generate, health, scene, workflow};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "museum")]
#[command(about = "Generate AI artwork and hang it in the museum scene", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an image and bind it onto the scene's picture frames
    Generate {
        /// Path to scene file
        scene: String,

        /// Text prompt describing the artwork
        #[arg(long)]
        prompt: String,

        /// Negative prompt (defaults to the configured one)
        #[arg(long)]
        negative: Option<String>,

        /// Sampler seed (random when omitted)
        #[arg(long)]
        seed: Option<u64>,

        /// Generation service: comfyui or mock
        #[arg(long)]
        service: Option<String>,

        /// Name fragment selecting the target meshes
        #[arg(long)]
        target: Option<String>,

        /// Write the updated scene here
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Scene inspection
    #[command(subcommand)]
    Scene(scene::SceneCommands),

    /// Print the workflow JSON that would be submitted
    Workflow {
        /// Text prompt describing the artwork
        #[arg(long)]
        prompt: String,

        /// Negative prompt (defaults to the configured one)
        #[arg(long)]
        negative: Option<String>,

        /// Sampler seed (random when omitted)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Check that the generation service is reachable
    Health {
        /// Generation service: comfyui or mock
        #[arg(long)]
        service: Option<String>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            scene,
            prompt,
            negative,
            seed,
            service,
            target,
            output,
        } => generate::run(generate::GenerateArgs {
            scene,
            prompt,
            negative,
            seed,
            service,
            target,
            output,
        }),
        Commands::Scene(cmd) => scene::run(cmd),
        Commands::Workflow {
            prompt,
            negative,
            seed,
        } => workflow::run(&prompt, negative.as_deref(), seed),
        Commands::Health { service } => health::run(service.as_deref()),
    }
}

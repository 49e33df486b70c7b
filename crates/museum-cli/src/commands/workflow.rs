//! Workflow preview command

use super::load_config;
use anyhow::Result;
use museum_gen::TextToImage;

pub fn run(prompt: &str, negative: Option<&str>, seed: Option<u64>) -> Result<()> {
    let config = load_config(None, None)?;

    let mut builder = TextToImage::new(&config.generation, prompt);
    if let Some(negative) = negative {
        builder = builder.with_negative(negative);
    }
    if let Some(seed) = seed {
        builder = builder.with_seed(seed);
    }
    let request = builder.build()?;

    println!("{}", serde_json::to_string_pretty(&request.to_prompt())?);
    Ok(())
}

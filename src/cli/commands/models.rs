//! Models command - list generative models for the configured API key.

use crate::config::Settings;
use crate::providers::{self, GeminiClient};

pub async fn run(config: &Settings, method: &str) -> anyhow::Result<()> {
    if config.generation.api_key.is_empty() {
        anyhow::bail!("generation.api_key is not set (GEMINI_API_KEY or RAG_GENERATION__API_KEY)");
    }

    let http = providers::http_client(&config.providers)?;
    let client = GeminiClient::from_settings(http, config);
    let models = client.list_models(method).await?;

    if models.is_empty() {
        println!("No models found that support '{method}'.");
        println!("Check the API key permissions or https://ai.google.dev/models");
        return Ok(());
    }

    println!("Models supporting '{method}':");
    for model in &models {
        println!("  {}", model.name);
        if !model.display_name.is_empty() {
            println!("    Display Name: {}", model.display_name);
        }
        println!(
            "    Supported Methods: {}",
            model.supported_generation_methods.join(", ")
        );
    }
    Ok(())
}

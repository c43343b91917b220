use clap::Parser;
use glossa::config::Config;

use crate::error::CliResult;
use crate::output::OutputFormat;

#[derive(Parser)]
pub struct ConfigCommand {}

impl ConfigCommand {
    pub fn execute(&self, config: &Config, format: OutputFormat) -> CliResult<()> {
        match format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "completion": {
                        "reserved_output_tokens": config.completion.reserved_output_tokens,
                        "filler_turn": config.completion.filler_turn,
                    },
                    "models": config.models.iter().map(|m| {
                        serde_json::json!({
                            "name": m.name,
                            "family": m.family,
                            "context_tokens": m.context_tokens,
                            "vision": m.vision,
                        })
                    }).collect::<Vec<_>>(),
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                println!("Resolved configuration");
                println!("======================\n");
                println!(
                    "reserved_output_tokens = {}",
                    config.completion.reserved_output_tokens
                );
                println!("filler_turn = {:?}", config.completion.filler_turn);
                if config.models.is_empty() {
                    println!("\nNo extra model entries configured");
                } else {
                    println!("\nExtra model entries:");
                    for model in &config.models {
                        println!(
                            "  {} ({}, {} tokens{})",
                            model.name,
                            model.family,
                            model.context_tokens,
                            if model.vision { ", vision" } else { "" }
                        );
                    }
                }
            }
        }

        Ok(())
    }
}

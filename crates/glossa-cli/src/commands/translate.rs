use std::path::PathBuf;

use clap::Parser;
use glossa::config::Config;
use glossa::dialect::WirePayload;
use glossa::prompt::Prompt;

use crate::error::CliResult;
use crate::output::OutputFormat;

#[derive(Parser)]
pub struct TranslateCommand {
    #[clap(long, short, help = "Target model name (selects the dialect)")]
    pub model: String,

    #[clap(help = "Path to a prompt JSON file")]
    pub prompt_file: PathBuf,
}

impl TranslateCommand {
    pub fn execute(&self, config: &Config, format: OutputFormat) -> CliResult<()> {
        let content = std::fs::read_to_string(&self.prompt_file)?;
        let prompt: Prompt = serde_json::from_str(&content)?;

        let dialect = config
            .model_table()?
            .select(&self.model)?
            .with_options(config.translate_options());
        let payload = dialect.translate(&prompt)?;

        match format {
            OutputFormat::Json => {
                let output = match &payload {
                    WirePayload::Json(body) => serde_json::json!({
                        "model": self.model,
                        "family": dialect.family().as_str(),
                        "payload": body,
                    }),
                    WirePayload::Text(text) => serde_json::json!({
                        "model": self.model,
                        "family": dialect.family().as_str(),
                        "payload": text,
                    }),
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                println!("Model:  {}", self.model);
                println!("Family: {}", dialect.family());
                println!("Window: {} tokens\n", dialect.max_prompt_tokens());
                match &payload {
                    WirePayload::Json(body) => {
                        println!("{}", serde_json::to_string_pretty(body)?)
                    }
                    WirePayload::Text(text) => println!("{text}"),
                }
            }
        }

        Ok(())
    }
}

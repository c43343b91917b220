use clap::Parser;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use glossa::config::Config;

use crate::error::CliResult;
use crate::output::OutputFormat;

#[derive(Parser)]
pub struct ModelsCommand {
    #[clap(long, help = "Filter to one provider family")]
    pub family: Option<String>,
}

impl ModelsCommand {
    pub fn execute(&self, config: &Config, format: OutputFormat) -> CliResult<()> {
        let table = config.model_table()?;
        let specs: Vec<_> = table
            .specs()
            .iter()
            .filter(|spec| {
                self.family
                    .as_deref()
                    .is_none_or(|family| spec.family.as_str() == family)
            })
            .collect();

        match format {
            OutputFormat::Json => {
                let output: Vec<_> = specs
                    .iter()
                    .map(|spec| {
                        serde_json::json!({
                            "model": spec.prefix,
                            "family": spec.family.as_str(),
                            "context_tokens": spec.context_tokens,
                            "vision": spec.vision,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                let mut out = Table::new();
                out.load_preset(UTF8_FULL_CONDENSED)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(["Model", "Family", "Context", "Vision"]);

                for spec in &specs {
                    out.add_row([
                        spec.prefix.as_str(),
                        spec.family.as_str(),
                        &spec.context_tokens.to_string(),
                        if spec.vision { "yes" } else { "no" },
                    ]);
                }

                println!("{out}");
                println!("\n{} models known", specs.len());
            }
        }

        Ok(())
    }
}

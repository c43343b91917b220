use std::io::{Read, Write};
use std::path::PathBuf;

use clap::Parser;
use futures::stream;
use glossa::stream::drive_stream;
use tokio::sync::mpsc;

use crate::error::CliResult;
use crate::output::OutputFormat;

#[derive(Parser)]
pub struct NormalizeCommand {
    #[clap(help = "Path to a captured raw response (stdin when omitted)")]
    pub capture_file: Option<PathBuf>,

    #[clap(
        long,
        default_value_t = 16,
        help = "Replay chunk size in characters, simulating network arrival"
    )]
    pub chunk_size: usize,
}

impl NormalizeCommand {
    pub async fn execute(&self, format: OutputFormat) -> CliResult<()> {
        let raw = match &self.capture_file {
            Some(path) => std::fs::read_to_string(path)?,
            None => {
                let mut buffer = String::new();
                std::io::stdin().read_to_string(&mut buffer)?;
                buffer
            }
        };

        let chunk_size = self.chunk_size.max(1);
        let chars: Vec<char> = raw.chars().collect();
        let chunks: Vec<glossa::error::Result<String>> = chars
            .chunks(chunk_size)
            .map(|chunk| Ok(chunk.iter().collect()))
            .collect();

        let (delta_tx, mut delta_rx) = mpsc::channel(16);
        let live = matches!(format, OutputFormat::Table);
        let printer = tokio::spawn(async move {
            while let Some(delta) = delta_rx.recv().await {
                if live {
                    print!("{delta}");
                    let _ = std::io::stdout().flush();
                }
            }
        });

        let response = drive_stream(stream::iter(chunks), delta_tx).await?;
        printer.await.ok();

        match format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "prose": response.prose,
                    "function_calls": response.function_calls,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                println!();
                match &response.function_calls {
                    Some(calls) => {
                        println!("--- tool calls ---");
                        println!("{calls}");
                    }
                    None => println!("--- no tool calls ---"),
                }
            }
        }

        Ok(())
    }
}

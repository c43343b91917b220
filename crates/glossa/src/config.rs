//! Configuration for Glossa
//!
//! Deployments tune translation via a TOML file: how many tokens to hold
//! back for the model's reply, the filler turn used to restore strict
//! alternation, and extra model entries layered over the built-in table.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::dialect::{ModelOverride, ModelTable, TranslateOptions};
use crate::error::{GlossaError, Result};

/// Main configuration structure for Glossa
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Completion/translation tuning
    #[serde(default)]
    pub completion: CompletionConfig,
    /// Extra model entries layered over the built-in table
    #[serde(default)]
    pub models: Vec<ModelOverride>,
}

/// Completion/translation tuning
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionConfig {
    /// Tokens reserved for the model's reply when trimming the prompt
    #[serde(default = "default_reserved_output_tokens")]
    pub reserved_output_tokens: usize,
    /// Synthetic turn inserted to restore strict turn alternation
    #[serde(default = "default_filler_turn")]
    pub filler_turn: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            reserved_output_tokens: default_reserved_output_tokens(),
            filler_turn: default_filler_turn(),
        }
    }
}

fn default_reserved_output_tokens() -> usize {
    3_500
}

fn default_filler_turn() -> String {
    "OK".to_string()
}

impl Config {
    /// Parse a config file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GlossaError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| GlossaError::Config(format!("Failed to parse config: {e}")))
    }

    /// Load from an explicit path, or the first discovered default
    /// location, or built-in defaults when no file exists.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            tracing::info!("Loading config from: {}", path.display());
            return Self::from_path(path);
        }

        let default_paths = [
            dirs::home_dir().map(|h| h.join(".glossa").join("config.toml")),
            dirs::config_dir().map(|c| c.join("glossa").join("config.toml")),
            Some(PathBuf::from("glossa.toml")),
        ];

        for candidate in default_paths.iter().flatten() {
            if candidate.exists() {
                tracing::info!("Loading config from: {}", candidate.display());
                return Self::from_path(candidate);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// The model table with this config's extra entries applied.
    pub fn model_table(&self) -> Result<ModelTable> {
        ModelTable::with_overrides(&self.models)
    }

    /// Translation options derived from this config.
    pub fn translate_options(&self) -> TranslateOptions {
        TranslateOptions {
            reserved_output_tokens: self.completion.reserved_output_tokens,
            filler_turn: self.completion.filler_turn.clone(),
        }
    }
}

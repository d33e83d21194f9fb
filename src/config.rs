use crate::llm::LlmConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// A program configuration error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to perform io")]
    Io(
        #[from]
        #[source]
        std::io::Error,
    ),
    #[error("failed to deserialize toml")]
    TomlDe(
        #[from]
        #[source]
        toml::de::Error,
    ),
}

/// A program configuration.
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,
    pub llm: LlmConfig,
}

fn default_data_path() -> PathBuf {
    PathBuf::from("data/flights.json")
}

impl Config {
    /// Reads program configuration from a file.
    pub fn read(path: &Path) -> Result<Self, Error> {
        let s = std::fs::read_to_string(path)?;
        toml::from_str(&s).map_err(Into::into)
    }
}

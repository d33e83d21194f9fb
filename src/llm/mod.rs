pub mod ollama;

use ollama::{OllamaClient, OllamaConfig};
use serde::Deserialize;
use std::{
    sync::{atomic::AtomicBool, Arc},
    time::Duration,
};

const DEFAULT_PROMPT_FMT: &str = "Give me the total number of canceled, scheduled, active, \
landed, incident and diverted flights, with an extra explanation giving the respective \
flight_date and airline for each canceled flight. Use the format 'canceled': 10.\n\
Context: {context}\n\
Flights: {data}";

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmApi {
    Ollama,
}

/// An LLM API configuration.
#[derive(Debug, Deserialize)]
pub struct LlmConfig {
    pub api: LlmApi,
    pub ollama: Option<OllamaConfig>,
    /// A prompt template with `{context}` and `{data}` placeholders.
    #[serde(default = "default_prompt_fmt")]
    pub prompt_fmt: String,
}

fn default_prompt_fmt() -> String {
    DEFAULT_PROMPT_FMT.to_owned()
}

/// An LLM API error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("generation cancelled")]
    Cancelled,
    #[error("response stream ended before completion")]
    IncompleteResponse,
    #[error("io error")]
    Io(
        #[from]
        #[source]
        std::io::Error,
    ),
    #[error("malformed config: {0}")]
    MalformedConfig(&'static str),
    #[error("failed to (de)serialize json")]
    SerdeJson(
        #[from]
        #[source]
        serde_json::Error,
    ),
    #[error("ureq error")]
    Ureq(
        #[from]
        #[source]
        Box<ureq::Error>,
    ),
    #[error("unsupported url")]
    UnsupportedUrl,
}

impl From<ureq::Error> for Error {
    fn from(value: ureq::Error) -> Self {
        Error::Ureq(Box::new(value))
    }
}

/// A text generated by LLM.
#[derive(Debug, Default)]
pub struct Generation {
    pub text: String,
    /// Time the server spent on the whole request, if reported.
    pub total_duration: Option<Duration>,
    /// Number of generated tokens, if reported.
    pub eval_count: Option<u64>,
}

/// An LLM API client.
pub trait LlmClient {
    /// Generates a completion for a given prompt.
    ///
    /// Every received text fragment is passed to `on_chunk` as it arrives.
    fn generate(
        &self,
        prompt: &str,
        cancel: Arc<AtomicBool>,
        on_chunk: &mut dyn FnMut(&str),
    ) -> Result<Generation, Error>;
}

/// An owned dynamically typed LLM API client.
pub type BoxLlm = Box<dyn LlmClient>;

/// Creates an LLM API client.
pub fn create_llm_client(config: &LlmConfig) -> Result<BoxLlm, Error> {
    match config.api {
        LlmApi::Ollama => {
            let Some(ollama_config) = &config.ollama else {
                return Err(Error::MalformedConfig("missing ollama config"));
            };
            OllamaClient::new_boxed(ollama_config.clone())
        }
    }
}

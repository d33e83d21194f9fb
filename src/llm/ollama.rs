use crate::llm::{BoxLlm, Error, Generation, LlmClient};
use log::debug;
use serde::{Deserialize, Serialize};
use std::{
    io::{BufRead, BufReader},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use url::Url;

/// An Ollama LLM API configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct OllamaConfig {
    pub base_url: Url,
    pub model: String,
    /// Receive the response in fragments as they are generated.
    #[serde(default)]
    pub stream: bool,
    pub temperature: Option<f32>,
    /// A response format constraint, e.g. "json".
    pub format: Option<String>,
}

/// An Ollama API client.
pub struct OllamaClient {
    config: OllamaConfig,
}

impl OllamaClient {
    /// Creates a boxed Ollama instance.
    pub fn new_boxed(config: OllamaConfig) -> Result<BoxLlm, Error> {
        if config.base_url.cannot_be_a_base() {
            return Err(Error::UnsupportedUrl);
        }
        Ok(Box::new(Self { config }))
    }

    fn generate_url(&self) -> Url {
        let mut url = self.config.base_url.clone();
        url.set_path(&format!("{}api/generate", url.path()));
        url
    }

    fn request<'a>(&'a self, prompt: &'a str) -> GenerateRequestPayload<'a> {
        GenerateRequestPayload {
            model: &self.config.model,
            prompt,
            stream: self.config.stream,
            format: self.config.format.as_deref(),
            options: self
                .config
                .temperature
                .map(|temperature| GenerateOptions { temperature }),
        }
    }
}

impl LlmClient for OllamaClient {
    fn generate(
        &self,
        prompt: &str,
        cancel: Arc<AtomicBool>,
        on_chunk: &mut dyn FnMut(&str),
    ) -> Result<Generation, Error> {
        let url = self.generate_url();
        debug!("posting generation request to {url}");

        let response = ureq::post(url.as_str()).send_json(self.request(prompt))?;

        if self.config.stream {
            read_stream(BufReader::new(response.into_reader()), &cancel, on_chunk)
        } else {
            let payload: GenerateResponsePayload = response.into_json()?;
            let mut generation = Generation::default();
            payload.append_to(&mut generation, on_chunk);
            Ok(generation)
        }
    }
}

/// Reads newline-delimited response fragments until the final one.
fn read_stream(
    reader: impl BufRead,
    cancel: &AtomicBool,
    on_chunk: &mut dyn FnMut(&str),
) -> Result<Generation, Error> {
    let mut generation = Generation::default();
    for line in reader.lines() {
        if cancel.load(Ordering::SeqCst) {
            return Err(Error::Cancelled);
        }

        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let payload: GenerateResponsePayload = serde_json::from_str(&line)?;
        let done = payload.done;
        payload.append_to(&mut generation, on_chunk);
        if done {
            return Ok(generation);
        }
    }
    Err(Error::IncompleteResponse)
}

#[derive(Serialize)]
struct GenerateRequestPayload<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerateOptions>,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponsePayload {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    /// In nanoseconds.
    total_duration: Option<u64>,
    eval_count: Option<u64>,
}

impl GenerateResponsePayload {
    fn append_to(self, generation: &mut Generation, on_chunk: &mut dyn FnMut(&str)) {
        if !self.response.is_empty() {
            on_chunk(&self.response);
            generation.text.push_str(&self.response);
        }
        if let Some(nanos) = self.total_duration {
            generation.total_duration = Some(Duration::from_nanos(nanos));
        }
        if self.eval_count.is_some() {
            generation.eval_count = self.eval_count;
        }
    }
}

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use strfmt::strfmt;
use sys_locale::get_locale;

/// A prompt building error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to serialize context")]
    SerdeJson(
        #[from]
        #[source]
        serde_json::Error,
    ),
    #[error("failed to format prompt")]
    Strfmt(
        #[from]
        #[source]
        strfmt::FmtError,
    ),
}

/// An LLM prompt context.
#[derive(Serialize)]
pub struct Context {
    system_locale: String,
    time_now: DateTime<Utc>,
}

impl Context {
    /// Creates a Context instance for the current moment.
    pub fn new() -> Context {
        Context {
            system_locale: get_locale().unwrap_or("en-US".to_owned()),
            time_now: Utc::now(),
        }
    }

    /// Substitutes `{context}` and `{data}` in a prompt template.
    pub fn contextualize(&self, prompt_fmt: &str, data: &str) -> Result<String, Error> {
        let context = serde_json::to_string(self)?;

        let mut vars = HashMap::new();
        vars.insert("context".to_owned(), context);
        vars.insert("data".to_owned(), data.to_owned());

        strfmt(prompt_fmt, &vars).map_err(Into::into)
    }
}

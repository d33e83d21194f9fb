//! Summarizes flight records with a locally hosted LLM.

pub mod config;
pub mod context;
pub mod flight;
pub mod llm;
pub mod timestamp;
pub mod util;

pub mod record;

use crate::{flight::record::LiveFlight, util::fmt::ErrorChainDisplay};
use log::{debug, info, warn};
use serde_json::{Map, Value};
use std::path::Path;

/// A flight data import error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read flight data")]
    Io(
        #[from]
        #[source]
        std::io::Error,
    ),
    #[error("failed to deserialize flight data")]
    SerdeJson(
        #[from]
        #[source]
        serde_json::Error,
    ),
}

/// A flight document loaded from a file.
#[derive(Debug)]
pub struct FlightData {
    /// The file content as is.
    pub raw: String,
    pub doc: Map<String, Value>,
    /// The document decoded as a flight record, if it is one.
    pub record: Option<LiveFlight>,
}

impl FlightData {
    /// Reads a JSON object from a file.
    pub fn import(path: &Path) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_text(raw)
    }

    fn from_text(raw: String) -> Result<Self, Error> {
        let doc: Map<String, Value> = serde_json::from_str(&raw)?;

        match doc.get("flight_date") {
            Some(flight_date) => info!("found flight_date {flight_date}"),
            None => warn!("flight document has no flight_date field"),
        }

        let record = match serde_json::from_str::<LiveFlight>(&raw) {
            Ok(record) => {
                debug!(
                    "decoded flight {} with status {} created at {}",
                    record.flight.iata.as_deref().unwrap_or("-"),
                    record
                        .flight_status
                        .map_or_else(|| "-".to_owned(), |s| s.to_string()),
                    record.created_at,
                );
                Some(record)
            }
            Err(err) => {
                warn!("failed to decode flight record: {}", ErrorChainDisplay(&err));
                None
            }
        };

        Ok(FlightData { raw, doc, record })
    }
}

use crate::timestamp::FlexibleTimestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// A flight status as reported by the flight feed.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlightStatus {
    Scheduled,
    Active,
    Landed,
    #[serde(rename = "canceled")]
    Cancelled,
    Incident,
    Diverted,
}

impl Display for FlightStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FlightStatus::Scheduled => "scheduled",
            FlightStatus::Active => "active",
            FlightStatus::Landed => "landed",
            FlightStatus::Cancelled => "canceled",
            FlightStatus::Incident => "incident",
            FlightStatus::Diverted => "diverted",
        };
        f.write_str(s)
    }
}

/// A departure or arrival side of a flight.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Endpoint {
    pub airport: Option<String>,
    pub timezone: Option<String>,
    pub iata: Option<String>,
    pub icao: Option<String>,
    pub terminal: Option<Value>,
    pub gate: Option<Value>,
    pub baggage: Option<Value>,
    /// In minutes.
    pub delay: Option<i64>,
    pub scheduled: FlexibleTimestamp,
    pub estimated: FlexibleTimestamp,
    pub actual: FlexibleTimestamp,
    pub estimated_runway: FlexibleTimestamp,
    pub actual_runway: FlexibleTimestamp,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Airline {
    pub name: Option<String>,
    pub iata: Option<String>,
    pub icao: Option<String>,
}

/// A flight operated under another carrier's number.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Codeshare {
    pub airline_name: Option<String>,
    pub airline_iata: Option<String>,
    pub airline_icao: Option<String>,
    pub flight_number: Option<String>,
    pub flight_iata: Option<String>,
    pub flight_icao: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Flight {
    pub number: Option<String>,
    pub iata: Option<String>,
    pub icao: Option<String>,
    pub codeshared: Option<Codeshare>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Aircraft {
    pub registration: Option<String>,
    pub iata: Option<String>,
    pub icao: Option<String>,
    pub icao24: Option<String>,
}

/// A live position report.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Live {
    pub updated: Option<String>,
    pub latitude: Option<f32>,
    pub longitude: Option<f32>,
    pub altitude: Option<f32>,
    pub direction: Option<f32>,
    pub speed_horizontal: Option<f32>,
    pub speed_vertical: Option<f32>,
    pub is_ground: bool,
}

/// A flight record of the flight feed.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LiveFlight {
    pub id: Option<Uuid>,
    pub flight_date: Option<String>,
    pub flight_status: Option<FlightStatus>,
    pub departure: Endpoint,
    pub arrival: Endpoint,
    pub airline: Airline,
    pub flight: Flight,
    pub aircraft: Option<Aircraft>,
    pub live: Option<Live>,
    pub created_at: FlexibleTimestamp,
}

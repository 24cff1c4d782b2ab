// src/shared_data.rs

use crate::error::DataQualityError;
use chrono::{Datelike, Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type RoadId = u64;

/// Local wall-clock time, the resolution the store records timestamps at.
pub fn current_timestamp() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Day of week in the 1-7 convention with Sunday = 1.
pub fn day_of_week(ts: &NaiveDateTime) -> u8 {
    ts.weekday().number_from_sunday() as u8
}

/// Ordinal congestion label. Variants are declared in increasing order of
/// congestion ratio so the derived `Ord` matches severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }

    /// Parses a stored label. Matching is exact, as labels are written by
    /// this crate.
    pub fn from_label(label: &str) -> Option<Severity> {
        Severity::ALL.into_iter().find(|s| s.as_str() == label)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weather category attached to observations and prediction requests.
///
/// Unknown labels are coerced to `Clear` on the way in, so a typo in an
/// imported file degrades to the default rather than rejecting the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Weather {
    #[default]
    Clear,
    Rain,
    Fog,
    Snow,
    Storm,
}

impl Weather {
    pub fn as_str(&self) -> &'static str {
        match self {
            Weather::Clear => "Clear",
            Weather::Rain => "Rain",
            Weather::Fog => "Fog",
            Weather::Snow => "Snow",
            Weather::Storm => "Storm",
        }
    }

    pub fn parse(label: &str) -> Option<Weather> {
        match label.trim() {
            "Clear" => Some(Weather::Clear),
            "Rain" => Some(Weather::Rain),
            "Fog" => Some(Weather::Fog),
            "Snow" => Some(Weather::Snow),
            "Storm" => Some(Weather::Storm),
            _ => None,
        }
    }
}

impl From<String> for Weather {
    fn from(label: String) -> Self {
        Weather::parse(&label).unwrap_or_else(|| {
            log::warn!("unknown weather {:?}, treating as Clear", label);
            Weather::Clear
        })
    }
}

impl From<Weather> for String {
    fn from(weather: Weather) -> Self {
        weather.as_str().to_string()
    }
}

impl fmt::Display for Weather {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which path produced a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Heuristic,
    Learned,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Heuristic => f.write_str("heuristic"),
            Provenance::Learned => f.write_str("learned"),
        }
    }
}

/// A road segment in the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Road {
    pub id: RoadId,
    pub road_name: String,
    pub area: String,
    pub city: String,
    /// Vehicles the segment holds before it is considered critical.
    pub capacity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRoad {
    pub road_name: String,
    pub area: String,
    pub city: String,
    pub capacity: u32,
}

/// A single vehicle-count reading. Append-only once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub id: u64,
    pub road_id: RoadId,
    pub vehicle_count: u32,
    /// Label recorded at ingest. Kept as text so rows written by other tools
    /// can be inspected instead of failing to load.
    pub congestion_level: String,
    pub weather: Weather,
    pub is_holiday: bool,
    pub recorded_at: NaiveDateTime,
}

impl Observation {
    pub fn hour(&self) -> u8 {
        self.recorded_at.hour() as u8
    }

    pub fn day_of_week(&self) -> u8 {
        day_of_week(&self.recorded_at)
    }

    pub fn severity(&self) -> Result<Severity, DataQualityError> {
        Severity::from_label(&self.congestion_level)
            .ok_or_else(|| DataQualityError::UnknownSeverity(self.congestion_level.clone()))
    }
}

#[derive(Debug, Clone)]
pub struct NewObservation {
    pub road_id: RoadId,
    pub vehicle_count: u32,
    pub congestion_level: Severity,
    pub weather: Weather,
    pub is_holiday: bool,
    pub recorded_at: NaiveDateTime,
}

/// A persisted engine output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: u64,
    pub road_id: RoadId,
    pub predicted_level: Severity,
    pub confidence: f64,
    pub hour: u8,
    pub weather: Weather,
    pub is_holiday: bool,
    pub provenance: Provenance,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewPrediction {
    pub road_id: RoadId,
    pub predicted_level: Severity,
    pub confidence: f64,
    pub hour: u8,
    pub weather: Weather,
    pub is_holiday: bool,
    pub provenance: Provenance,
    pub created_at: NaiveDateTime,
}

/// Inbound prediction request. A missing hour means "now".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub road_id: RoadId,
    #[serde(default)]
    pub hour: Option<u8>,
    #[serde(default)]
    pub weather: Weather,
    #[serde(default)]
    pub is_holiday: bool,
}

/// What a caller gets back from a successful prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub road_id: RoadId,
    pub road_name: String,
    pub hour: u8,
    pub weather: Weather,
    pub is_holiday: bool,
    pub predicted_level: Severity,
    pub confidence: f64,
    pub suggestion: String,
    pub provenance: Provenance,
}

use crate::error::{PredictionError, StoreError};
use crate::global_variables::HISTORY_QUERY_LIMIT;
use crate::prediction_engine::classifier::{advise, advise_label, classify};
use crate::shared_data::{
    current_timestamp, NewObservation, Observation, Road, RoadId, Severity, Weather,
};
use crate::storage::{sort_most_recent_first, TrafficStore};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A vehicle count reported for a road. `recorded_at` defaults to now.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficInput {
    pub road_id: RoadId,
    pub vehicle_count: u32,
    #[serde(default)]
    pub weather: Weather,
    #[serde(default)]
    pub is_holiday: bool,
    #[serde(default)]
    pub recorded_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub observation: Observation,
    pub congestion_level: Severity,
    pub suggestion: String,
}

/// Classify a count against its road's capacity and store it.
pub fn add_observation<S: TrafficStore + ?Sized>(
    store: &S,
    input: TrafficInput,
) -> Result<IngestOutcome, PredictionError> {
    let road = store
        .get_road(input.road_id)?
        .ok_or(PredictionError::NotFound(input.road_id))?;
    let level = classify(input.vehicle_count as f64, road.capacity as f64);

    let observation = store.append_observation(NewObservation {
        road_id: road.id,
        vehicle_count: input.vehicle_count,
        congestion_level: level,
        weather: input.weather,
        is_holiday: input.is_holiday,
        recorded_at: input.recorded_at.unwrap_or_else(current_timestamp),
    })?;
    log::info!(
        "road {}: recorded {} vehicles ({})",
        road.id,
        observation.vehicle_count,
        level
    );

    Ok(IngestOutcome {
        observation,
        congestion_level: level,
        suggestion: advise(level).to_string(),
    })
}

/// Latest observation of each road, keyed by road id.
pub fn latest_per_road(mut observations: Vec<Observation>) -> HashMap<RoadId, Observation> {
    sort_most_recent_first(&mut observations);
    let mut latest = HashMap::new();
    for obs in observations {
        latest.entry(obs.road_id).or_insert(obs);
    }
    latest
}

#[derive(Debug, Clone, Serialize)]
pub struct RoadStatus {
    pub road: Road,
    pub latest: Option<Observation>,
    pub suggestion: Option<String>,
}

/// Every road with its most recent reading, ordered by road id.
pub fn road_statuses<S: TrafficStore + ?Sized>(store: &S) -> Result<Vec<RoadStatus>, StoreError> {
    let mut roads = store.list_roads()?;
    roads.sort_by_key(|r| r.id);
    let mut latest = latest_per_road(store.all_observations()?);

    Ok(roads
        .into_iter()
        .map(|road| {
            let latest = latest.remove(&road.id);
            let suggestion = latest
                .as_ref()
                .map(|o| advise_label(&o.congestion_level).to_string());
            RoadStatus {
                road,
                latest,
                suggestion,
            }
        })
        .collect())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryFilter {
    pub road_id: Option<RoadId>,
    pub date: Option<NaiveDate>,
    pub level: Option<Severity>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryRow {
    #[serde(flatten)]
    pub observation: Observation,
    pub road_name: String,
    pub area: String,
    pub city: String,
}

/// Matching observations joined with their road, newest first, capped at
/// the history query limit. Observations of deleted roads are skipped.
pub fn traffic_history<S: TrafficStore + ?Sized>(
    store: &S,
    filter: &HistoryFilter,
) -> Result<Vec<HistoryRow>, StoreError> {
    let roads: HashMap<RoadId, Road> = store
        .list_roads()?
        .into_iter()
        .map(|r| (r.id, r))
        .collect();

    let mut observations: Vec<Observation> = match filter.road_id {
        Some(id) => store.observations_for_road(id)?,
        None => store.all_observations()?,
    };
    observations.retain(|o| {
        filter.date.map_or(true, |d| o.recorded_at.date() == d)
            && filter
                .level
                .map_or(true, |l| o.congestion_level == l.as_str())
    });
    sort_most_recent_first(&mut observations);

    Ok(observations
        .into_iter()
        .filter_map(|observation| {
            let road = roads.get(&observation.road_id)?;
            Some(HistoryRow {
                road_name: road.road_name.clone(),
                area: road.area.clone(),
                city: road.city.clone(),
                observation,
            })
        })
        .take(HISTORY_QUERY_LIMIT)
        .collect())
}

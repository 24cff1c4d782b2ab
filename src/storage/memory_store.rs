use super::{next_id, TrafficStore};
use crate::error::StoreError;
use crate::shared_data::{
    NewObservation, NewPrediction, NewRoad, Observation, PredictionRecord, Road, RoadId,
};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Tables {
    roads: Vec<Road>,
    observations: Vec<Observation>,
    predictions: Vec<PredictionRecord>,
}

/// In-process store, used by tests and benches.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables.write().map_err(|_| StoreError::Poisoned)
    }

    /// Inserts a raw observation as-is, including a label that may not parse.
    pub fn insert_observation(&self, observation: Observation) -> Result<(), StoreError> {
        self.write()?.observations.push(observation);
        Ok(())
    }
}

impl TrafficStore for MemoryStore {
    fn get_road(&self, road_id: RoadId) -> Result<Option<Road>, StoreError> {
        Ok(self.read()?.roads.iter().find(|r| r.id == road_id).cloned())
    }

    fn list_roads(&self) -> Result<Vec<Road>, StoreError> {
        Ok(self.read()?.roads.clone())
    }

    fn add_road(&self, road: NewRoad) -> Result<Road, StoreError> {
        let mut tables = self.write()?;
        let road = Road {
            id: next_id(tables.roads.iter().map(|r| r.id)),
            road_name: road.road_name,
            area: road.area,
            city: road.city,
            capacity: road.capacity,
        };
        tables.roads.push(road.clone());
        Ok(road)
    }

    fn observations_for_road(&self, road_id: RoadId) -> Result<Vec<Observation>, StoreError> {
        Ok(self
            .read()?
            .observations
            .iter()
            .filter(|o| o.road_id == road_id)
            .cloned()
            .collect())
    }

    fn all_observations(&self) -> Result<Vec<Observation>, StoreError> {
        Ok(self.read()?.observations.clone())
    }

    fn append_observation(&self, observation: NewObservation) -> Result<Observation, StoreError> {
        let mut tables = self.write()?;
        let observation = Observation {
            id: next_id(tables.observations.iter().map(|o| o.id)),
            road_id: observation.road_id,
            vehicle_count: observation.vehicle_count,
            congestion_level: observation.congestion_level.to_string(),
            weather: observation.weather,
            is_holiday: observation.is_holiday,
            recorded_at: observation.recorded_at,
        };
        tables.observations.push(observation.clone());
        Ok(observation)
    }

    fn append_prediction(&self, prediction: NewPrediction) -> Result<PredictionRecord, StoreError> {
        let mut tables = self.write()?;
        let record = PredictionRecord {
            id: next_id(tables.predictions.iter().map(|p| p.id)),
            road_id: prediction.road_id,
            predicted_level: prediction.predicted_level,
            confidence: prediction.confidence,
            hour: prediction.hour,
            weather: prediction.weather,
            is_holiday: prediction.is_holiday,
            provenance: prediction.provenance,
            created_at: prediction.created_at,
        };
        tables.predictions.push(record.clone());
        Ok(record)
    }

    fn list_predictions(&self, road_id: Option<RoadId>) -> Result<Vec<PredictionRecord>, StoreError> {
        Ok(self
            .read()?
            .predictions
            .iter()
            .filter(|p| road_id.map_or(true, |id| p.road_id == id))
            .cloned()
            .collect())
    }
}

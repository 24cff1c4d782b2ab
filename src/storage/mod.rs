pub mod csv_store;
pub mod memory_store;

pub use csv_store::CsvStore;
pub use memory_store::MemoryStore;

use crate::error::StoreError;
use crate::shared_data::{
    NewObservation, NewPrediction, NewRoad, Observation, PredictionRecord, Road, RoadId,
};

/// Read/write access to the road registry and its two record streams.
///
/// Implementations must allow window reads to run alongside appends, and
/// each appended record must land whole or not at all.
pub trait TrafficStore: Send + Sync {
    fn get_road(&self, road_id: RoadId) -> Result<Option<Road>, StoreError>;

    fn list_roads(&self) -> Result<Vec<Road>, StoreError>;

    fn add_road(&self, road: NewRoad) -> Result<Road, StoreError>;

    /// Every observation for one road, in insertion order.
    fn observations_for_road(&self, road_id: RoadId) -> Result<Vec<Observation>, StoreError>;

    fn all_observations(&self) -> Result<Vec<Observation>, StoreError>;

    fn append_observation(&self, observation: NewObservation) -> Result<Observation, StoreError>;

    fn append_prediction(&self, prediction: NewPrediction) -> Result<PredictionRecord, StoreError>;

    fn list_predictions(&self, road_id: Option<RoadId>) -> Result<Vec<PredictionRecord>, StoreError>;

    /// Up to `limit` observations, most recent first.
    fn get_recent_observations(
        &self,
        road_id: RoadId,
        limit: usize,
    ) -> Result<Vec<Observation>, StoreError> {
        let mut observations = self.observations_for_road(road_id)?;
        sort_most_recent_first(&mut observations);
        observations.truncate(limit);
        Ok(observations)
    }

    /// Mean vehicle count over the road's entire history.
    fn get_average_vehicle_count(&self, road_id: RoadId) -> Result<Option<f64>, StoreError> {
        let observations = self.observations_for_road(road_id)?;
        if observations.is_empty() {
            return Ok(None);
        }
        let total: f64 = observations.iter().map(|o| o.vehicle_count as f64).sum();
        Ok(Some(total / observations.len() as f64))
    }
}

/// Newest `recorded_at` first; ties broken by newest id.
pub fn sort_most_recent_first(observations: &mut [Observation]) {
    observations.sort_by(|a, b| {
        b.recorded_at
            .cmp(&a.recorded_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

fn next_id<I: Iterator<Item = u64>>(ids: I) -> u64 {
    ids.max().map_or(1, |id| id + 1)
}

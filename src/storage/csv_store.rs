use super::{next_id, TrafficStore};
use crate::error::StoreError;
use crate::global_variables::{PREDICTIONS_FILE, ROADS_FILE, TRAFFIC_DATA_FILE};
use crate::shared_data::{
    NewObservation, NewPrediction, NewRoad, Observation, PredictionRecord, Road, RoadId,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Store backed by one append-only CSV file per table.
///
/// Files are opened per call and closed straight after, so no handle
/// outlives a request. Appends and id assignment are serialised through an
/// in-process writer lock; readers take no lock.
///
/// Only one process may write to a data directory. The lock does not reach
/// across processes, so two writers sharing `dir` can hand out the same id.
/// Run the prediction service and the admin CLI against separate copies, or
/// one at a time.
#[derive(Debug)]
pub struct CsvStore {
    dir: PathBuf,
    writer: Mutex<()>,
}

impl CsvStore {
    pub fn open<P: Into<PathBuf>>(dir: P) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            writer: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    /// Loads every row of `file`. Rows that fail to deserialize, such as a
    /// garbage count or a line cut short by a crash, are skipped with a
    /// warning so one bad row cannot hide the rest of the table.
    fn read_all<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>, StoreError> {
        let path = self.path(file);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(File::open(&path)?);
        let mut records = Vec::new();
        let mut skipped = 0usize;
        for result in rdr.deserialize() {
            match result {
                Ok(record) => records.push(record),
                Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => return Err(e.into()),
                Err(e) => {
                    skipped += 1;
                    log::debug!("{}: unreadable row: {}", path.display(), e);
                }
            }
        }
        if skipped > 0 {
            log::warn!("{}: skipped {} malformed rows", path.display(), skipped);
        }
        Ok(records)
    }

    /// Appends one record, writing the header first if the file is new.
    /// Callers must hold the writer lock.
    fn append<T: Serialize>(&self, file: &str, record: &T) -> Result<(), StoreError> {
        let path = self.path(file);
        let needs_header = fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(true);

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)?;
        // A row torn by a crash has no line ending; start on a fresh line.
        if !needs_header && !ends_with_newline(&mut file)? {
            file.write_all(b"\n")?;
        }
        // The csv buffer holds the whole row, so `flush` issues one write.
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        wtr.serialize(record)?;
        wtr.flush()?;
        Ok(())
    }

    fn with_writer<T>(&self, f: impl FnOnce() -> Result<T, StoreError>) -> Result<T, StoreError> {
        let _guard = self.writer.lock().map_err(|_| StoreError::Poisoned)?;
        f()
    }
}

fn ends_with_newline(file: &mut File) -> std::io::Result<bool> {
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

impl TrafficStore for CsvStore {
    fn get_road(&self, road_id: RoadId) -> Result<Option<Road>, StoreError> {
        Ok(self
            .read_all::<Road>(ROADS_FILE)?
            .into_iter()
            .find(|r| r.id == road_id))
    }

    fn list_roads(&self) -> Result<Vec<Road>, StoreError> {
        self.read_all(ROADS_FILE)
    }

    fn add_road(&self, road: NewRoad) -> Result<Road, StoreError> {
        self.with_writer(|| {
            let existing: Vec<Road> = self.read_all(ROADS_FILE)?;
            let road = Road {
                id: next_id(existing.iter().map(|r| r.id)),
                road_name: road.road_name,
                area: road.area,
                city: road.city,
                capacity: road.capacity,
            };
            self.append(ROADS_FILE, &road)?;
            Ok(road)
        })
    }

    fn observations_for_road(&self, road_id: RoadId) -> Result<Vec<Observation>, StoreError> {
        Ok(self
            .read_all::<Observation>(TRAFFIC_DATA_FILE)?
            .into_iter()
            .filter(|o| o.road_id == road_id)
            .collect())
    }

    fn all_observations(&self) -> Result<Vec<Observation>, StoreError> {
        self.read_all(TRAFFIC_DATA_FILE)
    }

    fn append_observation(&self, observation: NewObservation) -> Result<Observation, StoreError> {
        self.with_writer(|| {
            let existing: Vec<Observation> = self.read_all(TRAFFIC_DATA_FILE)?;
            let observation = Observation {
                id: next_id(existing.iter().map(|o| o.id)),
                road_id: observation.road_id,
                vehicle_count: observation.vehicle_count,
                congestion_level: observation.congestion_level.to_string(),
                weather: observation.weather,
                is_holiday: observation.is_holiday,
                recorded_at: observation.recorded_at,
            };
            self.append(TRAFFIC_DATA_FILE, &observation)?;
            Ok(observation)
        })
    }

    fn append_prediction(&self, prediction: NewPrediction) -> Result<PredictionRecord, StoreError> {
        self.with_writer(|| {
            let existing: Vec<PredictionRecord> = self.read_all(PREDICTIONS_FILE)?;
            let record = PredictionRecord {
                id: next_id(existing.iter().map(|p| p.id)),
                road_id: prediction.road_id,
                predicted_level: prediction.predicted_level,
                confidence: prediction.confidence,
                hour: prediction.hour,
                weather: prediction.weather,
                is_holiday: prediction.is_holiday,
                provenance: prediction.provenance,
                created_at: prediction.created_at,
            };
            self.append(PREDICTIONS_FILE, &record)?;
            Ok(record)
        })
    }

    fn list_predictions(&self, road_id: Option<RoadId>) -> Result<Vec<PredictionRecord>, StoreError> {
        Ok(self
            .read_all::<PredictionRecord>(PREDICTIONS_FILE)?
            .into_iter()
            .filter(|p| road_id.map_or(true, |id| p.road_id == id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PredictorConfig;
    use crate::prediction_engine::CongestionPredictor;
    use crate::shared_data::{PredictionRequest, Provenance, Severity, Weather};
    use chrono::NaiveDate;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "congestion_predictor_csv_{}_{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn road() -> NewRoad {
        NewRoad {
            road_name: "Silk Board".into(),
            area: "South".into(),
            city: "Bangalore".into(),
            capacity: 1100,
        }
    }

    #[test]
    fn roads_round_trip_through_disk() {
        let dir = scratch_dir("roads");
        let store = CsvStore::open(&dir).unwrap();
        assert!(store.list_roads().unwrap().is_empty());
        let added = store.add_road(road()).unwrap();
        assert_eq!(added.id, 1);

        let reopened = CsvStore::open(&dir).unwrap();
        assert_eq!(reopened.get_road(1).unwrap(), Some(added));
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn header_is_written_once() {
        let dir = scratch_dir("header");
        let store = CsvStore::open(&dir).unwrap();
        let recorded_at = NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(17, 30, 0)
            .unwrap();
        for count in [100, 200, 300] {
            store
                .append_observation(NewObservation {
                    road_id: 1,
                    vehicle_count: count,
                    congestion_level: Severity::Medium,
                    weather: Weather::Rain,
                    is_holiday: true,
                    recorded_at,
                })
                .unwrap();
        }
        let text = fs::read_to_string(dir.join(TRAFFIC_DATA_FILE)).unwrap();
        assert_eq!(text.lines().count(), 4);
        assert!(text.starts_with("id,road_id,vehicle_count,congestion_level"));

        let observations = store.observations_for_road(1).unwrap();
        assert_eq!(observations.len(), 3);
        assert_eq!(observations[2].id, 3);
        assert_eq!(observations[0].weather, Weather::Rain);
        assert_eq!(observations[0].recorded_at, recorded_at);
        assert_eq!(observations[0].congestion_level, "Medium");
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn predictions_filter_by_road() {
        let dir = scratch_dir("predictions");
        let store = CsvStore::open(&dir).unwrap();
        let created_at = NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        for road_id in [1, 2, 1] {
            store
                .append_prediction(NewPrediction {
                    road_id,
                    predicted_level: Severity::High,
                    confidence: 61.4,
                    hour: 9,
                    weather: Weather::Clear,
                    is_holiday: false,
                    provenance: Provenance::Heuristic,
                    created_at,
                })
                .unwrap();
        }
        let for_one = store.list_predictions(Some(1)).unwrap();
        assert_eq!(for_one.len(), 2);
        assert_eq!(for_one[1].id, 3);
        assert_eq!(for_one[0].provenance, Provenance::Heuristic);
        assert_eq!(store.list_predictions(None).unwrap().len(), 3);
        let _ = fs::remove_dir_all(dir);
    }

    fn reading(road_id: RoadId, vehicle_count: u32) -> NewObservation {
        NewObservation {
            road_id,
            vehicle_count,
            congestion_level: Severity::Low,
            weather: Weather::Clear,
            is_holiday: false,
            recorded_at: NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
        }
    }

    fn append_raw(path: PathBuf, text: &str) {
        let mut file = OpenOptions::new().append(true).open(path).unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }

    #[test]
    fn malformed_row_is_skipped_and_predict_still_works() {
        let dir = scratch_dir("malformed");
        let store = CsvStore::open(&dir).unwrap();
        store.add_road(road()).unwrap();
        store.add_road(road()).unwrap();
        store.append_observation(reading(1, 300)).unwrap();
        append_raw(
            dir.join(TRAFFIC_DATA_FILE),
            "2,2,-5,Low,Clear,false,2024-01-01T09:00:00\n",
        );

        let observations = store.all_observations().unwrap();
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].vehicle_count, 300);

        let predictor = CongestionPredictor::new(store, PredictorConfig::default());
        let result = predictor
            .predict(&PredictionRequest {
                road_id: 1,
                hour: Some(9),
                weather: Weather::Clear,
                is_holiday: false,
            })
            .unwrap();
        assert_eq!(result.road_id, 1);
        assert_eq!(predictor.store().list_predictions(Some(1)).unwrap().len(), 1);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn torn_last_row_does_not_swallow_next_append() {
        let dir = scratch_dir("torn");
        let store = CsvStore::open(&dir).unwrap();
        store.append_observation(reading(1, 100)).unwrap();
        append_raw(dir.join(TRAFFIC_DATA_FILE), "2,1,4");

        let added = store.append_observation(reading(1, 200)).unwrap();
        let observations = store.observations_for_road(1).unwrap();
        assert_eq!(observations.len(), 2);
        assert_eq!(observations[1], added);
        assert_eq!(observations[1].vehicle_count, 200);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn threads_sharing_a_store_get_distinct_ids() {
        let dir = scratch_dir("threads");
        let store = std::sync::Arc::new(CsvStore::open(&dir).unwrap());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = std::sync::Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..5 {
                        store.append_observation(reading(1, t * 10 + i)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut ids: Vec<u64> = store.all_observations().unwrap().iter().map(|o| o.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=20).collect::<Vec<u64>>());
        let _ = fs::remove_dir_all(dir);
    }
}

/// End-to-end checks against the on-disk CSV store.
///
/// Run with: cargo test --test prediction_integration -- --nocapture
use chrono::{NaiveDate, NaiveDateTime};
use congestion_predictor::analytics::ingest::{add_observation, traffic_history, HistoryFilter, TrafficInput};
use congestion_predictor::analytics::reports::{alerts, dashboard};
use congestion_predictor::config::PredictorConfig;
use congestion_predictor::error::PredictionError;
use congestion_predictor::prediction_engine::CongestionPredictor;
use congestion_predictor::shared_data::{NewRoad, PredictionRequest, Provenance, Severity, Weather};
use congestion_predictor::storage::{CsvStore, TrafficStore};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "congestion_predictor_it_{}_{}",
        name,
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 9, day)
        .unwrap()
        .and_hms_opt(hour, 15, 0)
        .unwrap()
}

fn predictor_in(dir: &PathBuf) -> CongestionPredictor<CsvStore> {
    let store = CsvStore::open(dir).unwrap();
    store
        .add_road(NewRoad {
            road_name: "Bellary Road".into(),
            area: "North".into(),
            city: "Bangalore".into(),
            capacity: 1000,
        })
        .unwrap();
    CongestionPredictor::new(store, PredictorConfig::default())
}

fn reading(vehicle_count: u32, day: u32, hour: u32) -> TrafficInput {
    TrafficInput {
        road_id: 1,
        vehicle_count,
        weather: Weather::Clear,
        is_holiday: false,
        recorded_at: Some(at(day, hour)),
    }
}

#[test]
fn new_road_gets_heuristic_prediction() {
    println!("\n=== Test: Heuristic Prediction On Empty History ===");
    let dir = scratch_dir("heuristic");
    let predictor = predictor_in(&dir);
    let request = PredictionRequest {
        road_id: 1,
        hour: Some(18),
        weather: Weather::Storm,
        is_holiday: false,
    };

    let result = predictor
        .predict_at(&request, at(10, 18), &mut StdRng::seed_from_u64(1))
        .unwrap();
    println!("✓ {} {:.1}% via {}", result.predicted_level, result.confidence, result.provenance);

    assert_eq!(result.provenance, Provenance::Heuristic);
    assert!((55.0..=70.0).contains(&result.confidence));
    assert_eq!(result.road_name, "Bellary Road");

    let records = predictor.store().list_predictions(Some(1)).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].weather, Weather::Storm);
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn ingested_history_switches_to_forest() {
    println!("\n=== Test: Ingest Then Learned Prediction ===");
    let dir = scratch_dir("learned");
    let predictor = predictor_in(&dir);

    // 95% of capacity is Critical.
    for day in 1..=12 {
        let outcome = add_observation(predictor.store(), reading(950, day, 9)).unwrap();
        assert_eq!(outcome.congestion_level, Severity::Critical);
    }

    let request = PredictionRequest {
        road_id: 1,
        hour: Some(9),
        weather: Weather::Clear,
        is_holiday: false,
    };
    let result = predictor
        .predict_at(&request, at(13, 9), &mut StdRng::seed_from_u64(1))
        .unwrap();
    println!("✓ {} {:.1}% via {}", result.predicted_level, result.confidence, result.provenance);

    assert_eq!(result.provenance, Provenance::Learned);
    assert_eq!(result.predicted_level, Severity::Critical);
    assert_eq!(result.confidence, 100.0);

    // Reopening the directory sees everything that was written.
    let reopened = CsvStore::open(&dir).unwrap();
    assert_eq!(reopened.observations_for_road(1).unwrap().len(), 12);
    let records = reopened.list_predictions(None).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].provenance, Provenance::Learned);
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn unknown_road_leaves_store_untouched() {
    let dir = scratch_dir("not_found");
    let predictor = predictor_in(&dir);
    let request = PredictionRequest {
        road_id: 404,
        hour: Some(12),
        weather: Weather::Clear,
        is_holiday: false,
    };
    let err = predictor.predict(&request).unwrap_err();
    assert!(matches!(err, PredictionError::NotFound(404)));
    assert!(predictor.store().list_predictions(None).unwrap().is_empty());
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn every_call_appends_one_record() {
    let dir = scratch_dir("append");
    let predictor = predictor_in(&dir);
    let mut rng = StdRng::seed_from_u64(9);
    for hour in [6u8, 12, 18, 23] {
        let request = PredictionRequest {
            road_id: 1,
            hour: Some(hour),
            weather: Weather::Fog,
            is_holiday: true,
        };
        predictor.predict_at(&request, at(10, 8), &mut rng).unwrap();
    }
    let records = predictor.store().list_predictions(Some(1)).unwrap();
    let hours: Vec<u8> = records.iter().map(|r| r.hour).collect();
    assert_eq!(hours, vec![6, 12, 18, 23]);
    assert!(records.iter().all(|r| r.is_holiday));
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn reports_reflect_ingested_readings() {
    let dir = scratch_dir("reports");
    let predictor = predictor_in(&dir);
    add_observation(predictor.store(), reading(300, 10, 8)).unwrap();
    add_observation(predictor.store(), reading(980, 10, 17)).unwrap();

    let summary = dashboard(predictor.store(), NaiveDate::from_ymd_opt(2024, 9, 10).unwrap()).unwrap();
    assert_eq!(summary.total_roads, 1);
    assert_eq!(summary.current_critical, 1);
    assert_eq!(summary.peak_hour, "17:00");

    let active = alerts(predictor.store()).unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].vehicle_count, 980);

    let rows = traffic_history(predictor.store(), &HistoryFilter::default()).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].observation.vehicle_count, 980);
    let _ = std::fs::remove_dir_all(dir);
}

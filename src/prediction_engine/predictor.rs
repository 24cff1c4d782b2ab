// predictor.rs

use crate::config::PredictorConfig;
use crate::error::PredictionError;
use crate::prediction_engine::classifier::advise;
use crate::prediction_engine::features::HistoryRecord;
use crate::prediction_engine::heuristic::heuristic_predict;
use crate::prediction_engine::learned::learned_predict;
use crate::shared_data::{
    current_timestamp, day_of_week, NewPrediction, PredictionRequest, PredictionResult,
    Provenance, Road, Severity,
};
use crate::storage::TrafficStore;
use chrono::{NaiveDateTime, Timelike};
use rand::Rng;

/// Chooses between the heuristic and learned paths for each request and
/// records the outcome.
///
/// Holds no model between calls: every learned prediction refits on the
/// road's current window and drops the forest afterwards.
pub struct CongestionPredictor<S> {
    store: S,
    config: PredictorConfig,
}

impl<S: TrafficStore> CongestionPredictor<S> {
    pub fn new(store: S, config: PredictorConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    /// Predict for the current wall-clock time.
    pub fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult, PredictionError> {
        self.predict_at(request, current_timestamp(), &mut rand::rng())
    }

    /// Predict as if it were `now`. `now` supplies the default hour, the
    /// weekday fed to the model and the record timestamp.
    ///
    /// A failed write fails the whole call; no result is returned for a
    /// prediction that was not recorded.
    pub fn predict_at<R: Rng + ?Sized>(
        &self,
        request: &PredictionRequest,
        now: NaiveDateTime,
        rng: &mut R,
    ) -> Result<PredictionResult, PredictionError> {
        let hour = request.hour.unwrap_or(now.hour() as u8);
        if hour > 23 {
            return Err(PredictionError::InvalidHour(hour));
        }

        let road = self
            .store
            .get_road(request.road_id)?
            .ok_or(PredictionError::NotFound(request.road_id))?;

        let window = self
            .store
            .get_recent_observations(road.id, self.config.history_window)?;

        let (severity, confidence, provenance) = if window.len() < self.config.sufficiency_threshold
        {
            log::info!(
                "road {}: {} observations below threshold {}, using heuristic",
                road.id,
                window.len(),
                self.config.sufficiency_threshold
            );
            self.heuristic(&road, hour, request, rng)?
        } else {
            let history: Vec<HistoryRecord> = window.iter().map(HistoryRecord::from).collect();
            match learned_predict(
                &history,
                hour,
                day_of_week(&now),
                request.weather,
                request.is_holiday,
                &self.config,
            ) {
                Ok(p) => {
                    log::info!(
                        "road {}: forest fit on {} rows ({} excluded)",
                        road.id,
                        p.training_rows,
                        p.excluded_rows
                    );
                    (p.severity, p.confidence, Provenance::Learned)
                }
                Err(e) => {
                    log::warn!("road {}: {}, falling back to heuristic", road.id, e);
                    self.heuristic(&road, hour, request, rng)?
                }
            }
        };
        let confidence = confidence.clamp(0.0, 100.0);

        self.store
            .append_prediction(NewPrediction {
                road_id: road.id,
                predicted_level: severity,
                confidence,
                hour,
                weather: request.weather,
                is_holiday: request.is_holiday,
                provenance,
                created_at: now,
            })
            .map_err(|e| {
                log::error!("road {}: failed to record prediction: {}", road.id, e);
                e
            })?;

        Ok(PredictionResult {
            road_id: road.id,
            road_name: road.road_name,
            hour,
            weather: request.weather,
            is_holiday: request.is_holiday,
            predicted_level: severity,
            confidence,
            suggestion: advise(severity).to_string(),
            provenance,
        })
    }

    fn heuristic<R: Rng + ?Sized>(
        &self,
        road: &Road,
        hour: u8,
        request: &PredictionRequest,
        rng: &mut R,
    ) -> Result<(Severity, f64, Provenance), PredictionError> {
        let average = self.store.get_average_vehicle_count(road.id)?;
        let p = heuristic_predict(
            average,
            road.capacity,
            hour,
            request.weather,
            request.is_holiday,
            (
                self.config.heuristic_confidence_min,
                self.config.heuristic_confidence_max,
            ),
            rng,
        );
        log::debug!(
            "road {}: multiplier {:.2} -> {} vehicles",
            road.id,
            p.multiplier,
            p.predicted_count
        );
        Ok((p.severity, p.confidence, Provenance::Heuristic))
    }
}

use crate::config::PredictorConfig;
use crate::error::DataQualityError;
use crate::prediction_engine::features::{
    decode_severity, encode_window, feature_vector, HistoryRecord, N_CLASSES,
};
use crate::prediction_engine::forest::RandomForest;
use crate::prediction_engine::round_confidence;
use crate::shared_data::{Severity, Weather};

#[derive(Debug, Clone, PartialEq)]
pub struct LearnedPrediction {
    pub severity: Severity,
    pub confidence: f64,
    /// Class distribution indexed by encoded severity.
    pub probabilities: Vec<f64>,
    pub training_rows: usize,
    pub excluded_rows: usize,
}

/// Fit a forest on `history` and score the live context.
///
/// `history` is ordered most recent first. `day_of_week` is the weekday the
/// query is made for, in the same Sunday = 1 convention the history uses.
/// The fitted model is dropped on return.
pub fn learned_predict(
    history: &[HistoryRecord],
    hour: u8,
    day_of_week: u8,
    weather: Weather,
    is_holiday: bool,
    config: &PredictorConfig,
) -> Result<LearnedPrediction, DataQualityError> {
    let mut window = encode_window(history);
    for rejected in &window.rejected {
        log::warn!("excluding training row: {}", rejected);
    }
    if let Some(limit) = config.max_training_rows {
        window.samples.truncate(limit);
    }
    if window.samples.is_empty() {
        return Err(DataQualityError::EmptyTrainingSet(history.len()));
    }

    let mut forest = RandomForest::new(config.forest_trees, N_CLASSES).with_seed(config.forest_seed);
    forest.fit(&window.samples);

    let input = feature_vector(hour, day_of_week, is_holiday, weather);
    let probabilities = forest
        .predict_proba(&input)
        .ok_or(DataQualityError::EmptyTrainingSet(history.len()))?;
    let (class, max_prob) = forest
        .predict(&input)
        .ok_or(DataQualityError::EmptyTrainingSet(history.len()))?;
    let severity = decode_severity(class).ok_or(DataQualityError::UnknownClass(class))?;

    log::debug!(
        "forest fit on {} rows ({} excluded), class {} p={:.3}",
        window.samples.len(),
        window.rejected.len(),
        class,
        max_prob
    );

    Ok(LearnedPrediction {
        severity,
        confidence: round_confidence(max_prob * 100.0).clamp(0.0, 100.0),
        probabilities,
        training_rows: window.samples.len(),
        excluded_rows: window.rejected.len(),
    })
}

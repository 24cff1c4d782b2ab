// heuristic.rs

use crate::prediction_engine::classifier::classify;
use crate::prediction_engine::round_confidence;
use crate::shared_data::{Severity, Weather};
use rand::Rng;

/// Share of capacity assumed when a road has no history at all.
const DEFAULT_FILL_RATIO: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeuristicPrediction {
    pub severity: Severity,
    pub confidence: f64,
    pub predicted_count: u64,
    pub multiplier: f64,
}

/// Additive adjustment for time of day, weather and holidays.
pub fn traffic_multiplier(hour: u8, weather: Weather, is_holiday: bool) -> f64 {
    let mut multiplier = 1.0;

    multiplier += match hour {
        8..=10 => 0.5,
        17..=19 => 0.45,
        12..=13 => 0.2,
        0..=4 => -0.5,
        _ => 0.0,
    };

    multiplier += match weather {
        Weather::Rain => 0.3,
        Weather::Fog => 0.2,
        _ => 0.0,
    };

    if is_holiday {
        multiplier -= 0.3;
    }

    multiplier
}

/// Expected vehicle count, never negative.
pub fn predicted_vehicle_count(baseline: f64, multiplier: f64) -> u64 {
    (baseline * multiplier).floor().max(0.0) as u64
}

/// Rule based prediction for roads without enough history to fit a model.
///
/// `average_count` is the road's historical mean, or `None` when nothing
/// has been recorded yet. Confidence is drawn from `confidence_range` so
/// that it never overstates a hand-tuned estimate.
pub fn heuristic_predict<R: Rng + ?Sized>(
    average_count: Option<f64>,
    capacity: u32,
    hour: u8,
    weather: Weather,
    is_holiday: bool,
    confidence_range: (f64, f64),
    rng: &mut R,
) -> HeuristicPrediction {
    let baseline = average_count.unwrap_or(capacity as f64 * DEFAULT_FILL_RATIO);
    let multiplier = traffic_multiplier(hour, weather, is_holiday);
    let predicted_count = predicted_vehicle_count(baseline, multiplier);
    let severity = classify(predicted_count as f64, capacity as f64);

    let (lo, hi) = confidence_range;
    let (lo, hi) = (lo.clamp(0.0, 100.0), hi.clamp(0.0, 100.0));
    let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
    let confidence = round_confidence(rng.random_range(lo..=hi)).clamp(lo, hi);

    HeuristicPrediction {
        severity,
        confidence,
        predicted_count,
        multiplier,
    }
}

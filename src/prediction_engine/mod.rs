pub mod classifier;
pub mod features;
pub mod forest;
pub mod heuristic;
pub mod learned;
pub mod predictor;

pub use classifier::{advise, advise_label, classify, NO_SUGGESTION};
pub use heuristic::{heuristic_predict, HeuristicPrediction};
pub use learned::{learned_predict, LearnedPrediction};
pub use predictor::CongestionPredictor;

/// Round a percentage to one decimal place.
pub fn round_confidence(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

use thiserror::Error;

/// Failures raised by a [`TrafficStore`](crate::storage::TrafficStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("store lock poisoned")]
    Poisoned,
}

/// A historical row that cannot be used as a training sample.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataQualityError {
    #[error("unrecognised congestion level {0:?}")]
    UnknownSeverity(String),
    #[error("none of the {0} rows in the window are usable for training")]
    EmptyTrainingSet(usize),
    #[error("model produced class {0}, which has no congestion level")]
    UnknownClass(usize),
}

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("road {0} not found")]
    NotFound(u64),
    #[error("invalid hour {0}, expected 0-23")]
    InvalidHour(u8),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    DataQuality(#[from] DataQualityError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failures that stop the prediction service loop.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("AMQP error: {0}")]
    Amqp(#[from] amiquip::Error),
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("service worker panicked: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

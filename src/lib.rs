pub mod analytics;
pub mod config;
pub mod error;
pub mod global_variables;
pub mod prediction_engine;
pub mod service;
pub mod shared_data;
pub mod storage;

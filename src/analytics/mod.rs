pub mod charts;
pub mod ingest;
pub mod reports;

pub use ingest::{add_observation, road_statuses, traffic_history, HistoryFilter, TrafficInput};

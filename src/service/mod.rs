pub mod admin_cli;
pub mod prediction_service;

pub use admin_cli::run_cli;
pub use prediction_service::{
    handle_request, start_prediction_service, submit_request, PredictionReply,
};

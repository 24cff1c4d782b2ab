use congestion_predictor::config::ServiceConfig;
use congestion_predictor::prediction_engine::CongestionPredictor;
use congestion_predictor::service::start_prediction_service;
use congestion_predictor::storage::CsvStore;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };
    let store = match CsvStore::open(&config.data_dir) {
        Ok(store) => store,
        Err(e) => {
            log::error!("cannot open data directory {}: {}", config.data_dir.display(), e);
            std::process::exit(1);
        }
    };

    log::info!(
        "starting prediction service, data in {}",
        config.data_dir.display()
    );
    let predictor = Arc::new(CongestionPredictor::new(store, config.predictor.clone()));
    if let Err(e) = start_prediction_service(predictor, config.amqp_url.clone()).await {
        log::error!("prediction service stopped: {}", e);
        std::process::exit(1);
    }
}

use congestion_predictor::config::ServiceConfig;
use congestion_predictor::prediction_engine::CongestionPredictor;
use congestion_predictor::service::run_cli;
use congestion_predictor::storage::CsvStore;
use std::io::stdin;

fn main() {
    env_logger::init();

    let config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config error: {}", e);
            std::process::exit(1);
        }
    };
    let store = match CsvStore::open(&config.data_dir) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Cannot open {}: {}", config.data_dir.display(), e);
            std::process::exit(1);
        }
    };

    let predictor = CongestionPredictor::new(store, config.predictor.clone());
    if let Err(e) = run_cli(&predictor, &config, &mut stdin().lock()) {
        eprintln!("CLI error: {}", e);
    }
}

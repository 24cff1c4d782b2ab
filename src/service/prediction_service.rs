use crate::error::ServiceError;
use crate::global_variables::{QUEUE_PREDICTION_REQUESTS, QUEUE_PREDICTION_RESULTS};
use crate::prediction_engine::CongestionPredictor;
use crate::shared_data::{PredictionRequest, PredictionResult, RoadId};
use crate::storage::TrafficStore;
use amiquip::{
    Connection, ConsumerMessage, ConsumerOptions, Exchange, Publish, QueueDeclareOptions,
    Result as AmiquipResult,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task;

/// Message published on the results queue for every consumed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionReply {
    Prediction(PredictionResult),
    Failure {
        road_id: Option<RoadId>,
        error: String,
    },
}

/// Decode one request body and run it through the predictor.
/// Never fails: malformed input and prediction errors become a `Failure`.
pub fn handle_request<S: TrafficStore>(
    predictor: &CongestionPredictor<S>,
    body: &[u8],
) -> PredictionReply {
    let request = match serde_json::from_slice::<PredictionRequest>(body) {
        Ok(request) => request,
        Err(e) => {
            log::warn!("discarding malformed prediction request: {}", e);
            return PredictionReply::Failure {
                road_id: None,
                error: format!("malformed request: {}", e),
            };
        }
    };

    match predictor.predict(&request) {
        Ok(result) => PredictionReply::Prediction(result),
        Err(e) => {
            log::warn!("prediction for road {} failed: {}", request.road_id, e);
            PredictionReply::Failure {
                road_id: Some(request.road_id),
                error: e.to_string(),
            }
        }
    }
}

/// Blocking consume loop: one reply per request, acked after publishing.
pub fn run_prediction_service<S: TrafficStore>(
    predictor: &CongestionPredictor<S>,
    amqp_url: &str,
) -> AmiquipResult<()> {
    let mut connection = Connection::insecure_open(amqp_url)?;
    let channel = connection.open_channel(None)?;
    let exchange = Exchange::direct(&channel);

    let requests = channel.queue_declare(QUEUE_PREDICTION_REQUESTS, QueueDeclareOptions::default())?;
    channel.queue_declare(QUEUE_PREDICTION_RESULTS, QueueDeclareOptions::default())?;
    let consumer = requests.consume(ConsumerOptions::default())?;

    log::info!(
        "waiting for prediction requests on '{}'",
        QUEUE_PREDICTION_REQUESTS
    );

    for message in consumer.receiver() {
        match message {
            ConsumerMessage::Delivery(delivery) => {
                let reply = handle_request(predictor, &delivery.body);
                match serde_json::to_string(&reply) {
                    Ok(json) => {
                        exchange.publish(Publish::new(json.as_bytes(), QUEUE_PREDICTION_RESULTS))?;
                        log::debug!("published reply to '{}'", QUEUE_PREDICTION_RESULTS);
                    }
                    Err(e) => log::error!("failed to encode reply: {}", e),
                }
                consumer.ack(delivery)?;
            }
            other => {
                log::info!("consumer ended: {:?}", other);
                break;
            }
        }
    }

    connection.close()
}

/// Run the consume loop on the blocking pool until the broker closes it.
pub async fn start_prediction_service<S>(
    predictor: Arc<CongestionPredictor<S>>,
    amqp_url: String,
) -> Result<(), ServiceError>
where
    S: TrafficStore + 'static,
{
    task::spawn_blocking(move || run_prediction_service(&*predictor, &amqp_url)).await??;
    Ok(())
}

/// Publish a single request, as an external client would.
pub fn submit_request(amqp_url: &str, request: &PredictionRequest) -> Result<(), ServiceError> {
    let payload = serde_json::to_string(request)?;
    let mut connection = Connection::insecure_open(amqp_url)?;
    let channel = connection.open_channel(None)?;
    channel.queue_declare(QUEUE_PREDICTION_REQUESTS, QueueDeclareOptions::default())?;
    let exchange = Exchange::direct(&channel);
    exchange.publish(Publish::new(payload.as_bytes(), QUEUE_PREDICTION_REQUESTS))?;
    connection.close()?;
    Ok(())
}

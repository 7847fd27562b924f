use actix_web::{error, web, HttpRequest, HttpResponse};
use log::{info, warn};
use serde::Serialize;
use shared::{HealthResponse, PredictRequest};

use crate::orchestrator::BatchOrchestrator;

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .service(web::resource("/predict").route(web::post().to(predict)))
        .service(web::resource("/health").route(web::get().to(health)))
        .service(web::resource("/model-info").route(web::get().to(model_info)));
}

fn json_error_handler(err: error::JsonPayloadError, _req: &HttpRequest) -> error::Error {
    warn!("Rejected predict payload: {}", err);
    let response = HttpResponse::BadRequest().json(ErrorResponse {
        error: format!("Invalid request body: {}", err),
    });
    error::InternalError::from_response(err, response).into()
}

async fn predict(
    orchestrator: web::Data<BatchOrchestrator>,
    request: web::Json<PredictRequest>,
) -> HttpResponse {
    let request = request.into_inner();
    if request.images.is_empty() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "No input data provided".to_string(),
        });
    }

    let response = orchestrator.process_batch(&request.images).await;
    info!(
        "Batch finished: {} severity reports, {} failures",
        response.damage_severities.len(),
        response.failures.len()
    );
    HttpResponse::Ok().json(response)
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
    })
}

async fn model_info(orchestrator: web::Data<BatchOrchestrator>) -> HttpResponse {
    HttpResponse::Ok().json(orchestrator.models().describe())
}

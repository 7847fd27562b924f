use std::env;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use aws_sdk_s3::Client as S3Client;

use damage_assessor::acquisition::HttpImageSource;
use damage_assessor::assessment::registry::ClassRegistry;
use damage_assessor::config::AppConfig;
use damage_assessor::db::DynamoDbRepository;
use damage_assessor::inference::build_models;
use damage_assessor::orchestrator::BatchOrchestrator;
use damage_assessor::routes::configure_routes;
use damage_assessor::storage::S3Service;
use damage_assessor::weights::WeightRefresher;

fn startup_error(message: String) -> std::io::Error {
    log::error!("{}", message);
    std::io::Error::other(message)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    }

    let config = AppConfig::from_env()
        .map_err(|e| startup_error(format!("Invalid configuration: {}", e)))?;

    let registry = match &config.class_table {
        Some(path) => ClassRegistry::load(path).map_err(|e| {
            startup_error(format!(
                "Failed to load damage classes from {}: {}",
                path.display(),
                e
            ))
        })?,
        None => ClassRegistry::default(),
    };
    log::info!("Loaded {} damage classes", registry.classes().len());

    // Initialize AWS configuration
    let aws_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
    let dynamodb_client = DynamoDbClient::new(&aws_config);
    let s3_client = S3Client::new(&aws_config);

    let s3_service = S3Service::new(
        s3_client,
        config.storage.bucket.clone(),
        config.storage.folder.clone(),
        config.storage.public_base_url.clone(),
    );
    let db_repo = DynamoDbRepository::new(
        dynamodb_client,
        config.weight_refresh.as_ref().map(|w| w.table.clone()),
        config.assessments_table.clone(),
    );

    if let Some(refresh) = &config.weight_refresh {
        let refresher = WeightRefresher::new(
            Arc::new(db_repo.clone()),
            Arc::new(s3_service.clone()),
            refresh.s3_key.clone(),
            refresh.destination.clone(),
        );
        if let Err(e) = refresher.refresh().await {
            log::warn!("Weight refresh failed, keeping current weights: {}", e);
        }
    }

    let http_client = reqwest::Client::new();
    let models = build_models(&config.models, &registry, http_client.clone())
        .map_err(|e| startup_error(format!("Model loading failed: {}", e)))?;
    for info in models.describe() {
        log::info!("{} model ({}): {}", info.role, info.backend, info.model);
    }

    let mut orchestrator = BatchOrchestrator::new(
        Arc::new(HttpImageSource::new(http_client)),
        models,
        Arc::new(s3_service),
        Arc::new(registry),
        config.limits,
    );
    if config.assessments_table.is_some() {
        orchestrator = orchestrator.with_audit_log(Arc::new(db_repo));
    }
    let orchestrator = web::Data::new(orchestrator);

    let bind_address = format!("0.0.0.0:{}", config.port);
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(orchestrator.clone())
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}

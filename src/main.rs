use std::env;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use modelfleet::api::{api_router, ApiContext};
use modelfleet::clients::{HttpDatasetDirectory, HttpInstallAgent, HttpTrainingExecutor};
use modelfleet::config::{RolloutConfig, SchedulerConfig};
use modelfleet::persistence::relational::{
    DeploymentRelationalPersistence, EdgeTargetRelationalPersistence,
    ModelVersionRelationalPersistence, TrainingJobRelationalPersistence,
};
use modelfleet::processor::{AdmissionProcessor, RolloutProcessor};
use modelfleet::services::{
    DeploymentService, EdgeTargetService, ModelVersionService, TrainingJobService,
};
use modelfleet_core::{
    DatasetDirectory, EventStream, InstallAgent, MinimumAccuracyGate, TrainingExecutor,
};
use modelfleet_postgresql_stream::PostgresqlEventStream;

const DEFAULT_SERVICE_CONSUMER_ID: &str = "modelfleet-api";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let tracer = opentelemetry_jaeger::new_agent_pipeline()
        .with_service_name(DEFAULT_SERVICE_CONSUMER_ID)
        .install_simple()
        .expect("failed to instantiate opentelemetry tracing");

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .expect("failed to register tracer with registry");

    let subscribers: Vec<String> = dotenvy::var("SUBSCRIBERS")
        .unwrap_or_else(|_| "audit,notifications".to_string())
        .split(',')
        .map(|subscriber| subscriber.to_string())
        .collect();

    let database_url = dotenvy::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let db = Arc::new(
        PgPoolOptions::new()
            .max_connections(20)
            .connect(&database_url)
            .await
            .expect("failed to connect to DATABASE_URL"),
    );

    sqlx::migrate!().run(&*db).await?;

    let event_stream: Arc<dyn EventStream> = Arc::new(PostgresqlEventStream {
        db: Arc::clone(&db),
        subscribers,
    });

    let scheduler_config = SchedulerConfig::from_env();
    let rollout_config = RolloutConfig::from_env();

    let executor_url = dotenvy::var("TRAINING_EXECUTOR_URL").expect("TRAINING_EXECUTOR_URL must be set");
    let dataset_url = dotenvy::var("DATASET_DIRECTORY_URL").expect("DATASET_DIRECTORY_URL must be set");
    let install_agent_url = dotenvy::var("INSTALL_AGENT_URL").expect("INSTALL_AGENT_URL must be set");

    let http_client = reqwest::Client::new();

    let datasets: Arc<dyn DatasetDirectory> = Arc::new(HttpDatasetDirectory {
        client: http_client.clone(),
        base_url: dataset_url,
    });
    let executor: Arc<dyn TrainingExecutor> = Arc::new(HttpTrainingExecutor {
        client: http_client.clone(),
        base_url: executor_url,
    });
    let install_agent: Arc<dyn InstallAgent> = Arc::new(HttpInstallAgent {
        client: http_client,
        base_url: install_agent_url,
    });

    let job_persistence = Box::new(TrainingJobRelationalPersistence {
        db: Arc::clone(&db),
    });
    let job_service = Arc::new(TrainingJobService {
        persistence: job_persistence,
        event_stream: Arc::clone(&event_stream),
        datasets,
        executor,
        config: scheduler_config.clone(),
    });

    let min_accuracy = dotenvy::var("MIN_APPROVAL_ACCURACY")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(0.0);

    let model_version_persistence = Box::new(ModelVersionRelationalPersistence {
        db: Arc::clone(&db),
    });
    let model_version_service = Arc::new(ModelVersionService {
        persistence: model_version_persistence,
        event_stream: Arc::clone(&event_stream),
        job_service: Arc::clone(&job_service),
        quality_gate: Box::new(MinimumAccuracyGate { min_accuracy }),
    });

    let target_persistence = Box::new(EdgeTargetRelationalPersistence {
        db: Arc::clone(&db),
    });
    let target_service = Arc::new(EdgeTargetService {
        persistence: target_persistence,
        event_stream: Arc::clone(&event_stream),
    });

    let deployment_persistence = Box::new(DeploymentRelationalPersistence {
        db: Arc::clone(&db),
    });
    let deployment_service = Arc::new(DeploymentService {
        persistence: deployment_persistence,
        event_stream: Arc::clone(&event_stream),
        model_version_service: Arc::clone(&model_version_service),
        target_service: Arc::clone(&target_service),
        config: rollout_config.clone(),
    });

    let admission_processor = AdmissionProcessor {
        job_service: Arc::clone(&job_service),
        tick: scheduler_config.admission_tick,
    };
    tokio::spawn(async move { admission_processor.run().await });

    let rollout_processor = RolloutProcessor::new(
        Arc::clone(&deployment_service),
        Arc::clone(&model_version_service),
        install_agent,
        rollout_config,
    );
    tokio::spawn(async move { rollout_processor.run().await });

    let context = Arc::new(ApiContext {
        job_service,
        model_version_service,
        deployment_service,
        target_service,
    });

    let endpoint = env::var("ENDPOINT").unwrap_or_else(|_| "[::1]:8080".to_owned());
    let addr = endpoint.parse()?;

    let app = api_router(context).layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    tracing::info!("api listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}

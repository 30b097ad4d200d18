use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use lume_discovery::config::Settings;
use lume_discovery::core::{Collaborators, Engine, EngineSettings, SystemClock};
use lume_discovery::routes::{self, AppState};
use lume_discovery::services::{
    AppwriteClient, AppwriteCollections, LocalStore, MemoryStore, PostgresStore,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST),
        )
        .json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(
    err: error::JsonPayloadError,
    req: &actix_web::HttpRequest,
) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle path segment errors
pub fn handle_path_error(err: error::PathError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_path".to_string(),
        message: format!("Invalid path: {}", err),
        status_code: 400,
    }
    .into()
}

/// Initialize tracing; LOG_LEVEL / LOG_FORMAT override the configured values
fn init_logging(level: &str, format: &str) {
    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| level.to_string());
    let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| format.to_string());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }
}

async fn open_store(settings: &Settings) -> std::io::Result<Arc<dyn LocalStore>> {
    let Some(url) = settings.database.url.as_deref() else {
        warn!("No database URL configured, keeping the local store in memory");
        return Ok(Arc::new(MemoryStore::new()));
    };

    let store = PostgresStore::from_settings(
        url,
        settings.database.max_connections,
        settings.database.min_connections,
        settings.database.acquire_timeout_secs,
        settings.database.idle_timeout_secs,
    )
    .await
    .map_err(|e| {
        error!("Failed to connect to PostgreSQL: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;

    info!("PostgreSQL local store initialized");
    Ok(Arc::new(store))
}

/// Periodic purge of expired cache rows plus a retry pass over unsynced writes
fn spawn_maintenance(engine: Engine, interval: Duration, sync_batch: usize) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // First tick fires immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            if let Err(e) = engine.purge_expired().await {
                warn!("Scheduled purge failed: {}", e);
            }
            match engine.sync_pending(sync_batch).await {
                Ok(report) if report.swipes_failed + report.matches_failed > 0 => {
                    warn!("Sync pass left rows pending: {:?}", report);
                }
                Ok(report) => tracing::debug!("Sync pass: {:?}", report),
                Err(e) => warn!("Scheduled sync failed: {}", e),
            }
        }
    });
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    init_logging(&settings.logging.level, &settings.logging.format);

    info!("Starting Lume discovery service...");

    let collections = AppwriteCollections {
        profiles: settings.collection.profiles.clone(),
        swipes: settings.collection.swipes.clone(),
        matches: settings.collection.matches.clone(),
        blocks: settings.collection.blocks.clone(),
    };

    let appwrite = AppwriteClient::new(
        settings.appwrite.endpoint.clone(),
        settings.appwrite.api_key.clone(),
        settings.appwrite.project_id.clone(),
        settings.appwrite.database_id.clone(),
        collections,
        Duration::from_secs(settings.appwrite.request_timeout_secs.unwrap_or(10)),
    )
    .map_err(|e| {
        error!("Failed to build Appwrite client: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;

    info!("Appwrite client initialized");

    let store = open_store(&settings).await?;

    let engine_settings = EngineSettings::from(&settings.discovery);
    info!(
        "Engine settings: profile TTL {}s, remote timeout {}ms, unknown distance {:?}",
        settings.discovery.profile_ttl_secs,
        settings.discovery.remote_timeout_ms,
        engine_settings.unknown_distance
    );

    let engine = Engine::new(
        store,
        Collaborators::from_client(Arc::new(appwrite)),
        Arc::new(SystemClock),
        engine_settings,
    );

    spawn_maintenance(
        engine.clone(),
        Duration::from_secs(settings.maintenance.interval_secs.max(1)),
        settings.maintenance.sync_batch,
    );

    let app_state = AppState {
        engine,
        default_limit: settings.discovery.default_limit,
        sync_batch: settings.maintenance.sync_batch,
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::PathConfig::default().error_handler(handle_path_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}

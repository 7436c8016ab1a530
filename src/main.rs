use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use sayu_match::config::{DatabaseSettings, LoggingSettings, Settings, StoreBackend};
use sayu_match::core::{CompatibilityMatrix, Matcher};
use sayu_match::models::{ScoringWeights, UserProfile};
use sayu_match::routes::{self, AppState};
use sayu_match::services::{CacheManager, MatchStore, MatchingService, MemoryStore, PostgresClient};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// JSON error response for payload, query and path errors
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
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
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle malformed path segments, e.g. a request id that is not a UUID
pub fn handle_path_error(err: error::PathError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_path".to_string(),
        message: format!("Invalid path: {}", err),
        status_code: 400,
    }
    .into()
}

fn init_tracing(logging: &LoggingSettings) {
    // RUST_LOG takes precedence over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }
}

fn io_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, err))
}

fn load_seed_profiles(path: &str) -> std::io::Result<Vec<UserProfile>> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| io_error("Invalid seed profiles", e))
}

async fn build_store(database: &DatabaseSettings) -> std::io::Result<Arc<dyn MatchStore>> {
    match database.backend {
        StoreBackend::Postgres => {
            let postgres = PostgresClient::from_settings(
                &database.url,
                database.max_connections,
                database.min_connections,
                database.acquire_timeout_secs,
                database.idle_timeout_secs,
            )
            .await
            .map_err(|e| {
                error!("Failed to connect to PostgreSQL: {}", e);
                io_error("PostgreSQL connection error", e)
            })?;

            info!(
                "PostgreSQL store initialized (max: {} connections)",
                database.max_connections.unwrap_or(10)
            );
            Ok(Arc::new(postgres))
        }
        StoreBackend::Memory => {
            info!("In-memory store initialized");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

async fn seed_profiles(store: &dyn MatchStore, path: &str) -> std::io::Result<()> {
    let profiles = load_seed_profiles(path)?;
    for profile in &profiles {
        store
            .upsert_profile(profile)
            .await
            .map_err(|e| io_error("Failed to seed profile", e))?;
    }
    info!("Seeded {} profiles from {}", profiles.len(), path);
    Ok(())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        io_error("Configuration error", e)
    })?;

    init_tracing(&settings.logging);
    info!("Starting SAYU exhibition matching service...");

    let store = build_store(&settings.database).await?;
    if let Some(path) = &settings.database.seed_profiles {
        seed_profiles(store.as_ref(), path).await?;
    }

    // Redis is optional; without it matches are cached per instance only
    let cache_ttl = settings.cache.ttl_secs.unwrap_or(60);
    let l1_cache_size = settings.cache.l1_cache_size.unwrap_or(10_000);

    let cache = match &settings.cache.redis_url {
        Some(redis_url) => match CacheManager::new(redis_url, l1_cache_size, cache_ttl).await {
            Ok(c) => c,
            Err(e) => {
                warn!("Failed to connect to Redis ({}), using local cache only", e);
                CacheManager::local(l1_cache_size, cache_ttl)
            }
        },
        None => CacheManager::local(l1_cache_size, cache_ttl),
    };
    info!(
        "Cache manager initialized (L1: {} entries, TTL: {}s, redis: {})",
        l1_cache_size,
        cache_ttl,
        cache.has_redis()
    );

    let weights =
        ScoringWeights::try_from(&settings.scoring.weights).map_err(|e| io_error("Configuration error", e))?;
    let rules = settings.matching.rules();
    let matcher = Matcher::new(Arc::new(CompatibilityMatrix::sayu()), weights, rules);

    info!("Matcher initialized with weights: {:?}, rules: {:?}", weights, rules);

    let service = MatchingService::new(store, matcher, settings.matching.request_defaults());

    let app_state = AppState {
        service: Arc::new(service),
        cache: Arc::new(cache),
    };

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
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

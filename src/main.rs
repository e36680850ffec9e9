use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use pulse_guard::config::Settings;
use pulse_guard::core::{PostureScorer, RuleCatalog};
use pulse_guard::routes::{self, AppState};
use pulse_guard::services::{AiGenerator, GeminiClient, HealthEngine};
use std::io;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging(level: &str, format: &str) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

fn load_catalog(settings: &Settings) -> io::Result<RuleCatalog> {
    let catalog = match &settings.catalog.path {
        Some(path) => {
            info!("Loading rule catalog from {}", path.display());
            RuleCatalog::load_from(path)
        }
        None => RuleCatalog::builtin(),
    };

    catalog.map_err(|e| {
        error!("Failed to load rule catalog: {}", e);
        io::Error::new(io::ErrorKind::InvalidData, e.to_string())
    })
}

fn build_generator(settings: &Settings) -> Option<AiGenerator> {
    let generator = &settings.generator;
    let Some(api_key) = generator.api_key() else {
        warn!("No Gemini API key configured, AI-backed recommendations are disabled");
        return None;
    };

    match GeminiClient::new(
        generator.base_url.clone(),
        api_key,
        generator.model.clone(),
        generator.request_timeout(),
    ) {
        Ok(client) => {
            info!("Gemini client initialized (model: {})", client.model());
            Some(
                AiGenerator::new(Arc::new(client))
                    .with_policy(generator.retry_policy())
                    .with_options(generator.generation_options()),
            )
        }
        Err(e) => {
            error!("Failed to initialize Gemini client ({}), AI-backed recommendations are disabled", e);
            None
        }
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e.to_string())
    })?;

    init_logging(&settings.logging.level, &settings.logging.format);

    info!("Starting PulseGuard service...");

    let catalog = Arc::new(load_catalog(&settings)?);
    info!("Rule catalog loaded (version {})", catalog.version);

    let mut engine = HealthEngine::new(catalog, PostureScorer::new(settings.posture));
    if let Some(generator) = build_generator(&settings) {
        engine = engine.with_generator(generator);
    }

    let app_state = AppState {
        engine: Arc::new(engine),
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
            .app_data(routes::json_config())
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

mod core;
mod features;
mod modules;
mod shared;

use crate::core::config::{Config, LoggingConfig};
use crate::core::openapi::{ApiDoc, SwaggerInfoModifier};
use crate::core::{database, middleware};
use crate::features::auth::routes as auth_routes;
use crate::features::auth::AuthService;
use crate::features::files::{routes as files_routes, FileService, MetadataService};
use crate::features::memory::{routes as memory_routes, MemoryStore};
use crate::features::queries::services::{Assistant, ReferenceReader};
use crate::features::queries::{routes as queries_routes, QueryService};
use crate::features::users::{routes as users_routes, services::UserService};
use crate::modules::llm::{CompletionClient, OpenAiClient};
use crate::modules::storage::LocalStore;
use crate::shared::prompts::{template_exists, ASSISTANT_TEMPLATES};
use crate::shared::types::MessageDto;
use axum::{middleware::from_fn, Json, Router};
use std::sync::Arc;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn main() -> anyhow::Result<()> {
    // Build Tokio runtime with configurable worker threads
    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .max_blocking_threads(worker_threads * 4)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(worker_threads))
}

/// Stdout logging, plus a daily JSON file when `LOG_DIR` is set.
/// The returned guard must live until shutdown so buffered lines get flushed.
fn init_tracing(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let (file_layer, guard) = match &logging.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "thoth.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    guard
}

async fn async_main(worker_threads: usize) -> anyhow::Result<()> {
    // Load .env file BEFORE initializing logger so RUST_LOG is available
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;
    let _log_guard = init_tracing(&config.logging);

    let available_cpus = std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1);
    tracing::info!(
        "System info: available_cpus={}, tokio_worker_threads={}, pid={}",
        available_cpus,
        worker_threads,
        std::process::id()
    );

    tracing::info!("Configuration loaded successfully");

    // Create database connection pool
    let pool = database::create_pool(&config.database).await?;
    tracing::info!("Database connection pool created");

    tracing::info!("Running database migrations...");
    database::run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;
    tracing::info!("Database migrations completed successfully");

    // Storage roots
    let local_store = Arc::new(LocalStore::new(&config.storage.assets_dir));
    let memory_store = Arc::new(MemoryStore::new(
        &config.memory.memory_dir,
        config.memory.max_conversations,
    ));
    tracing::info!(
        "Storage initialized (backend: {:?}, assets: {}, memory: {})",
        config.storage.backend,
        config.storage.assets_dir.display(),
        config.memory.memory_dir.display()
    );

    // Feature services
    let auth_service = Arc::new(AuthService::new(
        pool.clone(),
        &config.auth,
        Arc::clone(&local_store),
        config.storage.default_max_upload_size,
    ));
    let user_service = Arc::new(UserService::new(
        pool.clone(),
        Arc::clone(&local_store),
        Arc::clone(&memory_store),
    ));
    let file_service = Arc::new(FileService::new(
        pool.clone(),
        Arc::clone(&local_store),
        config.storage.backend,
    ));
    let metadata_service = Arc::new(MetadataService::new(pool.clone(), Arc::clone(&file_service)));

    // Compile prompt templates up front so a broken override fails at startup
    if let Some(missing) = ASSISTANT_TEMPLATES.iter().find(|name| !template_exists(name)) {
        anyhow::bail!("Prompt template {} failed to load", missing);
    }

    if config.completion.api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; /query will fail until it is configured");
    }
    let completion_client: Arc<dyn CompletionClient> =
        Arc::new(OpenAiClient::new(&config.completion)?);
    let assistant = Assistant::new(
        completion_client,
        Arc::clone(&memory_store),
        config.memory.recent_conversations,
        config.memory.reference_prompt_chars,
    );
    let query_service = Arc::new(QueryService::new(
        pool.clone(),
        assistant,
        ReferenceReader::new(
            &config.memory.references_dir,
            config.memory.reference_char_limit,
        ),
        Arc::clone(&memory_store),
        Arc::clone(&file_service),
        config.completion.default_model.clone(),
    ));
    tracing::info!(
        "Assistant initialized (model: {}, endpoint: {})",
        config.completion.default_model,
        config.completion.base_url
    );

    // Build application router with dynamic swagger config
    let swagger_modifier = SwaggerInfoModifier {
        title: config.swagger.title.clone(),
        version: config.swagger.version.clone(),
        description: config.swagger.description.clone(),
    };

    let mut openapi = ApiDoc::openapi();
    swagger_modifier.modify(&mut openapi);

    let swagger = if let Some(credentials) = config.swagger.credentials() {
        tracing::info!("Swagger UI basic auth enabled");
        Router::new()
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
            .layer(from_fn(middleware::basic_auth_middleware(Arc::new(
                credentials,
            ))))
    } else {
        tracing::info!("Swagger UI basic auth disabled (no credentials configured)");
        Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
    };

    // Protected routes (require a live session)
    let protected_routes = Router::new()
        .merge(auth_routes::protected_routes(Arc::clone(&auth_service)))
        .merge(users_routes::routes(user_service))
        .merge(files_routes(
            Arc::clone(&file_service),
            metadata_service,
            config.storage.max_request_body_size,
        ))
        .merge(memory_routes::routes(Arc::clone(&memory_store)))
        .merge(queries_routes::routes(query_service))
        .route_layer(axum::middleware::from_fn_with_state(
            Arc::clone(&auth_service),
            middleware::auth_middleware,
        ));

    async fn root() -> Json<MessageDto> {
        Json(MessageDto::new("Thoth API is running"))
    }

    async fn health_check() -> axum::http::StatusCode {
        axum::http::StatusCode::OK
    }

    let public_routes = Router::new()
        .route("/", axum::routing::get(root))
        .route("/health", axum::routing::get(health_check))
        .merge(auth_routes::public_routes(auth_service));

    let app = Router::new()
        .merge(swagger)
        .merge(protected_routes)
        .merge(public_routes)
        .layer(middleware::cors_layer(
            config.app.cors_allowed_origins.clone(),
        ))
        // Propagate X-Request-Id to response headers
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(middleware::MakeSpanWithRequestId)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Generate X-Request-Id using UUID v7 (or use client-provided one)
        .layer(SetRequestIdLayer::x_request_id(middleware::MakeRequestUuid));

    // Start server
    let addr = config.app.server_address();
    let socket_addr: std::net::SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

    let socket = socket2::Socket::new(
        socket2::Domain::for_address(socket_addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_nodelay(true)?;

    socket.set_recv_buffer_size(256 * 1024)?;
    socket.set_send_buffer_size(256 * 1024)?;

    #[cfg(target_os = "linux")]
    {
        let keepalive = socket2::TcpKeepalive::new()
            .with_time(std::time::Duration::from_secs(60))
            .with_interval(std::time::Duration::from_secs(10))
            .with_retries(3);
        socket.set_tcp_keepalive(&keepalive)?;
    }
    #[cfg(not(target_os = "linux"))]
    {
        let keepalive = socket2::TcpKeepalive::new().with_time(std::time::Duration::from_secs(60));
        socket.set_tcp_keepalive(&keepalive)?;
    }

    socket.set_nonblocking(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(1024)?;

    let listener = tokio::net::TcpListener::from_std(socket.into())?;
    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

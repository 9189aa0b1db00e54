use actix_cors::Cors;
use actix_web::middleware::Compress;
use actix_web::{http::header, web, App, HttpResponse, HttpServer, Responder};
use actix_web_prometheus::PrometheusMetricsBuilder;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub mod config;
pub mod document;
pub mod generator;
pub mod multipart;
pub mod state;
pub mod storage;
pub mod template;

pub use crate::config::AppConfig;
pub use crate::state::AppState;

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_type: &str, message: &str) -> Self {
        Self {
            error: error_type.to_string(),
            message: message.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn not_found(message: &str) -> Self {
        Self::new("NotFound", message)
    }

    pub fn bad_request(message: &str) -> Self {
        Self::new("BadRequest", message)
    }

    pub fn internal_error(message: &str) -> Self {
        Self::new("InternalServerError", message)
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
    })
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::template::handlers::list_templates,
        crate::template::handlers::upload_template,
        crate::document::handlers::generate,
        crate::document::handlers::list_documents,
        crate::document::handlers::download_document,
        crate::document::handlers::download_document_by_name,
        crate::document::handlers::download_all,
        crate::health
    ),
    components(
        schemas(
            template::models::Template,
            template::models::TemplateListResponse,
            template::models::UploadTemplateRequest,
            template::models::TemplateUploaded,
            document::models::GeneratedDocumentInfo,
            document::models::DocumentListResponse,
            document::models::FailedTemplate,
            document::models::GenerateResponse,
            document::models::GenerateDocumentsRequest,
            ErrorResponse,
            HealthResponse,
        )
    ),
    tags(
        (name = "Template Service", description = "Template listing and upload."),
        (name = "Document Service", description = "Document generation and download."),
        (name = "Health", description = "Liveness check.")
    ),
    servers(
        (url = "http://127.0.0.1:8080", description = "Localhost server")
    )
)]
pub struct ApiDoc;

/// Register every application route. Shared by the server and the HTTP tests.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .configure(template::handlers::config)
            .configure(document::handlers::config),
    )
    .service(web::resource("/health").route(web::get().to(health)));
}

fn build_cors(config: &AppConfig) -> Cors {
    let cors = if config.allowed_origins.iter().any(|o| o == "*") {
        Cors::default().allow_any_origin()
    } else {
        config
            .allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };
    cors.allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
        .expose_headers(vec![header::CONTENT_DISPOSITION])
        .max_age(3600)
}

async fn build_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    log::info!(
        "Templates: {}, generated documents: {}, uploads: {}, failure policy: {:?}",
        config.templates_dir.display(),
        config.generated_dir.display(),
        config.uploads_dir.display(),
        config.failure_policy
    );
    AppState::new(config)
        .await
        .context("failed to prepare storage directories")
}

pub async fn run() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app_state = match build_state().await {
        Ok(state) => web::Data::new(state),
        Err(e) => {
            log::error!("Failed to start: {:#}", e);
            std::process::exit(1);
        }
    };

    let prometheus = match PrometheusMetricsBuilder::new("policy_docs_server")
        .endpoint("/metrics")
        .build()
    {
        Ok(prometheus) => prometheus,
        Err(e) => {
            log::error!("Failed to create Prometheus metrics middleware: {}", e);
            std::process::exit(1);
        }
    };

    let bind = (app_state.config.host.clone(), app_state.config.port);
    log::info!("Starting server at http://{}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        let app_state = app_state.clone();
        let prometheus = prometheus.clone();
        let cors = build_cors(&app_state.config);

        App::new()
            .wrap(Compress::default())
            .wrap(prometheus)
            .wrap(cors)
            .app_data(app_state)
            .configure(configure_routes)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
    })
    .keep_alive(actix_web::http::KeepAlive::Os)
    .bind(bind)?
    .run()
    .await
}

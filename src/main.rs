use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use receta_api::application::auth_service::AuthService;
use receta_api::application::form_service::FormService;
use receta_api::data::file_store::FileCredentialStore;
use receta_api::data::sheet_store::SheetCredentialStore;
use receta_api::data::sqlite_store::SqliteCredentialStore;
use receta_api::domain::store::CredentialStore;
use receta_api::infrastructure::config::{AppConfig, StoreBackend};
use receta_api::infrastructure::logging::init_logging;
use receta_api::presentation::auth::{change_password, login, logout, register};
use receta_api::presentation::handlers::{
    AppState, clear_form, download_document, generate_document, get_form, health_check,
    update_form,
};
use receta_api::presentation::middleware::RequestTrace;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_logging();

    let config = AppConfig::from_env()?;
    info!(?config.backend, template = %config.template_path.display(), dev_mode = config.dev_mode, "configuration loaded");

    let store: Arc<dyn CredentialStore> = match &config.backend {
        StoreBackend::File { path } => Arc::new(FileCredentialStore::new(path.clone())),
        StoreBackend::Sqlite { path } => Arc::new(SqliteCredentialStore::open(path)?),
        StoreBackend::Sheet { url } => Arc::new(SheetCredentialStore::new(url.clone())),
    };

    let state = web::Data::new(AppState {
        auth: AuthService::new(store, config.jwt_secret.clone()),
        forms: FormService::new(config.template_path.clone()),
        jwt_secret: config.jwt_secret.clone(),
        dev_mode: config.dev_mode,
    });

    if config.dev_mode {
        info!("DEV_MODE active: unauthenticated requests run as the placeholder identity");
    }

    let server = HttpServer::new(move || {
        // the browser form client is served separately
        App::new()
            .app_data(state.clone())
            .wrap(Cors::permissive())
            .wrap(RequestTrace)
            .service(
                web::scope("/api")
                    .route("/health", web::get().to(health_check))
                    .service(
                        web::scope("/auth")
                            .route("/register", web::post().to(register))
                            .route("/login", web::post().to(login))
                            .route("/password", web::put().to(change_password))
                            .route("/logout", web::post().to(logout)),
                    )
                    .service(
                        web::scope("/form")
                            .route("", web::get().to(get_form))
                            .route("", web::put().to(update_form))
                            .route("/generate", web::post().to(generate_document))
                            .route("/clear", web::post().to(clear_form))
                            .route("/document", web::get().to(download_document)),
                    ),
            )
    });

    info!(address = %config.bind_addr, "starting HTTP server");
    server.bind(config.bind_addr.as_str())?.run().await?;
    Ok(())
}

use actix_web::{App, test, web};
use std::sync::Arc;

use receta_api::application::auth_service::AuthService;
use receta_api::application::form_service::FormService;
use receta_api::data::memory::InMemoryCredentialStore;
use receta_api::presentation::auth::register;
use receta_api::presentation::handlers::{AppState, health_check};
use receta_api::presentation::middleware::RequestTrace;

macro_rules! setup_api_app {
    () => {{
        let store = Arc::new(InMemoryCredentialStore::new());
        let state = web::Data::new(AppState {
            auth: AuthService::new(store, "test-secret".to_string()),
            forms: FormService::new("modeloReceta.pdf".into()),
            jwt_secret: "test-secret".to_string(),
            dev_mode: false,
        });

        test::init_service(
            App::new()
                .app_data(state.clone())
                .wrap(RequestTrace)
                .service(
                    web::scope("/api")
                        .route("/health", web::get().to(health_check))
                        .route("/auth/register", web::post().to(register)),
                ),
        )
        .await
    }};
}

#[actix_web::test]
async fn health_check_reports_ok() {
    let app = setup_api_app!();

    let req = test::TestRequest::get().uri("/api/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].as_str().is_some());
}

#[actix_web::test]
async fn responses_carry_trace_headers() {
    let app = setup_api_app!();

    let req = test::TestRequest::get().uri("/api/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.headers().contains_key("x-request-id"));
    assert!(resp.headers().contains_key("x-response-time"));
}

#[actix_web::test]
async fn errors_render_the_uniform_body() {
    let app = setup_api_app!();

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(serde_json::json!({
            "username": "jperez",
            "password": "corto",
            "first_name": "Juan",
            "last_name": "Pérez",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().is_some());
    assert!(body["details"]["message"].as_str().is_some());
}

#[actix_web::test]
async fn unknown_routes_are_not_found() {
    let app = setup_api_app!();

    let req = test::TestRequest::get().uri("/api/nope").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);
}

use actix_web::{
    Error, HttpMessage, HttpRequest, FromRequest,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{self, HeaderName, HeaderValue},
    web,
};
use std::{
    future::{Ready, ready},
    pin::Pin,
    rc::Rc,
    task::{Context, Poll},
    time::Instant,
};
use tracing::info;
use uuid::Uuid;

use crate::infrastructure::security::validate_token;
use crate::presentation::handlers::{ApiError, AppState};

/// Identity of the caller, decoded from the bearer token. With `DEV_MODE`
/// on, requests without a token run as the development placeholder.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl AuthenticatedUser {
    fn dev_placeholder() -> Self {
        Self {
            username: "dev_user".to_string(),
            first_name: "Dr.".to_string(),
            last_name: "Desarrollo".to_string(),
        }
    }
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, ApiError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| ApiError::Internal("application state missing".to_string()))?;

    let bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match bearer {
        Some(token) => {
            let profile = validate_token(token, &state.jwt_secret)
                .map_err(|_| ApiError::Auth("invalid or expired token".to_string()))?;
            Ok(AuthenticatedUser {
                username: profile.username,
                first_name: profile.first_name,
                last_name: profile.last_name,
            })
        }
        None if state.dev_mode => Ok(AuthenticatedUser::dev_placeholder()),
        None => Err(ApiError::Auth("missing bearer token".to_string())),
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

/// Stamps every request with an id, measures wall time and logs both on the
/// way out (`x-request-id` / `x-response-time` response headers).
pub struct RequestTrace;

impl<S, B> Transform<S, ServiceRequest> for RequestTrace
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestTraceService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestTraceService {
            service: Rc::new(service),
        }))
    }
}

pub struct RequestTraceService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequestTraceService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let start = Instant::now();
        let request_id = Uuid::new_v4().to_string();
        let method = req.method().clone();
        let path = req.path().to_string();

        req.extensions_mut().insert(request_id.clone());
        let fut = service.call(req);

        Box::pin(async move {
            let mut res = fut.await?;
            let duration_ms = start.elapsed().as_millis();

            res.headers_mut().insert(
                HeaderName::from_static("x-request-id"),
                HeaderValue::from_str(&request_id)
                    .unwrap_or_else(|_| HeaderValue::from_static("unknown")),
            );
            res.headers_mut().insert(
                HeaderName::from_static("x-response-time"),
                HeaderValue::from_str(&format!("{duration_ms}ms"))
                    .unwrap_or_else(|_| HeaderValue::from_static("0ms")),
            );

            info!(
                method = %method,
                path = %path,
                status = %res.status(),
                duration_ms = duration_ms,
                request_id = %request_id,
                "request processed"
            );

            Ok(res)
        })
    }
}

use crate::store::{postgres::PgStore, Store};
use anyhow::{anyhow, Context, Result};
use auth::{TokenConfig, TokenIssuer};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    routing::{get, post},
    Extension, Json, Router,
};
use handlers::{
    current_user, donations, health, token_refresh, user_login, user_logout, user_register,
};
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use url::Url;

pub mod auth;
pub mod error;
pub(crate) mod handlers;
mod openapi;
pub mod response;

pub use openapi::openapi;

const REQUEST_ID: &str = "x-request-id";

/// Build the application router around an already connected store.
///
/// CORS is left to [`new`]; everything else (request ids, tracing, shared
/// state) is layered here so in-process tests see the same stack.
pub fn router(store: Arc<dyn Store>, tokens: Arc<TokenIssuer>) -> Router {
    let users = Router::new()
        .route("/register", post(user_register::register))
        .route("/login", post(user_login::login))
        .route("/logout", post(user_logout::logout))
        .route("/refresh-token", post(token_refresh::refresh))
        .route("/current-user", get(current_user::current_user))
        .route("/donate", post(donations::donate))
        .route("/get-all-donations", get(donations::all_donations))
        .route("/get-donation-by-postal", post(donations::donations_by_postal));

    Router::new()
        .route("/", get(|| async { "Hello from foodbridge" }))
        .route("/health", get(health::health).options(health::health))
        .route("/api-docs/openapi.json", get(|| async { Json(openapi()) }))
        .nest("/api/v1/users", users)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static(REQUEST_ID),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    REQUEST_ID,
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(tokens))
                .layer(Extension(store)),
        )
}

/// Start the server
/// # Errors
/// Return error if the configuration is invalid, the database is unreachable
/// or the listener fails
pub async fn new(
    port: u16,
    dsn: String,
    token_config: TokenConfig,
    frontend_base_url: &str,
) -> Result<()> {
    token_config.validate()?;

    let store: Arc<dyn Store> = Arc::new(PgStore::connect(&dsn).await?);
    let tokens = Arc::new(TokenIssuer::new(token_config));

    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_origin(AllowOrigin::exact(frontend_origin(frontend_base_url)?))
        .allow_credentials(true);

    let app = router(store, tokens).layer(cors);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn frontend_origin(frontend_base_url: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(frontend_base_url)
        .with_context(|| format!("Invalid frontend base URL: {frontend_base_url}"))?;
    let host = parsed.host_str().ok_or_else(|| {
        anyhow!("Frontend base URL must include a valid host: {frontend_base_url}")
    })?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    HeaderValue::from_str(&format!("{}://{host}{port}", parsed.scheme()))
        .context("Failed to build frontend origin header")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frontend_origin_strips_path() -> Result<()> {
        let origin = frontend_origin("http://localhost:3000/app/")?;
        assert_eq!(origin, "http://localhost:3000");

        let origin = frontend_origin("https://foodbridge.dev")?;
        assert_eq!(origin, "https://foodbridge.dev");
        Ok(())
    }

    #[test]
    fn frontend_origin_requires_host() {
        assert!(frontend_origin("not a url").is_err());
        assert!(frontend_origin("mailto:team@foodbridge.dev").is_err());
    }
}

//! HTTP router for picturegate

use axum::{
    extract::Request,
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use picturegate_core::{RequestId, REQUEST_ID_HEADER};
use picturegate_pictures::{
    picture_routes,
    storage::{EphemeralStorage, PictureStorage, S3Storage},
    DefaultHostResolver, PictureGateway, PicturesState,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, Instrument};

use crate::config::{Config, StorageConfig};

/// Build the picture handler state from configuration
pub async fn build_state(config: &Config) -> Arc<PicturesState> {
    let storage: Arc<dyn PictureStorage> = match &config.storage {
        StorageConfig::Ephemeral => {
            info!("Using ephemeral in-memory storage");
            Arc::new(EphemeralStorage::new())
        }
        StorageConfig::S3(settings) => {
            info!(
                bucket = %settings.bucket,
                endpoint = settings.endpoint_url.as_deref().unwrap_or("default"),
                "Using S3 storage"
            );
            Arc::new(S3Storage::from_settings(settings).await)
        }
    };

    let fallback = format!("http://{}:{}", config.server.host, config.server.port);
    let resolver =
        DefaultHostResolver::new(fallback).with_public_url(config.server.public_url.clone());
    let gateway = PictureGateway::new(storage, Arc::new(resolver));

    Arc::new(PicturesState::new(gateway).with_max_upload_bytes(config.server.max_upload_bytes))
}

/// Create the main application router
pub fn create_router(pictures: Arc<PicturesState>) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        .merge(picture_routes(pictures))
        .layer(middleware::from_fn(propagate_request_id))
        .layer(TraceLayer::new_for_http())
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, r#"{"status": "running"}"#)
}

/// Tag every request with an ID and echo it on the response
async fn propagate_request_id(mut request: Request, next: Next) -> Response {
    let inbound = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok());
    let request_id = RequestId::from_inbound(inbound);
    request.extensions_mut().insert(request_id.clone());

    let span = info_span!("request", request_id = %request_id);
    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    async fn app() -> Router {
        let config = Config::default();
        create_router(build_state(&config).await)
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = app()
            .await
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    }

    #[tokio::test]
    async fn test_request_id_is_propagated() {
        let request = Request::builder()
            .uri("/health")
            .header(REQUEST_ID_HEADER, "trace-me-123")
            .body(Body::empty())
            .unwrap();
        let response = app().await.oneshot(request).await.unwrap();
        assert_eq!(response.headers()[REQUEST_ID_HEADER], "trace-me-123");
    }

    #[tokio::test]
    async fn test_picture_routes_are_mounted() {
        let request = Request::builder()
            .uri("/pictures/nobody")
            .body(Body::empty())
            .unwrap();
        let response = app().await.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));

        let request = Request::builder()
            .method("DELETE")
            .uri("/pictures/nobody")
            .body(Body::empty())
            .unwrap();
        let response = app().await.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let request = Request::builder()
            .uri("/avatars/abc")
            .body(Body::empty())
            .unwrap();
        let response = app().await.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

use axum::http::{header, HeaderValue};
use axum::{routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    request_id::MakeRequestUuid, set_header::SetResponseHeaderLayer, timeout::TimeoutLayer,
    trace::TraceLayer, ServiceBuilderExt,
};

use crate::handlers::{health, trigger};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(trigger))
        .route("/health", get(health))
        // Middleware
        .layer(
            ServiceBuilder::new()
                .set_x_request_id(MakeRequestUuid)
                .layer(TraceLayer::new_for_http())
                .propagate_x_request_id()
                .layer(TimeoutLayer::new(Duration::from_secs(
                    state.config.handler_timeout_secs,
                )))
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                )),
        )
        // Shared state
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dispatcher::tests::MockTransport;
    use crate::dispatcher::Dispatcher;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use std::sync::atomic::Ordering;
    use std::time::Instant;
    use tower::ServiceExt;

    fn app(vars: &[(&str, &str)], transport: Arc<MockTransport>) -> Router {
        let vars: Vec<(String, String)> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let config = Config::resolve(|key| {
            vars.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        });

        create_router(Arc::new(AppState {
            dispatcher: Dispatcher::new(transport),
            config: Arc::new(config),
        }))
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_trigger_acknowledges_before_dispatch_completes() {
        let transport = Arc::new(MockTransport::with_delay(Duration::from_secs(2)));
        let app = app(
            &[
                ("TARGET_URL", "http://example.test"),
                ("REQUEST_COUNT", "25"),
                ("TIMEOUT", "5"),
            ],
            transport.clone(),
        );

        let started = Instant::now();
        let response = app.oneshot(get_request("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(
            response.headers().get(header::X_CONTENT_TYPE_OPTIONS).unwrap(),
            "nosniff"
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"OK");
        assert!(started.elapsed() < Duration::from_secs(2));

        // Let the detached dispatch make progress; slots cap it at 10 in flight
        tokio::time::sleep(Duration::from_millis(100)).await;
        let calls = transport.calls.load(Ordering::SeqCst);
        assert!(calls >= 1 && calls <= 10, "calls in flight: {}", calls);
    }

    #[tokio::test]
    async fn test_zero_count_still_acknowledges() {
        let transport = Arc::new(MockTransport::default());
        let app = app(&[("REQUEST_COUNT", "0")], transport.clone());

        let response = app.oneshot(get_request("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"OK");

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_settings_still_acknowledge() {
        let transport = Arc::new(MockTransport::default());
        let app = app(&[("REQUEST_COUNT", "abc"), ("TIMEOUT", "xyz")], transport.clone());

        let response = app.oneshot(get_request("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[0], ("https://www.google.com".to_string(), Duration::from_secs(10)));
    }

    #[tokio::test]
    async fn test_health() {
        let transport = Arc::new(MockTransport::default());
        let app = app(&[], transport.clone());

        let response = app.oneshot(get_request("/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_post_is_rejected() {
        let transport = Arc::new(MockTransport::default());
        let app = app(&[], transport);

        let request = Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}

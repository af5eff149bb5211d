//! Prometheus HTTP metrics
//!
//! `http_requests_total{url}` counts requests and
//! `http_request_duration_seconds{path}` observes their latency. Both are
//! labelled with the matched route template (`/api/v1/transfers/{user_id}`)
//! so ids do not multiply the series. Exposed in text format at `GET /metrics`.

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::state::AppState;

/// Request counter and latency histogram on a registry of their own
pub struct HttpMetrics {
    registry: Registry,
    requests: IntCounterVec,
    duration: HistogramVec,
}

impl HttpMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new("http_requests_total", "Number of HTTP requests."),
            &["url"],
        )?;
        let duration = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "Response time of HTTP request.",
            ),
            &["path"],
        )?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(duration.clone()))?;

        Ok(Self {
            registry,
            requests,
            duration,
        })
    }

    pub fn observe(&self, path: &str, elapsed: Duration) {
        self.requests.with_label_values(&[path]).inc();
        self.duration
            .with_label_values(&[path])
            .observe(elapsed.as_secs_f64());
    }

    /// Number of requests recorded for `path`
    pub fn request_count(&self, path: &str) -> u64 {
        self.requests.with_label_values(&[path]).get()
    }

    /// Text exposition of everything in the registry
    pub fn render(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Record count and latency of every routed request
pub async fn track_metrics(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = match request.extensions().get::<MatchedPath>() {
        Some(matched) => matched.as_str().to_owned(),
        None => request.uri().path().to_owned(),
    };

    let start = Instant::now();
    let response = next.run(request).await;
    state.metrics.observe(&path, start.elapsed());

    response
}

/// Prometheus scrape endpoint
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, TextEncoder::new().format_type().to_owned())],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observe_counts_per_path() {
        let metrics = HttpMetrics::new().unwrap();
        metrics.observe("/api/v1/transfers", Duration::from_millis(3));
        metrics.observe("/api/v1/transfers", Duration::from_millis(5));
        metrics.observe("/api/v1/health", Duration::from_millis(1));

        assert_eq!(metrics.request_count("/api/v1/transfers"), 2);
        assert_eq!(metrics.request_count("/api/v1/health"), 1);

        let text = metrics.render().unwrap();
        assert!(text.contains(r#"http_requests_total{url="/api/v1/transfers"} 2"#));
        assert!(text.contains(r#"http_request_duration_seconds_count{path="/api/v1/transfers"} 2"#));
    }

    #[test]
    fn test_registries_are_independent() {
        let a = HttpMetrics::new().unwrap();
        let b = HttpMetrics::new().unwrap();
        a.observe("/x", Duration::ZERO);
        assert_eq!(a.request_count("/x"), 1);
        assert_eq!(b.request_count("/x"), 0);
    }
}

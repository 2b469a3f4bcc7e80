use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::error::StampError;
use crate::observe::TracingObserver;
use crate::stamper::{StampRequest, StampResponse, Stamper};

pub fn router(stamper: Arc<Stamper>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stamp", post(stamp))
        // Path the function was historically deployed under
        .route("/.netlify/functions/stamp", post(stamp))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(stamper)
}

pub async fn run(config: Config) -> Result<()> {
    let client = reqwest::Client::builder()
        .build()
        .context("Failed to build HTTP client")?;
    let sink = config.build_sink(&client);

    let stamper = Stamper::new(sink, config.stamp.clone())
        .with_client(client)
        .with_observer(Arc::new(TracingObserver))
        .with_fetch_timeout(config.fetch_timeout);

    let app = router(Arc::new(stamper), config.max_body_bytes);

    info!("Starting pdfstamp on http://{}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> &'static str {
    "OK"
}

async fn stamp(
    State(stamper): State<Arc<Stamper>>,
    payload: Result<Json<StampRequest>, JsonRejection>,
) -> Result<Json<StampResponse>, StampError> {
    let Json(request) = payload.map_err(|e| StampError::InvalidRequest(e.body_text()))?;
    let response = stamper.stamp(request).await?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::testing::sample_pdf;
    use crate::pdf::PdfDocument;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        router(Arc::new(Stamper::default()), 1024 * 1024)
    }

    async fn post_json(app: Router, uri: &str, body: String) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn spawn_origin(pages: u32) -> String {
        let pdf = sample_pdf(pages);
        let origin = Router::new().route("/doc.pdf", get(move || async move { pdf }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, origin).await.unwrap() });
        format!("http://{}/doc.pdf", addr)
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_pages_is_bad_request() {
        let body = json!({ "pdfUrl": "http://127.0.0.1:9/doc.pdf", "text": "PAID" });
        let (status, json) = post_json(app(), "/stamp", body.to_string()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Page expression is missing or blank");
        assert_eq!(json["status"], 400);
    }

    #[tokio::test]
    async fn test_bad_expression_is_bad_request() {
        let body = json!({ "pdfUrl": "http://127.0.0.1:9/doc.pdf", "text": "PAID", "pages": "abc" });
        let (status, json) = post_json(app(), "/stamp", body.to_string()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Invalid page number: \"abc\"");
    }

    #[tokio::test]
    async fn test_malformed_json() {
        let (status, json) = post_json(app(), "/stamp", "{not json".to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().starts_with("Invalid request:"));
    }

    #[tokio::test]
    async fn test_stamp_round_trip() {
        let url = spawn_origin(5).await;
        let body = json!({ "pdfUrl": url, "text": "PAID", "pages": "2-3, 5" });
        let (status, json) =
            post_json(app(), "/.netlify/functions/stamp", body.to_string()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["pagesStamped"], json!([2, 3, 5]));
        assert_eq!(json["pageCount"], 5);

        let bytes = BASE64.decode(json["pdfBase64"].as_str().unwrap()).unwrap();
        assert_eq!(PdfDocument::from_bytes(&bytes).unwrap().page_count(), 5);
    }

    #[tokio::test]
    async fn test_out_of_range_is_unprocessable() {
        let url = spawn_origin(6).await;
        let body = json!({ "pdfUrl": url, "text": "PAID", "pages": "1,5,9" });
        let (status, json) = post_json(app(), "/stamp", body.to_string()).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            json["error"],
            "Page(s) out of range (document has 6 pages): 9"
        );
    }
}

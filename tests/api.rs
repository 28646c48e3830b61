use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use fractalfield::api::router;
use fractalfield::policy::Engine;

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let resp = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn generate_fractal_returns_grid() {
    let app = router(Arc::new(Engine::default()));
    let (status, body) = get_json(app, "/generate_fractal/12/5/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["size"], 12);
    assert_eq!(body["optimization"], "standard");
    assert!(body["generation_time"].as_f64().unwrap() >= 0.0);
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 12);
    for row in rows {
        let row = row.as_array().unwrap();
        assert_eq!(row.len(), 12);
        assert!(row.iter().all(|v| (0.0..1.0).contains(&v.as_f64().unwrap())));
    }
}

#[tokio::test]
async fn oversized_request_is_clamped() {
    let app = router(Arc::new(Engine::default()));
    let (status, body) = get_json(app, "/generate_fractal/400/500/7").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["size"], 150);
    assert_eq!(body["optimization"], "high");
    assert_eq!(body["data"].as_array().unwrap().len(), 150);
}

#[tokio::test]
async fn medium_tier_boundary() {
    let app = router(Arc::new(Engine::default()));
    let (_, body) = get_json(app, "/generate_fractal/81/10/3").await;
    assert_eq!(body["optimization"], "medium");
}

#[tokio::test]
async fn modulation_uses_reference_field() {
    let engine = Arc::new(Engine::default());
    let (status, body) = get_json(router(engine.clone()), "/apply_modulation/0.0").await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 40);
    // sin(0) = 0, so every value is halved into [0, 0.5)
    for row in rows {
        assert!(row.as_array().unwrap().iter().all(|v| v.as_f64().unwrap() < 0.5));
    }
    assert_eq!(engine.stats().cache_entries, 1);
}

#[tokio::test]
async fn frame_applies_query_factors() {
    let app = router(Arc::new(Engine::default()));
    let (status, body) =
        get_json(app, "/frame/20/5/2?time_factor=0.25&distortion_factor=3.5").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["size"], 20);
    assert_eq!(body["data"].as_array().unwrap().len(), 20);
}

#[tokio::test]
async fn render_returns_png() {
    let app = router(Arc::new(Engine::default()));
    let (status, body) = get_json(app, "/render_fractal/16/5/2").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["image"].as_str().unwrap().starts_with("data:image/png;base64,"));
}

#[tokio::test]
async fn stats_track_requests() {
    let engine = Arc::new(Engine::default());
    get_json(router(engine.clone()), "/generate_fractal/10/5/1").await;
    get_json(router(engine.clone()), "/generate_fractal/10/5/1").await;
    get_json(router(engine.clone()), "/generate_fractal/90/5/1").await;
    let (status, body) = get_json(router(engine), "/performance_stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_requests"], 3);
    assert_eq!(body["large_generations"], 1);
    assert_eq!(body["cache_hits"], 1);
    assert_eq!(body["cache_misses"], 2);
    assert!(body["max_time"].as_f64().unwrap() <= body["total_time"].as_f64().unwrap());
}

#[tokio::test]
async fn malformed_path_is_rejected() {
    let app = router(Arc::new(Engine::default()));
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/generate_fractal/abc/5/1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_finite_time_factor_is_rejected() {
    let engine = Arc::new(Engine::default());
    for uri in ["/apply_modulation/NaN", "/apply_modulation/inf"] {
        let (status, body) = get_json(router(engine.clone()), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["error"].as_str().unwrap().contains("time_factor"));
    }
    // rejected before any field is generated
    assert_eq!(engine.stats().cache_entries, 0);
}

#[tokio::test]
async fn non_finite_frame_factors_are_rejected() {
    let engine = Arc::new(Engine::default());
    let (status, body) =
        get_json(router(engine.clone()), "/frame/10/5/1?distortion_factor=inf").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("distortion_factor"));

    let (status, _) = get_json(router(engine), "/frame/10/5/1?time_factor=NaN").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

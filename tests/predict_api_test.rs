/// Integration tests for the HTTP prediction API
///
/// These tests drive the router in-process and verify:
/// - Response shape and the threshold law
/// - Deterministic inference
/// - Error ordering for missing models and missing bodies
/// - Handling of unseen categories and schema violations

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use credit_scoring::{
    api::{build_router, AppState},
    ml::PredictionService,
};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app_with(service: PredictionService) -> Router {
    build_router(AppState::new(service))
}

async fn post_predict(app: Router, body: impl Into<Body>) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/predict")
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.into())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn test_scenario_known_probability() {
    let app = app_with(PredictionService::ready(common::constant_artifact(0.82)));

    let body = common::applicant_json(30.0, "PNS", "Baik");
    let (status, json) = post_predict(app, body.to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["prediction"], 1);
    assert_eq!(json["status_text"], "Layak Kredit");
    let probability = json["positive_probability"].as_f64().unwrap();
    assert!((probability - 0.82).abs() < 1e-9);
}

#[tokio::test]
async fn test_low_probability_is_not_creditworthy() {
    let app = app_with(PredictionService::ready(common::constant_artifact(0.3)));

    let (status, json) = post_predict(app, common::applicant_json(45.0, "Swasta", "Buruk").to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["prediction"], 0);
    assert_eq!(json["status_text"], "Tidak Layak Kredit");
}

#[tokio::test]
async fn test_response_shape_and_threshold_law() {
    let service = PredictionService::ready(common::seeded_artifact(7));
    let app = app_with(service);

    for (umur, pekerjaan, riwayat) in [
        (21.0, "PNS", "Baik"),
        (35.0, "Swasta", "Buruk"),
        (58.0, "Wiraswasta", "Kurang"),
        (44.0, "PNS", "Buruk"),
    ] {
        let body = common::applicant_json(umur, pekerjaan, riwayat).to_string();
        let (status, json) = post_predict(app.clone(), body).await;
        assert_eq!(status, StatusCode::OK);

        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 3);

        let probability = json["positive_probability"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&probability));

        let prediction = json["prediction"].as_u64().unwrap();
        assert_eq!(prediction == 1, probability >= 0.5);
        let expected_status = if prediction == 1 { "Layak Kredit" } else { "Tidak Layak Kredit" };
        assert_eq!(json["status_text"], expected_status);
    }
}

#[tokio::test]
async fn test_identical_requests_identical_probability() {
    let app = app_with(PredictionService::ready(common::seeded_artifact(3)));
    let body = common::applicant_json(33.0, "Swasta", "Baik").to_string();

    let (_, first) = post_predict(app.clone(), body.clone()).await;
    let (_, second) = post_predict(app, body).await;

    assert_eq!(first["positive_probability"], second["positive_probability"]);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_missing_body_is_bad_request() {
    let app = app_with(PredictionService::ready(common::constant_artifact(0.82)));

    for body in ["", "null", "{}", "not json at all"] {
        let (status, json) = post_predict(app.clone(), body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {body:?}");
        assert_eq!(json, json!({"error": "Data tidak ditemukan dalam request"}));
        assert!(json.get("positive_probability").is_none());
    }
}

#[tokio::test]
async fn test_unseen_category_still_succeeds() {
    let app = app_with(PredictionService::ready(common::seeded_artifact(11)));

    let body = common::applicant_json(29.0, "Petani", "Tidak Diketahui").to_string();
    let (status, json) = post_predict(app, body).await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["positive_probability"].as_f64().is_some());
}

#[tokio::test]
async fn test_missing_model_returns_fixed_error() {
    let app = app_with(PredictionService::load("/nonexistent/model_kredit_final.bin"));

    let valid = common::applicant_json(30.0, "PNS", "Baik").to_string();
    for body in [valid.as_str(), "", "{}"] {
        let (status, json) = post_predict(app.clone(), body.to_string()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json, json!({"error": "Model tidak tersedia, periksa log server."}));
    }
}

#[tokio::test]
async fn test_schema_violation_is_internal_error() {
    let app = app_with(PredictionService::ready(common::constant_artifact(0.82)));

    let mut missing_field = common::applicant_json(30.0, "PNS", "Baik");
    missing_field.as_object_mut().unwrap().remove("tenor");

    let mut wrong_type = common::applicant_json(30.0, "PNS", "Baik");
    wrong_type["umur"] = json!("tiga puluh");

    let mut unexpected = common::applicant_json(30.0, "PNS", "Baik");
    unexpected["nama"] = json!("Budi");

    for body in [missing_field, wrong_type, unexpected, json!([1, 2, 3])] {
        let (status, json) = post_predict(app.clone(), body.to_string()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json, json!({"error": "Terjadi kesalahan internal pada server."}));
    }
}

#[tokio::test]
async fn test_health_reports_model_state() {
    for (service, loaded) in [
        (PredictionService::ready(common::constant_artifact(0.5)), true),
        (PredictionService::unavailable("no artifact"), false),
    ] {
        let response = app_with(service)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["model_loaded"], loaded);
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }
}

//! Request handlers for the AQ API endpoints.

pub mod cities;
pub mod health;
pub mod health_risk;
pub mod heatmap;
pub mod historical;
pub mod metrics;
pub mod pollutants;
pub mod predictions;

use axum::{
    http::{header, StatusCode},
    response::Response,
};
use serde::Serialize;

use aq_protocol::ApiError;

/// Render an [`ApiError`] as its structured JSON response.
pub(crate) fn error_response(err: &ApiError) -> Response {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let json = serde_json::to_string(&err.to_response()).unwrap_or_default();
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(json.into())
        .unwrap()
}

/// Serialize a value as a 200 JSON response.
pub(crate) fn json_response<T: Serialize>(value: &T) -> Response {
    let json = match serde_json::to_string(value) {
        Ok(j) => j,
        Err(e) => {
            tracing::error!("Failed to serialize response: {}", e);
            return error_response(&ApiError::InternalError(
                "Failed to serialize response".to_string(),
            ));
        }
    };
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .body(json.into())
        .unwrap()
}

#[cfg(test)]
mod tests {
    //! End-to-end router tests against a temporary dataset and artifacts.

    use std::io::Write;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use serde_json::Value;
    use tower::util::ServiceExt;

    use crate::config::ServiceConfig;
    use crate::state::AppState;

    const HEADER: &str = "city_name,datetime,lat,lon,main.aqi,components.co,components.no,components.no2,components.o3,components.so2,components.pm2_5,components.pm10,components.nh3";

    struct TestFixture {
        // Held to keep the files alive for the router's lifetime.
        _dir: tempfile::TempDir,
        app: Router,
    }

    fn fixture_with_rows(rows: &[&str]) -> TestFixture {
        let dir = tempfile::tempdir().unwrap();

        let data_path = dir.path().join("air_quality.csv");
        let mut data = std::fs::File::create(&data_path).unwrap();
        writeln!(data, "{HEADER}").unwrap();
        for row in rows {
            writeln!(data, "{row}").unwrap();
        }

        let model_path = dir.path().join("aqi_model.json");
        std::fs::write(
            &model_path,
            r#"{"kind":"linear","intercept":3.0,"coefficients":[0,0,0,0,0,0,0,0,0,0,0,0]}"#,
        )
        .unwrap();

        let scaler_path = dir.path().join("aqi_scaler.json");
        let names: Vec<String> = (0..12).map(|i| format!("f{i}")).collect();
        std::fs::write(
            &scaler_path,
            serde_json::to_string(&serde_json::json!({
                "feature_names": names,
                "mean": vec![0.0; 12],
                "scale": vec![1.0; 12],
            }))
            .unwrap(),
        )
        .unwrap();

        let state = Arc::new(AppState::new(ServiceConfig {
            data_path,
            model_path,
            scaler_path,
        }));

        TestFixture {
            _dir: dir,
            app: crate::router(state),
        }
    }

    fn fixture() -> TestFixture {
        fixture_with_rows(&[
            "Manila,2024-05-01 08:00:00,14.6,120.98,2,300,0.5,12,40,5,25,40,3",
            "Manila,2024-05-10 08:00:00,14.6,120.98,4,310,0.6,13,41,6,26,41,4",
            "Quezon City,2024-06-02 08:00:00,14.68,121.03,3,320,0.7,14,42,7,27,42,5",
        ])
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_health() {
        let fx = fixture();
        let (status, body) = get_json(&fx.app, "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_cities() {
        let fx = fixture();
        let (status, body) = get_json(&fx.app, "/api/cities").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!(["Manila", "Quezon City"]));
    }

    #[tokio::test]
    async fn test_historical_unfiltered_returns_all_rows() {
        let fx = fixture();
        let (status, body) = get_json(&fx.app, "/api/historical").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 3);
        assert_eq!(body["timezone"], "Asia/Manila");
        assert!(body["date_range"]["start"]
            .as_str()
            .unwrap()
            .ends_with("+08:00"));
    }

    #[tokio::test]
    async fn test_historical_month_filter() {
        let fx = fixture();
        let (status, body) = get_json(&fx.app, "/api/historical?month=5").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_historical_malformed_month_applies_no_filter() {
        let fx = fixture();
        let (status, body) = get_json(&fx.app, "/api/historical?month=banana").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_historical_empty_result_has_null_range() {
        let fx = fixture();
        let (status, body) = get_json(&fx.app, "/api/historical?city=Atlantis").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 0);
        assert!(body["date_range"]["start"].is_null());
        assert!(body["date_range"]["end"].is_null());
    }

    #[tokio::test]
    async fn test_daily_rollup_counts_distinct_dates() {
        let fx = fixture();
        let (status, body) = get_json(&fx.app, "/api/historical/daily").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_heatmap() {
        let fx = fixture();
        let (status, body) = get_json(&fx.app, "/api/heatmap").await;
        assert_eq!(status, StatusCode::OK);
        let cells = body.as_array().unwrap();
        assert_eq!(cells.len(), 2);
        let manila = cells.iter().find(|c| c["city_name"] == "Manila").unwrap();
        assert_eq!(manila["data_points"], 2);
        assert_eq!(manila["avg_aqi"], 3.0);
    }

    #[tokio::test]
    async fn test_metrics_known_city() {
        let fx = fixture();
        let (status, body) = get_json(&fx.app, "/api/metrics?city=Manila").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["average_aqi"], 3.0);
        assert_eq!(body["trend"], "Worsening");
    }

    #[tokio::test]
    async fn test_metrics_unknown_city_is_404() {
        let fx = fixture();
        let (status, body) = get_json(&fx.app, "/api/metrics?city=Atlantis").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "city-not-found");
    }

    #[tokio::test]
    async fn test_pollutants_map() {
        let fx = fixture();
        let (status, body) = get_json(&fx.app, "/api/pollutants?city=Quezon%20City").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["CO"], 320.0);
        assert_eq!(body["NH3"], 5.0);
    }

    #[tokio::test]
    async fn test_health_risk_classification() {
        let fx = fixture();
        // Latest AQI overall is 3 (Quezon City, June).
        let (status, body) = get_json(&fx.app, "/api/health-risk").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["level"], "Unhealthy for Sensitive Groups");
        assert_eq!(body["color"], "orange");
    }

    #[tokio::test]
    async fn test_health_risk_unknown_city_is_404() {
        let fx = fixture();
        let (status, body) = get_json(&fx.app, "/api/health-risk?city=Atlantis").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "city-not-found");
    }

    #[tokio::test]
    async fn test_predictions_default_horizon() {
        let fx = fixture();
        let (status, body) = get_json(&fx.app, "/api/predictions?city=Manila").await;
        assert_eq!(status, StatusCode::OK);
        let records = body["data"].as_array().unwrap();
        assert_eq!(records.len(), 7);
        assert_eq!(records[0]["city_name"], "Manila");
        assert_eq!(records[0]["is_prediction"], true);
        assert_eq!(records[0]["predicted_aqi"], 3.0);
        assert_eq!(body["skipped"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_predictions_all_cities() {
        let fx = fixture();
        let (status, body) = get_json(&fx.app, "/api/predictions?days=2").await;
        assert_eq!(status, StatusCode::OK);
        // Two cities, two days each.
        assert_eq!(body["data"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_predictions_malformed_days_is_400() {
        let fx = fixture();
        let (status, body) = get_json(&fx.app, "/api/predictions?days=abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid-parameter");
    }

    #[tokio::test]
    async fn test_predictions_unknown_city_is_404() {
        let fx = fixture();
        let (status, body) = get_json(&fx.app, "/api/predictions?city=Atlantis").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "no-forecast-data");
    }

    #[tokio::test]
    async fn test_missing_dataset_is_503_everywhere_but_health() {
        let dir = tempfile::tempdir().unwrap();
        let state = Arc::new(AppState::new(ServiceConfig {
            data_path: dir.path().join("missing.csv"),
            model_path: dir.path().join("missing_model.json"),
            scaler_path: dir.path().join("missing_scaler.json"),
        }));
        let app = crate::router(state);

        for uri in [
            "/api/cities",
            "/api/historical",
            "/api/historical/daily",
            "/api/heatmap",
            "/api/metrics",
            "/api/pollutants",
            "/api/health-risk",
        ] {
            let (status, body) = get_json(&app, uri).await;
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "uri {uri}");
            assert_eq!(body["error"], "data-unavailable", "uri {uri}");
        }

        let (status, _) = get_json(&app, "/api/health").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_artifacts_disable_only_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let data_path = dir.path().join("air_quality.csv");
        let mut data = std::fs::File::create(&data_path).unwrap();
        writeln!(data, "{HEADER}").unwrap();
        writeln!(
            data,
            "Manila,2024-05-01 08:00:00,14.6,120.98,2,300,0.5,12,40,5,25,40,3"
        )
        .unwrap();

        let state = Arc::new(AppState::new(ServiceConfig {
            data_path,
            model_path: dir.path().join("missing_model.json"),
            scaler_path: dir.path().join("missing_scaler.json"),
        }));
        let app = crate::router(state);

        let (status, body) = get_json(&app, "/api/predictions").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "model-unavailable");

        let (status, _) = get_json(&app, "/api/metrics").await;
        assert_eq!(status, StatusCode::OK);
    }
}

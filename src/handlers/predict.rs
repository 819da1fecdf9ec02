//! Prediction handlers

use axum::{
    extract::{Multipart, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::logic::pipeline::{self, Outcome, PipelineError, Stage};
use crate::models::{PredictionReport, RESULT_FILENAME, RESULT_MIME};
use crate::{AppResult, AppState};

/// Multipart field carrying the CSV
const FILE_FIELD: &str = "file";

/// Run detection on an uploaded CSV and return the JSON report
pub async fn predict(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<PredictionReport>> {
    let upload = read_upload(multipart).await?;
    let request_id = Uuid::new_v4();
    let outcome = run_pipeline(&state, request_id, upload).await?;

    let report = PredictionReport::render(request_id, outcome, state.config.preview_rows);
    tracing::info!(
        %request_id,
        stage = ?Stage::Rendered,
        fraud = report.summary.fraud_count,
        total = report.summary.total_count,
        "Fraud detection completed"
    );
    Ok(Json(report))
}

/// Run detection and return the result table as a CSV attachment
pub async fn download(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Response> {
    let upload = read_upload(multipart).await?;
    let request_id = Uuid::new_v4();
    let outcome = run_pipeline(&state, request_id, upload).await?;

    tracing::info!(%request_id, stage = ?Stage::Rendered, "Result file sent");
    Ok((
        [
            (header::CONTENT_TYPE, RESULT_MIME.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", RESULT_FILENAME),
            ),
        ],
        outcome.csv,
    )
        .into_response())
}

// Helper functions

/// Bytes of the `file` part, or of the first part that carries a filename
async fn read_upload(mut multipart: Multipart) -> AppResult<Vec<u8>> {
    while let Some(field) = multipart.next_field().await? {
        let is_file = field.name() == Some(FILE_FIELD) || field.file_name().is_some();
        if !is_file {
            continue;
        }

        let bytes = field.bytes().await?;
        if bytes.is_empty() {
            break;
        }
        return Ok(bytes.to_vec());
    }

    Err(PipelineError::NoFile.into())
}

async fn run_pipeline(state: &AppState, request_id: Uuid, upload: Vec<u8>) -> AppResult<Outcome> {
    let model = state.model.clone();
    let span = tracing::info_span!("upload", %request_id, bytes = upload.len());

    let result = tokio::task::spawn_blocking(move || {
        span.in_scope(|| pipeline::run(&upload, model.as_ref()))
    })
    .await?;

    result.map_err(|err| {
        tracing::debug!(%request_id, stage = ?Stage::Failed, from = ?err.stage());
        err.into()
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::logic::model::testing::StubClassifier;
    use crate::{create_router, AppState};

    const BOUNDARY: &str = "fraud-dashboard-test-boundary";

    fn app(n_features: usize) -> axum::Router {
        create_router(AppState {
            model: Arc::new(StubClassifier::new(n_features)),
            config: Config::default(),
        })
    }

    fn upload_request(uri: &str, csv: &str) -> Request<Body> {
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"transactions.csv\"\r\nContent-Type: text/csv\r\n\r\n{csv}\r\n--{b}--\r\n",
            b = BOUNDARY,
            csv = csv
        );
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_predict_returns_report() {
        let csv = "f1,Amount,Class\n0.9,120.5,1\n0.2,3.0,0\n";
        let response = app(2)
            .oneshot(upload_request("/api/v1/predict", csv))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let report = json_body(response).await;
        assert_eq!(report["stage"], "rendered");
        assert_eq!(report["summary"]["fraud_count"], 1);
        assert_eq!(report["summary"]["safe_count"], 1);
        assert_eq!(report["summary"]["total_count"], 2);
        assert_eq!(report["notices"].as_array().unwrap().len(), 3);
        assert_eq!(report["preview"].as_array().unwrap().len(), 2);
        assert_eq!(report["download"]["filename"], "fraud_predictions.csv");
        assert_eq!(report["download"]["mime"], "text/csv");
        assert!(report["download"]["content"]
            .as_str()
            .unwrap()
            .starts_with("f1,scaled_amount,Fraud Prediction,Fraud Probability\n"));
    }

    #[tokio::test]
    async fn test_preview_is_capped() {
        let mut csv = String::from("f1,scaled_amount\n");
        for i in 0..120 {
            csv.push_str(&format!("{},{}\n", i % 2, i));
        }
        let response = app(2)
            .oneshot(upload_request("/api/v1/predict", &csv))
            .await
            .unwrap();

        let report = json_body(response).await;
        assert_eq!(report["preview"].as_array().unwrap().len(), 50);
        assert_eq!(report["summary"]["total_count"], 120);
    }

    #[tokio::test]
    async fn test_feature_mismatch_reports_counts() {
        let response = app(3)
            .oneshot(upload_request("/api/v1/predict", "Amount,scaled_amount,f1\n1,2,3\n"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = json_body(response).await;
        assert_eq!(body["kind"], "feature_count_mismatch");
        assert_eq!(body["expected"], 3);
        assert_eq!(body["actual"], 2);
    }

    #[tokio::test]
    async fn test_missing_amount_is_rejected() {
        let response = app(2)
            .oneshot(upload_request("/api/v1/predict", "f1,f2\n1,2\n"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = json_body(response).await;
        assert_eq!(body["kind"], "missing_amount_column");
        assert_eq!(body["stage"], "uploaded");
    }

    #[tokio::test]
    async fn test_request_without_file() {
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n--{b}--\r\n",
            b = BOUNDARY
        );
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/predict")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();

        let response = app(2).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["kind"], "no_file");
    }

    #[tokio::test]
    async fn test_download_is_csv_attachment() {
        let response = app(2)
            .oneshot(upload_request(
                "/api/v1/predict/download",
                "scaled_amount,f1\n0.7,1\n",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "text/csv");
        assert_eq!(
            response.headers()["content-disposition"],
            "attachment; filename=\"fraud_predictions.csv\""
        );

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert_eq!(
            text.lines().next().unwrap(),
            "scaled_amount,f1,Fraud Prediction,Fraud Probability"
        );
    }

    #[tokio::test]
    async fn test_health_and_model_routes() {
        let response = app(4)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["model"]["n_features_in"], 4);

        let response = app(4)
            .oneshot(Request::get("/api/v1/model").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(json_body(response).await["n_features_in"], 4);
    }

    #[tokio::test]
    async fn test_dashboard_page() {
        let response = app(2)
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("Financial Fraud Detection Dashboard"));
    }
}

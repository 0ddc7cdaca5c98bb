use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;

use onboard_capture::fingerprint::{FingerprintCapture, FingerprintScanner};
use onboard_core::store::{BlobStore, RecordStore};
use onboard_storage::Database;
use onboard_util::ArtifactPolicy;

use crate::pipeline::SubmissionPipeline;
use crate::session::{system_clock, Clock, SessionTokens};
use crate::{auth, dashboard, onboarding, telemetry};

#[derive(Clone)]
pub struct AppState {
    metrics: PrometheusHandle,
    pub(crate) storage: Database,
    pub(crate) records: Arc<dyn RecordStore>,
    pub(crate) sessions: SessionTokens,
    pub(crate) pipeline: SubmissionPipeline,
    pub(crate) fingerprint: Arc<FingerprintCapture>,
    blobs: Option<Arc<dyn BlobStore>>,
    policy: ArtifactPolicy,
    clock: Clock,
}

impl AppState {
    pub fn new(
        metrics: PrometheusHandle,
        storage: Database,
        session_secret: &[u8],
        session_ttl_secs: u64,
        policy: ArtifactPolicy,
        blobs: Option<Arc<dyn BlobStore>>,
        scanner: Arc<dyn FingerprintScanner>,
    ) -> Self {
        let clock = system_clock();
        let records: Arc<dyn RecordStore> = Arc::new(storage.records());
        let pipeline =
            SubmissionPipeline::new(records.clone(), blobs.clone(), policy, clock.clone());
        Self {
            metrics,
            storage,
            records,
            sessions: SessionTokens::new(session_secret, session_ttl_secs),
            pipeline,
            fingerprint: Arc::new(FingerprintCapture::new(scanner)),
            blobs,
            policy,
            clock,
        }
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock.clone();
        self.pipeline = SubmissionPipeline::new(
            self.records.clone(),
            self.blobs.clone(),
            self.policy,
            clock,
        );
        self
    }

    pub fn metrics(&self) -> &PrometheusHandle {
        &self.metrics
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))
        .route("/api/capture/fingerprint", post(onboarding::scan_fingerprint))
        .route(
            "/api/onboarding",
            post(onboarding::submit).get(dashboard::list),
        )
        .route("/api/onboarding/stats", get(dashboard::stats))
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = telemetry::render_metrics(state.metrics());
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
        .body(Body::from(body))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use chrono::TimeZone;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    use onboard_capture::fingerprint::SimulatedScanner;

    async fn setup_state(db_name: &str) -> AppState {
        let metrics = telemetry::init_metrics().expect("metrics init");
        let url = format!("sqlite:file:{db_name}?mode=memory&cache=shared");
        let database = Database::connect(&url).await.expect("connect");
        database.run_migrations().await.expect("migrations");

        AppState::new(
            metrics,
            database,
            b"router-test-secret",
            3600,
            ArtifactPolicy::Inline,
            None,
            Arc::new(SimulatedScanner::new(Duration::ZERO, 0.0)),
        )
    }

    fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn read_json(response: Response) -> Value {
        let collected = response.into_body().collect().await.expect("body");
        serde_json::from_slice(&collected.to_bytes()).expect("json body")
    }

    async fn register(app: &Router, email: &str) -> String {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/register",
                None,
                json!({
                    "name": "Jane Doe",
                    "email": email,
                    "password": "hunter22",
                    "confirmPassword": "hunter22",
                }),
            ))
            .await
            .expect("register");
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = read_json(response).await;
        body["token"].as_str().expect("token").to_string()
    }

    fn jane_submission() -> Value {
        json!({
            "name": "Jane Doe",
            "slNo": "SL-001",
            "address": "123 Main St",
            "mobileNumber": "+15551234567",
            "emailId": "jane@example.com",
        })
    }

    #[tokio::test]
    async fn healthz_returns_ok() {
        let app = app_router(setup_state("router_healthz").await);

        let response = app
            .oneshot(get_request("/healthz", None))
            .await
            .expect("handler should respond");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_exports_build_info() {
        let app = app_router(setup_state("router_metrics").await);

        let response = app
            .oneshot(get_request("/metrics", None))
            .await
            .expect("handler should respond");
        assert_eq!(response.status(), StatusCode::OK);

        let collected = response.into_body().collect().await.expect("body");
        let body = String::from_utf8(collected.to_bytes().to_vec()).expect("utf-8");
        assert!(body.contains("app_build_info"));
        assert!(body.contains("app_uptime_seconds"));
    }

    #[tokio::test]
    async fn register_login_submit_and_list_round_trip() {
        let clock: Clock = Arc::new(|| Utc.with_ymd_and_hms(2024, 5, 15, 12, 0, 0).unwrap());
        let state = setup_state("router_flow").await.with_clock(clock);
        let app = app_router(state);
        register(&app, "admin@example.com").await;

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/login",
                None,
                json!({"email": "admin@example.com", "password": "hunter22"}),
            ))
            .await
            .expect("login");
        assert_eq!(response.status(), StatusCode::OK);
        let token = read_json(response).await["token"]
            .as_str()
            .expect("token")
            .to_string();

        let mut submission = jane_submission();
        submission["fingerprint"] = json!("scan-abc");
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/onboarding",
                Some(&token),
                submission,
            ))
            .await
            .expect("submit");
        assert_eq!(response.status(), StatusCode::CREATED);
        let outcome = read_json(response).await;
        assert!(outcome["id"].as_str().is_some());
        assert_eq!(outcome["included"]["fingerprint"], json!(true));
        assert_eq!(outcome["included"]["signature"], json!(false));

        let response = app
            .clone()
            .oneshot(get_request("/api/onboarding", Some(&token)))
            .await
            .expect("list");
        assert_eq!(response.status(), StatusCode::OK);
        let records = read_json(response).await;
        let records = records.as_array().expect("array");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["name"], json!("Jane Doe"));
        assert_eq!(records[0]["slNo"], json!("SL-001"));
        assert_eq!(records[0]["fingerprint"], json!("scan-abc"));
        assert_eq!(records[0]["signature"], json!(""));

        let response = app
            .oneshot(get_request("/api/onboarding/stats", Some(&token)))
            .await
            .expect("stats");
        assert_eq!(response.status(), StatusCode::OK);
        let stats = read_json(response).await;
        assert_eq!(stats["total"], json!(1));
        assert_eq!(stats["thisMonth"], json!(1));
        assert_eq!(stats["completed"], json!(0));
    }

    #[tokio::test]
    async fn submission_without_a_session_is_unauthorized() {
        let app = app_router(setup_state("router_anon_submit").await);

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/onboarding",
                None,
                jane_submission(),
            ))
            .await
            .expect("submit");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn invalid_form_is_rejected_before_auth() {
        let app = app_router(setup_state("router_invalid_form").await);

        let mut submission = jane_submission();
        submission["emailId"] = json!("not-an-email");
        // No token on purpose: validation still answers first.
        let response = app
            .oneshot(json_request("POST", "/api/onboarding", None, submission))
            .await
            .expect("submit");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = read_json(response).await;
        assert_eq!(body["type"], json!("validation_failed"));
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let app = app_router(setup_state("router_dup_register").await);
        register(&app, "dup@example.com").await;

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/auth/register",
                None,
                json!({
                    "name": "Jane Doe",
                    "email": "dup@example.com",
                    "password": "hunter22",
                    "confirmPassword": "hunter22",
                }),
            ))
            .await
            .expect("register");
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let app = app_router(setup_state("router_bad_login").await);
        register(&app, "admin2@example.com").await;

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/auth/login",
                None,
                json!({"email": "admin2@example.com", "password": "wrong-pass"}),
            ))
            .await
            .expect("login");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn me_echoes_the_session_identity() {
        let app = app_router(setup_state("router_me").await);
        let token = register(&app, "me@example.com").await;

        let response = app
            .oneshot(get_request("/api/auth/me", Some(&token)))
            .await
            .expect("me");
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["email"], json!("me@example.com"));
        assert_eq!(body["role"], json!("admin"));
    }

    #[tokio::test]
    async fn fingerprint_scan_returns_a_token() {
        let app = app_router(setup_state("router_scan").await);
        let token = register(&app, "scan@example.com").await;

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/capture/fingerprint",
                Some(&token),
                json!({}),
            ))
            .await
            .expect("scan");
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert!(body["token"].as_str().expect("token").starts_with("scan-"));

        let response = app
            .oneshot(json_request("POST", "/api/capture/fingerprint", None, json!({})))
            .await
            .expect("scan");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

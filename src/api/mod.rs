// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP surface.
//!
//! Two versions are served side by side. `/api/v1` is the legacy surface:
//! every route is public and only logged. `/api/v2` puts tuition and admin
//! routes behind authentication, and the mutating student-facing routes
//! behind the daily limit as well.

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::authenticate,
    middleware::{attach_context, enforce_daily_limit, log_request},
    models::{
        BatchUploadResponse, CredentialsRequest, PaymentResponse, SessionResponse,
        TransactionStatus, TuitionQueryResponse, UnpaidTuition,
    },
    state::AppState,
};

pub mod accounts;
pub mod admin;
pub mod health;
pub mod tuition;

pub fn router(state: AppState) -> Router {
    let logged = ServiceBuilder::new()
        .layer(from_fn_with_state(state.request_log.clone(), log_request))
        .layer(from_fn(attach_context));

    let v1_routes = Router::new()
        .route("/health", get(health::health))
        .route("/register", post(accounts::register))
        .route("/login", post(accounts::login))
        .route("/mobile/tuition", get(tuition::query_tuition))
        .route("/banking/tuition", get(tuition::query_tuition))
        .route("/admin/add-student", post(admin::add_student))
        .route("/admin/add-tuition", post(admin::add_tuition))
        .layer(logged.clone());

    let public = Router::new()
        .route("/health", get(health::health))
        .route("/register", post(accounts::register))
        .route("/login", post(accounts::login));

    let authenticated = Router::new()
        .route("/banking/tuition", get(tuition::query_tuition))
        .route("/admin/add-student", post(admin::add_student))
        .route("/admin/add-tuition", post(admin::add_tuition))
        .route("/admin/add-tuition-batch", post(admin::add_tuition_batch))
        .route("/admin/unpaid-status", get(admin::unpaid_status))
        .route("/admin/logs", get(admin::request_logs))
        .route_layer(from_fn_with_state(state.tokens.clone(), authenticate));

    let rate_limited = Router::new()
        .route("/mobile/tuition", get(tuition::query_tuition))
        .route("/banking/pay", post(tuition::pay_tuition))
        .route_layer(
            ServiceBuilder::new()
                .layer(from_fn_with_state(state.tokens.clone(), authenticate))
                .layer(from_fn_with_state(state.ledger.clone(), enforce_daily_limit)),
        );

    let v2_routes = public.merge(authenticated).merge(rate_limited).layer(logged);

    Router::new()
        .nest("/api/v1", v1_routes)
        .nest("/api/v2", v2_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        accounts::register,
        accounts::login,
        tuition::query_tuition,
        tuition::pay_tuition,
        admin::add_student,
        admin::add_tuition,
        admin::add_tuition_batch,
        admin::unpaid_status,
        admin::request_logs
    ),
    components(
        schemas(
            health::HealthResponse,
            CredentialsRequest,
            SessionResponse,
            TuitionQueryResponse,
            PaymentResponse,
            TransactionStatus,
            BatchUploadResponse,
            UnpaidTuition
        )
    ),
    tags(
        (name = "Health", description = "Liveness"),
        (name = "Accounts", description = "Registration and login"),
        (name = "Tuition", description = "Tuition queries and payments"),
        (name = "Admin", description = "Provisioning, reporting and request logs")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenService;
    use crate::models::{Amount, Balance, StudentId};
    use crate::storage::{InMemoryLedger, LedgerStore, RequestLog};
    use axum::{
        body::{to_bytes, Body},
        http::{
            header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE},
            Method, Request, StatusCode,
        },
        response::Response,
    };
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct Harness {
        app: Router,
        state: AppState,
        ledger: Arc<InMemoryLedger>,
        _dir: TempDir,
    }

    fn harness(daily_limit: u32) -> Harness {
        let dir = TempDir::new().unwrap();
        let ledger = Arc::new(InMemoryLedger::new(daily_limit));
        let log = RequestLog::open(dir.path().join("logs/api_requests.log")).unwrap();
        let state = AppState::new(ledger.clone(), TokenService::new(b"router-test-secret"), log);
        Harness {
            app: router(state.clone()),
            state,
            ledger,
            _dir: dir,
        }
    }

    impl Harness {
        fn seed(
            &self,
            student: &str,
            balance: rust_decimal::Decimal,
            term_total: Option<rust_decimal::Decimal>,
        ) {
            let id = StudentId::from(student);
            self.ledger.add_account(&id, Balance::new(balance)).unwrap();
            if let Some(total) = term_total {
                self.ledger
                    .add_tuition(&id, "2025-fall", Amount::new(total).unwrap())
                    .unwrap();
            }
        }

        fn token_for(&self, student: &str) -> String {
            self.state.tokens.issue(&StudentId::from(student)).unwrap().token
        }

        async fn send(&self, request: Request<Body>) -> Response {
            self.app.clone().oneshot(request).await.unwrap()
        }

        async fn get(&self, uri: &str, token: Option<&str>) -> Response {
            let mut builder = Request::builder().uri(uri);
            if let Some(token) = token {
                builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
            }
            self.send(builder.body(Body::empty()).unwrap()).await
        }

        async fn post(&self, uri: &str, token: Option<&str>) -> Response {
            let mut builder = Request::builder().method(Method::POST).uri(uri);
            if let Some(token) = token {
                builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
            }
            self.send(builder.body(Body::empty()).unwrap()).await
        }
    }

    async fn json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn router_builds_and_serves_docs() {
        let h = harness(10);
        let response = h.get("/api-doc/openapi.json", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let doc = json(response).await;
        assert!(doc["paths"]["/api/v2/banking/pay"].is_object());
    }

    #[tokio::test]
    async fn health_is_public_on_both_versions() {
        let h = harness(10);
        for uri in ["/api/v1/health", "/api/v2/health"] {
            let response = h.get(uri, None).await;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(json(response).await["status"], "healthy");
        }
    }

    #[tokio::test]
    async fn register_then_login_sets_session_cookie() {
        let h = harness(10);
        let body = r#"{"student_no":"2021001","password":"pw-123"}"#;

        let register = h
            .send(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/v2/register")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await;
        assert_eq!(register.status(), StatusCode::OK);
        let cookie = register.headers()[SET_COOKIE].to_str().unwrap().to_string();
        assert!(cookie.starts_with("jwt="));
        assert!(cookie.contains("HttpOnly"));

        let again = h
            .send(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/v2/register")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await;
        assert_eq!(again.status(), StatusCode::CONFLICT);

        let login = h
            .send(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/v2/login")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await;
        assert_eq!(login.status(), StatusCode::OK);
        let session = json(login).await;
        let claims = h
            .state
            .tokens
            .verify(session["token"].as_str().unwrap())
            .unwrap();
        assert_eq!(claims.sub, "2021001");

        let wrong = h
            .send(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/v2/login")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"student_no":"2021001","password":"nope"}"#))
                    .unwrap(),
            )
            .await;
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn v2_query_requires_token_and_logs_auth_failure() {
        let h = harness(10);
        h.seed("s1", dec!(50), Some(dec!(200)));

        let response = h
            .get("/api/v2/mobile/tuition?student_no=s1&active_term=2025-fall", None)
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let lines = h.state.request_log.lines().unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("GET /api/v2/mobile/tuition | IP: unknown | Status: 401"));
        assert!(lines[0].ends_with("Auth: false"));
    }

    #[tokio::test]
    async fn v2_query_with_cookie_returns_own_tuition() {
        let h = harness(10);
        h.seed("s1", dec!(50), Some(dec!(200)));
        let token = h.token_for("s1");

        let response = h
            .send(
                Request::builder()
                    .uri("/api/v2/mobile/tuition?student_no=s1&active_term=2025-fall")
                    .header(COOKIE, format!("jwt={token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["student_no"], "s1");
        assert_eq!(body["term"], "2025-fall");

        let lines = h.state.request_log.lines().unwrap();
        assert!(lines[0].ends_with("Auth: true"));
    }

    #[tokio::test]
    async fn foreign_student_query_looks_like_missing_student() {
        let h = harness(10);
        h.seed("s1", dec!(50), Some(dec!(200)));
        h.seed("s2", dec!(50), Some(dec!(200)));
        let token = h.token_for("s2");

        let foreign = h
            .get("/api/v2/banking/tuition?student_no=s1&active_term=2025-fall", Some(&token))
            .await;
        let foreign_status = foreign.status();
        let foreign_body = json(foreign).await;

        let missing = h
            .get("/api/v2/banking/tuition?student_no=s2&active_term=2030-spring", Some(&token))
            .await;
        assert_eq!(foreign_status, StatusCode::NOT_FOUND);
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(foreign_body, json(missing).await);
    }

    #[tokio::test]
    async fn v1_query_is_public() {
        let h = harness(10);
        h.seed("s1", dec!(50), Some(dec!(200)));

        let response = h
            .get("/api/v1/mobile/tuition?student_no=s1&active_term=2025-fall", None)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn pay_is_v2_only_and_rate_limited() {
        let h = harness(2);
        h.seed("s1", dec!(50), Some(dec!(200)));
        let token = h.token_for("s1");

        let v1 = h.post("/api/v1/banking/pay?student_no=s1&term=2025-fall&amount=100", None).await;
        assert_eq!(v1.status(), StatusCode::NOT_FOUND);

        let first = h
            .post("/api/v2/banking/pay?student_no=s1&term=2025-fall&amount=100", Some(&token))
            .await;
        assert_eq!(first.status(), StatusCode::OK);
        let first = json(first).await;
        assert_eq!(first["term_settled"], false);

        let bad = h
            .post("/api/v2/banking/pay?student_no=s1&term=2025-fall&amount=-5", Some(&token))
            .await;
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let second = h
            .post("/api/v2/banking/pay?student_no=s1&term=2025-fall&amount=100", Some(&token))
            .await;
        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(json(second).await["term_settled"], true);

        let third = h
            .post("/api/v2/banking/pay?student_no=s1&term=2025-fall&amount=1", Some(&token))
            .await;
        assert_eq!(third.status(), StatusCode::TOO_MANY_REQUESTS);

        let account = h.ledger.get_account(&StudentId::from("s1")).unwrap().unwrap();
        assert_eq!(account.balance, Balance::new(dec!(50)));
    }

    #[tokio::test]
    async fn admin_provisioning_and_unpaid_listing() {
        let h = harness(10);
        let token = h.token_for("admin");

        let added = h
            .post("/api/v2/admin/add-student?student_no=s9&balance=100", Some(&token))
            .await;
        assert_eq!(added.status(), StatusCode::OK);

        let tuition = h
            .post(
                "/api/v2/admin/add-tuition?student_no=s9&term=2025-fall&tuition_amount=500",
                Some(&token),
            )
            .await;
        assert_eq!(tuition.status(), StatusCode::OK);

        let duplicate = h
            .post(
                "/api/v2/admin/add-tuition?student_no=s9&term=2025-fall&tuition_amount=700",
                Some(&token),
            )
            .await;
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);

        let unpaid = h.get("/api/v2/admin/unpaid-status", Some(&token)).await;
        assert_eq!(unpaid.status(), StatusCode::OK);
        let unpaid = json(unpaid).await;
        assert_eq!(unpaid.as_array().unwrap().len(), 1);
        assert_eq!(unpaid[0]["student_no"], "s9");

        let bad_limit = h.get("/api/v2/admin/unpaid-status?limit=ten", Some(&token)).await;
        assert_eq!(bad_limit.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn batch_upload_stops_at_first_bad_row() {
        let h = harness(10);
        h.seed("s1", dec!(10), None);
        h.seed("s2", dec!(10), None);
        let token = h.token_for("admin");

        let csv = concat!(
            "student_no,term,amount\n",
            "s1,2025-fall,100\n",
            "s2,2025-fall,200\n",
            "ghost,2025-fall,300\n",
        );
        let boundary = "tuition-batch-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"tuition.csv\"\r\n\
             Content-Type: text/csv\r\n\r\n\
             {csv}\r\n\
             --{boundary}--\r\n"
        );

        let response = h
            .send(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/v2/admin/add-tuition-batch")
                    .header(AUTHORIZATION, format!("Bearer {token}"))
                    .header(CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let error = json(response).await;
        assert!(error["error"].as_str().unwrap().starts_with("row 3:"));

        assert_eq!(h.ledger.list_unpaid(10, 0).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn log_export_returns_earlier_requests() {
        let h = harness(10);
        let token = h.token_for("admin");

        h.get("/api/v1/health", None).await;
        let response = h.get("/api/v2/admin/logs", Some(&token)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let lines = json(response).await;
        let lines = lines.as_array().unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].as_str().unwrap().contains("GET /api/v1/health"));
    }
}

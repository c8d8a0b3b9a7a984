//! HTTP tests against the full router backed by the in-memory store

use crate::{create_router, AppState};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use mcr_common::{
    config::{AppConfig, StoreBackend},
    errors::messages,
    MemoryStore, UserContext, UserRole,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;

struct TestApp {
    router: Router,
    state: AppState,
}

impl TestApp {
    fn new() -> Self {
        let mut config = AppConfig::default();
        config.store.backend = StoreBackend::Memory;
        config.rate_limit.enabled = false;

        let state = AppState::new(config, Arc::new(MemoryStore::new())).unwrap();
        Self {
            router: create_router(state.clone()),
            state,
        }
    }

    fn token(&self, role: UserRole, state: Option<&str>) -> String {
        let user = UserContext {
            user_id: format!("{}-user", role),
            email: "user@example.com".to_string(),
            full_name: "Casey Reporter".to_string(),
            state: state.map(str::to_string),
            role,
        };
        self.state.jwt.generate_token(&user).unwrap()
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value, Option<String>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body, location)
    }

    /// Start a report as a Maryland state user, returning its id
    async fn create_report(&self) -> String {
        let token = self.token(UserRole::StateUser, Some("MD"));
        let (status, body, _) = self
            .send(
                Method::POST,
                "/v1/reports/MCPAR/MD",
                Some(&token),
                Some(json!({
                    "programName": "Healthy Futures",
                    "reportingPeriodStartDate": "01/01/2022",
                    "reportingPeriodEndDate": "12/31/2022"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_str().unwrap().to_string()
    }
}

fn error_message(body: &Value) -> &str {
    body["error"]["message"].as_str().unwrap_or_default()
}

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new();
    let (status, body, _) = app.send(Method::GET, "/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body, _) = app.send(Method::GET, "/v1/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["checks"]["store"]["status"], "up");
}

#[tokio::test]
async fn test_missing_token_is_unauthenticated() {
    let app = TestApp::new();
    let (status, _, _) = app
        .send(Method::GET, "/v1/reports/MCPAR/MD", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = app
        .send(Method::GET, "/v1/reports/MCPAR/MD", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_archive_missing_report_is_not_found() {
    let app = TestApp::new();
    let admin = app.token(UserRole::Admin, None);
    let (status, body, _) = app
        .send(
            Method::PUT,
            "/v1/reports/MCPAR/MD/does-not-exist/archive",
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(error_message(&body).contains(messages::NO_MATCHING_RECORD));
}

#[tokio::test]
async fn test_archive_by_non_admin_is_forbidden_whether_or_not_report_exists() {
    let app = TestApp::new();
    let id = app.create_report().await;

    for (role, state) in [
        (UserRole::StateUser, Some("MD")),
        (UserRole::StateRep, Some("MD")),
        (UserRole::HelpDesk, None),
        (UserRole::Approver, None),
    ] {
        let token = app.token(role, state);
        for target in [id.as_str(), "does-not-exist"] {
            let uri = format!("/v1/reports/MCPAR/MD/{}/archive", target);
            let (status, body, _) = app.send(Method::PUT, &uri, Some(&token), None).await;
            assert_eq!(status, StatusCode::FORBIDDEN);
            assert!(error_message(&body).contains(messages::UNAUTHORIZED));
        }
    }
}

#[tokio::test]
async fn test_archive_unknown_path_segments() {
    let app = TestApp::new();

    let state_user = app.token(UserRole::StateUser, Some("MD"));
    let (status, body, _) = app
        .send(
            Method::PUT,
            "/v1/reports/mock-type/AB/testReportId/archive",
            Some(&state_user),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(error_message(&body).contains(messages::UNAUTHORIZED));

    let admin = app.token(UserRole::Admin, None);
    for uri in [
        "/v1/reports/mock-type/AB/testReportId/archive",
        "/v1/reports/MCPAR/AB/testReportId/archive",
    ] {
        let (status, body, _) = app.send(Method::PUT, uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert!(error_message(&body).contains(messages::NO_MATCHING_RECORD));
    }
}

#[tokio::test]
async fn test_archive_by_admin_marks_report_archived() {
    let app = TestApp::new();
    let id = app.create_report().await;
    let admin = app.token(UserRole::Admin, None);

    let uri = format!("/v1/reports/MCPAR/MD/{}/archive", id);
    let (status, body, _) = app.send(Method::PUT, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["archived"], true);
    assert_eq!(body["programName"], "Healthy Futures");

    // writes to an archived report conflict
    let state_user = app.token(UserRole::StateUser, Some("MD"));
    let uri = format!("/v1/reports/MCPAR/MD/{}", id);
    let (status, body, _) = app
        .send(
            Method::PUT,
            &uri,
            Some(&state_user),
            Some(json!({"fieldData": {"contactName": "Ada"}})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(error_message(&body).contains(messages::REPORT_ARCHIVED));
}

#[tokio::test]
async fn test_reports_are_scoped_to_the_callers_state() {
    let app = TestApp::new();
    let id = app.create_report().await;
    let uri = format!("/v1/reports/MCPAR/MD/{}", id);

    let other_state = app.token(UserRole::StateUser, Some("VA"));
    let (status, _, _) = app.send(Method::GET, &uri, Some(&other_state), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let help_desk = app.token(UserRole::HelpDesk, None);
    let (status, body, _) = app.send(Method::GET, &uri, Some(&help_desk), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Not started");

    let (status, body, _) = app
        .send(Method::GET, "/v1/reports/MCPAR/MD", Some(&help_desk), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert!(body[0].get("fieldData").is_none());
}

#[tokio::test]
async fn test_create_report_validates_program_fields() {
    let app = TestApp::new();
    let token = app.token(UserRole::StateUser, Some("MD"));
    let (status, body, _) = app
        .send(
            Method::POST,
            "/v1/reports/MCPAR/MD",
            Some(&token),
            Some(json!({
                "programName": "Healthy Futures",
                "reportingPeriodStartDate": "01/01/2022",
                "reportingPeriodEndDate": "13/45/2022"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["details"]["aep-endDate"].is_string());

    let (status, _, _) = app
        .send(
            Method::POST,
            "/v1/reports/MCPAR/ZZ",
            Some(&token),
            Some(json!({
                "programName": "Healthy Futures",
                "reportingPeriodStartDate": "01/01/2022",
                "reportingPeriodEndDate": "12/31/2022"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_autosave_writes_changed_valid_fields() {
    let app = TestApp::new();
    let id = app.create_report().await;
    let token = app.token(UserRole::StateUser, Some("MD"));

    let uri = format!("/v1/reports/MCPAR/MD/{}/autosave", id);
    let (status, body, _) = app
        .send(
            Method::POST,
            &uri,
            Some(&token),
            Some(json!({
                "fields": [
                    {"name": "contactName", "value": "Ada Lovelace", "hydrationValue": ""},
                    {"name": "state_statewideMedicaidEnrollment", "value": "01,000"}
                ]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["saved"], json!(["contactName"]));
    assert_eq!(body["skipped"][0]["name"], "state_statewideMedicaidEnrollment");

    let (_, report, _) = app
        .send(Method::GET, &format!("/v1/reports/MCPAR/MD/{}", id), Some(&token), None)
        .await;
    assert_eq!(report["fieldData"]["contactName"], "Ada Lovelace");
    assert_eq!(report["status"], "In progress");
    assert_eq!(report["lastAlteredBy"], "Casey Reporter");
}

#[tokio::test]
async fn test_entities_are_listed_with_formatted_view() {
    let app = TestApp::new();
    let id = app.create_report().await;
    let token = app.token(UserRole::StateUser, Some("MD"));
    let uri = format!("/v1/reports/MCPAR/MD/{}/entities/accessMeasures", id);

    let (status, body, _) = app
        .send(
            Method::POST,
            &uri,
            Some(&token),
            Some(json!({
                "accessMeasure_generalCategory": [{"key": "accessMeasure_generalCategory-timeDistance", "value": "Time / Distance"}],
                "accessMeasure_standardDescription": "Within 30 miles",
                "accessMeasure_standardType": [{"key": "accessMeasure_standardType-other", "value": "Other, specify"}],
                "accessMeasure_standardType-otherText": "Travel time by transit",
                "accessMeasure_providerType": [{"key": "accessMeasure_providerType-primaryCare", "value": "Primary care"}],
                "accessMeasure_applicableRegion": [{"key": "accessMeasure_applicableRegion-statewide", "value": "Statewide"}],
                "accessMeasure_population": [{"key": "accessMeasure_population-adult", "value": "Adult"}],
                "accessMeasure_monitoringMethods": [{"key": "accessMeasure_monitoringMethods-geomapping", "value": "Geomapping"}],
                "accessMeasure_oversightMethodFrequency": [{"key": "accessMeasure_oversightMethodFrequency-monthly", "value": "Monthly"}]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let entity_id = body["id"].as_str().unwrap().to_string();

    let (status, body, _) = app.send(Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["id"], entity_id.as_str());
    assert_eq!(body[0]["formatted"]["standardType"], "Travel time by transit");
    assert_eq!(body[0]["formatted"]["monitoringMethods"], json!(["Geomapping"]));

    let (status, _, _) = app
        .send(
            Method::DELETE,
            &format!("{}/{}", uri, entity_id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = app
        .send(
            Method::DELETE,
            &format!("{}/{}", uri, entity_id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_dashboard_offers_archive_only_to_admins() {
    let app = TestApp::new();
    app.create_report().await;

    let admin = app.token(UserRole::Admin, None);
    let (status, body, _) = app
        .send(Method::GET, "/v1/dashboard/MCPAR?state=MD", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["canAddProgram"], false);
    assert_eq!(body["rows"][0]["actions"], json!(["enter", "archive"]));

    let state_user = app.token(UserRole::StateUser, Some("MD"));
    let (status, body, _) = app
        .send(Method::GET, "/v1/dashboard/MCPAR", Some(&state_user), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "MD");
    assert_eq!(body["canAddProgram"], true);
    assert_eq!(body["rows"][0]["actions"], json!(["enter", "edit_program"]));
    assert_eq!(
        body["rows"][0]["enterPath"],
        "/mcpar/program-information/point-of-contact"
    );
}

#[tokio::test]
async fn test_dashboard_without_active_state_redirects_home() {
    let app = TestApp::new();
    let approver = app.token(UserRole::Approver, None);
    let (status, _, location) = app
        .send(Method::GET, "/v1/dashboard/MCPAR", Some(&approver), None)
        .await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location.as_deref(), Some("/"));

    let (status, body, _) = app
        .send(Method::GET, "/v1/dashboard/MCPAR?state=VA", Some(&approver), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["empty"], true);
}

#[tokio::test]
async fn test_form_validation_endpoint() {
    let app = TestApp::new();
    let token = app.token(UserRole::StateUser, Some("MD"));

    let (status, body, _) = app
        .send(
            Method::POST,
            "/v1/forms/test/validate?field=test3",
            Some(&token),
            Some(json!({"test3": "1,234.50"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);

    let (status, body, _) = app
        .send(
            Method::POST,
            "/v1/forms/apoc/validate",
            Some(&token),
            Some(json!({"contactName": "   ", "contactEmailAddress": "casey@example.com"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"]["contactName"], "A response is required");

    let (status, _, _) = app
        .send(
            Method::POST,
            "/v1/forms/unknown/validate",
            Some(&token),
            Some(json!({})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_template_and_route_lookup() {
    let app = TestApp::new();
    let token = app.token(UserRole::HelpDesk, None);

    let (status, body, _) = app
        .send(Method::GET, "/v1/templates/MCPAR", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["basePath"], "/mcpar");

    let (status, body, _) = app
        .send(Method::GET, "/v1/routes/resolve?path=/admin", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "redirect");
    assert_eq!(body["to"], "/profile");

    let (_, body, _) = app
        .send(
            Method::GET,
            "/v1/routes/resolve?path=/mcpar/program-level-indicators/quality-measures",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(body["kind"], "reportPage");
    assert_eq!(body["page"]["pageType"], "modalDrawer");
}

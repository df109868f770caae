//! # Admin API
//!
//! Builds the axum router for the admin HTTP interface. Handlers share
//! application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                      | Description                          |
//! |--------|---------------------------|--------------------------------------|
//! | GET    | `/health`                 | Liveness probe                       |
//! | POST   | `/credentials/known`      | Known-credentials probe              |
//! | GET    | `/identity-lookup/:email` | Identity owning a verified email     |
//! | GET    | `/metrics`                | Prometheus text exposition           |

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use verity_core::discovery::{lookup_verified_identity, CredentialProbe, DiscoveryError};
use verity_core::MemoryStore;

use crate::metrics::{self, SharedMetrics};

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Reported version string.
    pub version: String,
    /// Identity pool queried by discovery and lookup.
    pub store: Arc<MemoryStore>,
    /// Prometheus counters.
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full [`Router`] with every route, CORS, and request tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let metrics_routes = Router::new()
        .route("/metrics", get(metrics::metrics_handler))
        .with_state(Arc::clone(&state.metrics));

    Router::new()
        .route("/health", get(health_handler))
        .route("/credentials/known", post(known_credentials_handler))
        .route("/identity-lookup/:email", get(identity_lookup_handler))
        .with_state(state)
        .merge(metrics_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Error body returned on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Maps a discovery failure to its status and `{"error": ..}` body.
///
/// Internal failures are logged and answered with a generic message.
fn error_response(err: DiscoveryError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let message = match &err {
        DiscoveryError::Internal(e) => {
            tracing::error!(error = %e, "store failure");
            "internal server error".to_string()
        }
        other => other.to_string(),
    };
    (status, Json(ErrorResponse { error: message })).into_response()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "ok", "version": state.version })),
    )
}

/// `POST /credentials/known`
///
/// Takes the raw body so that decoding failures get the same error shape
/// as every other bad request.
async fn known_credentials_handler(State(state): State<AppState>, body: Bytes) -> Response {
    state.metrics.discovery_requests_total.inc();

    match CredentialProbe::new(state.store.as_ref()).handle(&body) {
        Ok(result) => {
            if result.found {
                state.metrics.discovery_found_total.inc();
            }
            Json(result).into_response()
        }
        Err(e) => {
            if e.is_bad_request() {
                state.metrics.discovery_rejected_total.inc();
            }
            error_response(e)
        }
    }
}

/// `GET /identity-lookup/:email`
///
/// Unknown and unverified addresses are both 404.
async fn identity_lookup_handler(
    Path(email): Path<String>,
    State(state): State<AppState>,
) -> Response {
    state.metrics.identity_lookups_total.inc();

    match lookup_verified_identity(state.store.as_ref(), &email) {
        Ok(identity) => Json(identity).into_response(),
        Err(e) => error_response(e),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::Utc;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use verity_core::identity::{Credentials, CredentialsType, Identity, VerifiableAddress};

    fn identity(email: &str, verified: bool) -> Identity {
        let mut identity = Identity::new("default", json!({ "email": email }));
        let mut address = VerifiableAddress::new_email(email, identity.id);
        if verified {
            address.mark_verified(Utc::now());
        }
        identity.verifiable_addresses.push(address);
        identity
    }

    /// Store with a password user, an OIDC user, and an unverified user.
    fn test_app_state() -> AppState {
        let store = MemoryStore::new();

        let mut uma = identity("uma@example.com", true);
        uma.set_credentials(Credentials::new(
            CredentialsType::Password,
            vec!["uma".into()],
            json!({"hashed_password": "$argon2id$hidden"}),
        ));
        store.insert_identity(uma).unwrap();

        let mut vic = identity("vic@example.com", true);
        vic.set_credentials(Credentials::new(
            CredentialsType::Oidc,
            vec!["google:1".into(), "github:2".into()],
            json!({"providers": [
                {"provider": "google", "subject": "1"},
                {"provider": "github", "subject": "2"}
            ]}),
        ));
        store.insert_identity(vic).unwrap();

        store.insert_identity(identity("wes@example.com", false)).unwrap();

        AppState {
            version: "0.1.0-test".into(),
            store: Arc::new(store),
            metrics: Arc::new(crate::metrics::DiscoveryMetrics::new().unwrap()),
        }
    }

    async fn get(router: &Router, path: &str) -> (StatusCode, Vec<u8>) {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        (status, body)
    }

    async fn post_raw(router: &Router, path: &str, body: &str) -> (StatusCode, Vec<u8>) {
        let req = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        (status, body)
    }

    fn json_body(body: &[u8]) -> Value {
        serde_json::from_slice(body).unwrap()
    }

    // -- health --------------------------------------------------------------

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, "/health").await;

        assert_eq!(status, StatusCode::OK);
        let json = json_body(&body);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], "0.1.0-test");
    }

    // -- known credentials ---------------------------------------------------

    #[tokio::test]
    async fn probe_reports_password_username() {
        let router = create_router(test_app_state());
        let (status, body) = post_raw(
            &router,
            "/credentials/known",
            r#"{"identifier":"uma@example.com"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json_body(&body),
            json!({"found": true, "methods": [{"method": "password", "username": "uma"}]})
        );
    }

    #[tokio::test]
    async fn probe_reports_oidc_providers_in_order() {
        let router = create_router(test_app_state());
        let (status, body) = post_raw(
            &router,
            "/credentials/known",
            r#"{"identifier":"vic@example.com","method":"oidc"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json_body(&body),
            json!({"found": true, "methods": [
                {"method": "oidc", "provider": "google"},
                {"method": "oidc", "provider": "github"}
            ]})
        );
    }

    #[tokio::test]
    async fn probe_unknown_identifier() {
        let router = create_router(test_app_state());
        let (status, body) = post_raw(
            &router,
            "/credentials/known",
            r#"{"identifier":"zed@example.com"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(&body), json!({"found": false, "methods": []}));
    }

    #[tokio::test]
    async fn probe_bad_requests() {
        let state = test_app_state();
        let metrics = Arc::clone(&state.metrics);
        let router = create_router(state);

        for (body, needle) in [
            (r#"{"identifier":""}"#, "must specify identifier"),
            (r#"{"identifier":"uma@example.com","method":"saml"}"#, "saml"),
            (r#"{"identifier":"uma@example.com","nope":1}"#, "malformed"),
            ("{", "malformed"),
        ] {
            let (status, resp) = post_raw(&router, "/credentials/known", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body {}", body);
            let error = json_body(&resp)["error"].as_str().unwrap().to_string();
            assert!(error.contains(needle), "{} should mention {}", error, needle);
        }

        assert_eq!(metrics.discovery_requests_total.get(), 4);
        assert_eq!(metrics.discovery_rejected_total.get(), 4);
        assert_eq!(metrics.discovery_found_total.get(), 0);
    }

    // -- identity lookup -----------------------------------------------------

    #[tokio::test]
    async fn lookup_returns_identity_without_configs() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, "/identity-lookup/uma@example.com").await;

        assert_eq!(status, StatusCode::OK);
        let json = json_body(&body);
        assert_eq!(json["traits"]["email"], "uma@example.com");
        assert_eq!(json["credentials"]["password"]["identifiers"], json!(["uma"]));
        assert!(json["credentials"]["password"]["config"].is_null());
        assert!(!String::from_utf8_lossy(&body).contains("argon2id"));
    }

    #[tokio::test]
    async fn lookup_unverified_and_unknown_are_404() {
        let router = create_router(test_app_state());

        let (status, body) = get(&router, "/identity-lookup/wes@example.com").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json_body(&body)["error"], "email is unverified");

        let (status, _) = get(&router, "/identity-lookup/nobody@example.com").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    // -- metrics -------------------------------------------------------------

    #[tokio::test]
    async fn metrics_reflect_requests() {
        let router = create_router(test_app_state());
        post_raw(
            &router,
            "/credentials/known",
            r#"{"identifier":"uma@example.com"}"#,
        )
        .await;
        get(&router, "/identity-lookup/uma@example.com").await;

        let (status, body) = get(&router, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        let text = String::from_utf8(body).unwrap();
        assert!(text.contains("verity_discovery_requests_total 1"));
        assert!(text.contains("verity_discovery_found_total 1"));
        assert!(text.contains("verity_identity_lookups_total 1"));
    }
}

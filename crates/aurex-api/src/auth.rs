//! # Authentication & Authorization Middleware
//!
//! Bearer token middleware with role-based access control.
//!
//! ## Token Format
//!
//! Bearer tokens encode role and exporter identity:
//!
//! ```text
//! Bearer {role}:{exporter_id}:{secret}   — current format
//! Bearer {secret}                         — legacy format (treated as admin)
//! ```
//!
//! The shared secret comes from `AUTH_TOKEN`. There is deliberately no
//! hardcoded fallback: when the variable is unset, authentication is
//! disabled outright and a warning is logged, so a deployment can never
//! run "protected" by a secret that ships in the source tree.
//!
//! ## CallerIdentity
//!
//! Every authenticated request gets a [`CallerIdentity`] injected into the
//! request extensions. Handlers extract it via the `FromRequestParts` impl.
//! The session middleware (below the auth middleware in the stack) uses
//! the identity's session key to enforce the idle timeout.

use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, ErrorBody, ErrorDetail};
use crate::session::{SessionCheck, SessionTracker};

// ── Role ────────────────────────────────────────────────────────────────────

/// Roles in the back office, ordered by privilege level.
///
/// The `Ord` derivation respects variant declaration order:
/// `ExporterAgent < Officer < Admin`. This enables `>=` comparison for
/// role-based access checks.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// An exporter's representative: can read records tied to their exporter.
    ExporterAgent,
    /// Registry staff: full read/write on intake, assay, invoicing, reports.
    Officer,
    /// Full access, including exporter registry management.
    Admin,
}

impl Role {
    /// Return the string representation of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExporterAgent => "exporter_agent",
            Self::Officer => "officer",
            Self::Admin => "admin",
        }
    }
}

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// Identity of the authenticated caller, extracted from the auth context
/// and available to all route handlers via Axum's `FromRequestParts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    /// The caller's role in the system.
    pub role: Role,
    /// The caller's exporter binding (for the exporter_agent role).
    /// `None` for officers and admins — they operate across exporters.
    pub exporter_id: Option<Uuid>,
}

impl CallerIdentity {
    /// Check if the caller has at least the given minimum role.
    pub fn has_role(&self, minimum: Role) -> bool {
        self.role >= minimum
    }

    /// Check if the caller may see records belonging to the given exporter.
    ///
    /// - `Admin` and `Officer` can access any exporter's records.
    /// - `ExporterAgent` only their bound exporter; an agent with no
    ///   binding is denied.
    pub fn can_access_exporter(&self, exporter_id: Uuid) -> bool {
        match self.role {
            Role::Admin | Role::Officer => true,
            Role::ExporterAgent => self.exporter_id == Some(exporter_id),
        }
    }

    /// Key under which this caller's session is tracked.
    pub fn session_key(&self) -> String {
        match self.exporter_id {
            Some(id) => format!("{}:{}", self.role.as_str(), id),
            None => format!("{}:-", self.role.as_str()),
        }
    }
}

/// Extracts the identity that the auth middleware injected into extensions.
/// Returns 401 if no identity is present (middleware didn't run or failed).
#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

/// Check that the caller has at least the required role.
/// Returns 403 Forbidden if the caller's role is insufficient.
pub fn require_role(caller: &CallerIdentity, minimum: Role) -> Result<(), AppError> {
    if caller.has_role(minimum) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "role '{}' required, caller has '{}'",
            minimum.as_str(),
            caller.role.as_str()
        )))
    }
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// Auth configuration injected into request extensions.
///
/// Custom `Debug` redacts the token value to prevent credential leakage in logs.
#[derive(Clone)]
pub struct AuthConfig {
    pub token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ── Token Validation ────────────────────────────────────────────────────────

/// Constant-time comparison of bearer tokens.
///
/// Prevents timing side-channels that could reveal token length or prefix.
/// When lengths differ, performs a dummy comparison to avoid leaking length
/// information through timing variance.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Parse the bearer token in format `{role}:{exporter_id}:{secret}` or
/// `{secret}` (legacy).
///
/// Legacy tokens (without role prefix) are treated as `Admin` for backward
/// compatibility with existing deployments.
pub fn parse_bearer_token(provided: &str, expected_secret: &str) -> Result<CallerIdentity, String> {
    let parts: Vec<&str> = provided.splitn(3, ':').collect();

    match parts.len() {
        // Legacy format: just the secret.
        1 => {
            if constant_time_token_eq(provided, expected_secret) {
                Ok(CallerIdentity {
                    role: Role::Admin,
                    exporter_id: None,
                })
            } else {
                Err("invalid bearer token".into())
            }
        }
        // Current format: role:exporter_id:secret (exporter_id may be empty).
        3 => {
            let role_str = parts[0];
            let exporter_str = parts[1];
            let secret = parts[2];

            if !constant_time_token_eq(secret, expected_secret) {
                return Err("invalid bearer token".into());
            }

            let role = match role_str {
                "admin" => Role::Admin,
                "officer" => Role::Officer,
                "exporter_agent" => Role::ExporterAgent,
                other => return Err(format!("unknown role: {other}")),
            };

            let exporter_id = if exporter_str.is_empty() {
                None
            } else {
                Some(
                    exporter_str
                        .parse::<Uuid>()
                        .map_err(|e| format!("invalid exporter_id: {e}"))?,
                )
            };

            Ok(CallerIdentity { role, exporter_id })
        }
        _ => Err("invalid token format — expected {role}:{exporter_id}:{secret} or {secret}".into()),
    }
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Extract and validate the Bearer token from the Authorization header.
///
/// Parses the token to extract [`CallerIdentity`] (role + exporter binding)
/// and injects it into request extensions for downstream handlers.
///
/// When `AuthConfig.token` is `None`, all requests are allowed with `Admin`
/// identity (auth disabled / development mode).
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let expected_token = request.extensions().get::<AuthConfig>().cloned();

    match expected_token {
        Some(AuthConfig {
            token: Some(ref expected),
        }) => {
            let auth_header = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok());

            match auth_header {
                Some(header_value) if header_value.starts_with("Bearer ") => {
                    let provided = &header_value[7..];
                    match parse_bearer_token(provided, expected) {
                        Ok(identity) => {
                            request.extensions_mut().insert(identity);
                            next.run(request).await
                        }
                        Err(msg) => {
                            tracing::warn!(reason = %msg, "authentication failed: invalid bearer token");
                            unauthorized_response("UNAUTHORIZED", &msg)
                        }
                    }
                }
                Some(_) => {
                    tracing::warn!("authentication failed: non-Bearer authorization scheme");
                    unauthorized_response(
                        "UNAUTHORIZED",
                        "authorization header must use Bearer scheme",
                    )
                }
                None => {
                    tracing::warn!("authentication failed: missing authorization header");
                    unauthorized_response("UNAUTHORIZED", "missing authorization header")
                }
            }
        }
        _ => {
            // Auth disabled — inject Admin identity for full access.
            request.extensions_mut().insert(CallerIdentity {
                role: Role::Admin,
                exporter_id: None,
            });
            next.run(request).await
        }
    }
}

/// Enforce the idle timeout on the authenticated caller's session.
///
/// Runs after the auth middleware. A session that sat idle past the
/// timeout is rejected once with `SESSION_EXPIRED`; because the tracker
/// removes the stale entry, the caller's next request starts a fresh
/// session. Requests with no identity (auth middleware missing) pass
/// through untouched — authentication failures are not this layer's job.
pub async fn session_middleware(request: Request, next: Next) -> Response {
    let tracker = request.extensions().get::<SessionTracker>().cloned();
    let identity = request.extensions().get::<CallerIdentity>().cloned();

    if let (Some(tracker), Some(identity)) = (tracker, identity) {
        if tracker.touch(&identity.session_key()) == SessionCheck::Expired {
            tracing::info!(session = %identity.session_key(), "session expired after idle timeout");
            return unauthorized_response(
                "SESSION_EXPIRED",
                "session expired after inactivity — retry to start a new session",
            );
        }
    }

    next.run(request).await
}

fn unauthorized_response(code: &str, message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: code.to_string(),
            message: message.to_string(),
            details: None,
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::Router;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    /// Build a minimal router with the auth middleware and a simple handler.
    fn test_app(token: Option<String>) -> Router {
        let auth_config = AuthConfig { token };
        Router::new()
            .route("/test", get(|| async { "ok" }))
            .layer(from_fn(auth_middleware))
            .layer(axum::Extension(auth_config))
    }

    // ── Auth middleware tests ────────────────────────────────────

    #[tokio::test]
    async fn valid_bearer_token_accepted() {
        let app = test_app(Some("my-secret".to_string()));

        let request = Request::builder()
            .uri("/test")
            .header("Authorization", "Bearer my-secret")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_authorization_header_rejected() {
        let app = test_app(Some("my-secret".to_string()));

        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let err: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(err["error"]["code"], "UNAUTHORIZED");
        assert!(err["error"]["message"].as_str().unwrap().contains("missing"));
    }

    #[tokio::test]
    async fn invalid_token_rejected() {
        let app = test_app(Some("my-secret".to_string()));

        let request = Request::builder()
            .uri("/test")
            .header("Authorization", "Bearer wrong-token")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn non_bearer_scheme_rejected() {
        let app = test_app(Some("my-secret".to_string()));

        let request = Request::builder()
            .uri("/test")
            .header("Authorization", "Basic dXNlcjpwYXNz")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let err: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(err["error"]["message"]
            .as_str()
            .unwrap()
            .contains("Bearer scheme"));
    }

    #[tokio::test]
    async fn auth_disabled_allows_all_requests() {
        let app = test_app(None);

        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn constant_time_eq_matrix() {
        assert!(constant_time_token_eq("secret-token-123", "secret-token-123"));
        assert!(!constant_time_token_eq("wrong-token", "secret-token-123"));
        assert!(!constant_time_token_eq("secret", "secret-token-123"));
        assert!(!constant_time_token_eq("", "secret-token-123"));
    }

    // ── Role tests ───────────────────────────────────────────────

    #[test]
    fn role_ordering_is_correct() {
        assert!(Role::ExporterAgent < Role::Officer);
        assert!(Role::Officer < Role::Admin);
    }

    #[test]
    fn has_role_respects_ordering() {
        let officer = CallerIdentity {
            role: Role::Officer,
            exporter_id: None,
        };
        assert!(officer.has_role(Role::ExporterAgent));
        assert!(officer.has_role(Role::Officer));
        assert!(!officer.has_role(Role::Admin));
    }

    #[test]
    fn require_role_returns_forbidden_when_insufficient() {
        let agent = CallerIdentity {
            role: Role::ExporterAgent,
            exporter_id: Some(Uuid::new_v4()),
        };
        let err = require_role(&agent, Role::Officer).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    // ── Exporter scoping tests ───────────────────────────────────

    #[test]
    fn officer_and_admin_access_any_exporter() {
        let exporter = Uuid::new_v4();
        for role in [Role::Officer, Role::Admin] {
            let caller = CallerIdentity {
                role,
                exporter_id: None,
            };
            assert!(caller.can_access_exporter(exporter));
        }
    }

    #[test]
    fn exporter_agent_only_accesses_own_exporter() {
        let own = Uuid::new_v4();
        let caller = CallerIdentity {
            role: Role::ExporterAgent,
            exporter_id: Some(own),
        };
        assert!(caller.can_access_exporter(own));
        assert!(!caller.can_access_exporter(Uuid::new_v4()));
    }

    #[test]
    fn unbound_exporter_agent_is_denied() {
        let caller = CallerIdentity {
            role: Role::ExporterAgent,
            exporter_id: None,
        };
        assert!(!caller.can_access_exporter(Uuid::new_v4()));
    }

    #[test]
    fn session_key_includes_binding() {
        let exporter = Uuid::new_v4();
        let agent = CallerIdentity {
            role: Role::ExporterAgent,
            exporter_id: Some(exporter),
        };
        assert_eq!(agent.session_key(), format!("exporter_agent:{exporter}"));

        let admin = CallerIdentity {
            role: Role::Admin,
            exporter_id: None,
        };
        assert_eq!(admin.session_key(), "admin:-");
    }

    // ── parse_bearer_token tests ─────────────────────────────────

    #[test]
    fn parse_bearer_token_legacy_format() {
        let identity = parse_bearer_token("my-secret", "my-secret").unwrap();
        assert_eq!(identity.role, Role::Admin);
        assert!(identity.exporter_id.is_none());
    }

    #[test]
    fn parse_bearer_token_officer() {
        let identity = parse_bearer_token("officer::my-secret", "my-secret").unwrap();
        assert_eq!(identity.role, Role::Officer);
        assert!(identity.exporter_id.is_none());
    }

    #[test]
    fn parse_bearer_token_exporter_agent_with_binding() {
        let identity = parse_bearer_token(
            "exporter_agent:550e8400-e29b-41d4-a716-446655440000:my-secret",
            "my-secret",
        )
        .unwrap();
        assert_eq!(identity.role, Role::ExporterAgent);
        assert_eq!(
            identity.exporter_id.unwrap().to_string(),
            "550e8400-e29b-41d4-a716-446655440000"
        );
    }

    #[test]
    fn parse_bearer_token_wrong_secret() {
        assert!(parse_bearer_token("officer::wrong", "my-secret").is_err());
    }

    #[test]
    fn parse_bearer_token_unknown_role() {
        let result = parse_bearer_token("superadmin::my-secret", "my-secret");
        assert!(result.unwrap_err().contains("unknown role"));
    }

    #[test]
    fn parse_bearer_token_invalid_uuid() {
        let result = parse_bearer_token("exporter_agent:not-a-uuid:my-secret", "my-secret");
        assert!(result.unwrap_err().contains("invalid exporter_id"));
    }

    #[test]
    fn parse_bearer_token_two_parts_rejected() {
        assert!(parse_bearer_token("role:secret", "secret").is_err());
    }

    // ── Session middleware tests ─────────────────────────────────

    use crate::session::Clock;
    use chrono::{DateTime, Duration, Utc};
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock()
        }
    }

    fn session_app(tracker: SessionTracker, token: Option<String>) -> Router {
        let auth_config = AuthConfig { token };
        Router::new()
            .route("/test", get(|| async { "ok" }))
            .layer(from_fn(session_middleware))
            .layer(from_fn(auth_middleware))
            .layer(axum::Extension(auth_config))
            .layer(axum::Extension(tracker))
    }

    #[tokio::test]
    async fn idle_session_gets_session_expired_then_recovers() {
        let clock = Arc::new(ManualClock {
            now: Mutex::new(Utc::now()),
        });
        let tracker = SessionTracker::with_clock(60, clock.clone());
        let app = session_app(tracker, Some("s".to_string()));

        let request = |_: ()| {
            Request::builder()
                .uri("/test")
                .header("Authorization", "Bearer s")
                .body(Body::empty())
                .unwrap()
        };

        // Establish the session.
        let response = app.clone().oneshot(request(())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Go idle past the timeout.
        *clock.now.lock() += Duration::seconds(120);
        let response = app.clone().oneshot(request(())).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let err: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(err["error"]["code"], "SESSION_EXPIRED");

        // The stale entry was dropped — the next request starts fresh.
        let response = app.oneshot(request(())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

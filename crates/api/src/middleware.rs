//! API middleware.

#![allow(missing_docs)]

use audit_common::{Caller, Role};
use audit_core::{AuditService, ReportService, SurveyService, UploadService};
use axum::{
    body::Body,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};

/// Header carrying the authenticated user id, set by the gateway.
pub const CALLER_ID_HEADER: &str = "x-caller-id";

/// Header carrying the authenticated user's role, set by the gateway.
pub const CALLER_ROLE_HEADER: &str = "x-caller-role";

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub survey_service: SurveyService,
    pub audit_service: AuditService,
    pub report_service: ReportService,
    pub upload_service: UploadService,
}

/// Caller identity middleware.
///
/// Attaches a [`Caller`] to the request when both identity headers are
/// present and valid. Requests without one are rejected later by
/// [`crate::extractors::AuthCaller`].
pub async fn caller_middleware(mut req: Request<Body>, next: Next) -> Response {
    let id = header_value(req.headers(), CALLER_ID_HEADER);
    let role = header_value(req.headers(), CALLER_ROLE_HEADER);

    if let (Some(id), Some(role)) = (id, role) {
        match role.parse::<Role>() {
            Ok(role) => {
                req.extensions_mut().insert(Caller::new(id, role));
            }
            Err(e) => tracing::debug!(error = %e, "Ignoring caller with unknown role"),
        }
    }

    next.run(req).await
}

/// Trimmed, non-empty value of a header.
fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::{Router, routing::get};
    use tower::ServiceExt;

    async fn whoami(req: Request<Body>) -> String {
        req.extensions()
            .get::<Caller>()
            .map_or_else(|| "anonymous".to_string(), |c| c.id.clone())
    }

    fn app() -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .layer(axum::middleware::from_fn(caller_middleware))
    }

    async fn call(id: Option<&str>, role: Option<&str>) -> String {
        let mut builder = Request::builder().uri("/whoami");
        if let Some(id) = id {
            builder = builder.header(CALLER_ID_HEADER, id);
        }
        if let Some(role) = role {
            builder = builder.header(CALLER_ROLE_HEADER, role);
        }
        let response = app()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_caller_attached_from_headers() {
        assert_eq!(call(Some(" insp1 "), Some("INSPECTOR")).await, "insp1");
    }

    #[tokio::test]
    async fn test_caller_missing_or_invalid() {
        assert_eq!(call(None, Some("ADMIN")).await, "anonymous");
        assert_eq!(call(Some("u1"), None).await, "anonymous");
        assert_eq!(call(Some("u1"), Some("janitor")).await, "anonymous");
    }
}

use std::convert::Infallible;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::decode_token;
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated user context extracted from the provider's JWT
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: Option<String>,
}

/// Caller identity, present or not. Handlers decide whether they need it.
#[derive(Clone, Debug, Default)]
pub struct Identity(pub Option<AuthUser>);

impl Identity {
    /// The caller, or 401
    pub fn require(&self) -> Result<&AuthUser, ApiError> {
        self.0.as_ref().ok_or_else(ApiError::unauthorized)
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Identity>().cloned().unwrap_or_default())
    }
}

/// Resolves the bearer token into an [`Identity`] without rejecting the request.
///
/// Missing or invalid tokens leave the identity empty, so each handler can run its own
/// checks in order (database first, then authentication).
pub async fn identity_middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let identity = match extract_jwt_from_headers(request.headers()) {
        Some(token) => match decode_token(token, state.config.auth.jwt_secret.as_deref()) {
            Ok(claims) => Identity(Some(AuthUser {
                user_id: claims.sub,
                email: claims.email,
            })),
            Err(e) => {
                tracing::debug!(error = %e, "Rejected bearer token");
                Identity(None)
            }
        },
        None => Identity(None),
    };
    request.extensions_mut().insert(identity);
    next.run(request).await
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Option<&str> {
    let auth_str = headers.get("authorization")?.to_str().ok()?;
    let token = auth_str.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_jwt_from_headers(&headers), None);
        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_jwt_from_headers(&headers), Some("abc.def"));
        headers.insert("authorization", HeaderValue::from_static("Basic xyz"));
        assert_eq!(extract_jwt_from_headers(&headers), None);
        headers.insert("authorization", HeaderValue::from_static("Bearer   "));
        assert_eq!(extract_jwt_from_headers(&headers), None);
    }

    #[test]
    fn empty_identity_requires_login() {
        assert_eq!(Identity(None).require().unwrap_err().status_code(), 401);
    }
}

//! Request extractors.

use super::state::AppState;
use crate::session::{RequestSession, SessionProvider};
use crate::types::OwnerId;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use std::convert::Infallible;
use uuid::Uuid;

/// Token of an `Authorization: Bearer <token>` header
///
/// Missing, malformed and empty headers all yield `None`.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// The signed-in owner of a request, if any
///
/// Never rejects: an unknown or absent token is an anonymous session, and
/// each handler decides what anonymous means for it.
#[derive(Debug, Clone, Copy)]
pub struct CurrentOwner(pub Option<OwnerId>);

#[async_trait]
impl FromRequestParts<AppState> for CurrentOwner {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = RequestSession::from_token(bearer_token(&parts.headers), state.sessions.as_ref());
        Ok(Self(session.current_owner_id()))
    }
}

/// Correlation ID set by the middleware
///
/// Falls back to a fresh UUID when the middleware isn't installed.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .extensions
                .get::<Uuid>()
                .copied()
                .unwrap_or_else(Uuid::new_v4),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn bearer_token_is_extracted() {
        assert_eq!(bearer_token(&headers("Bearer abc123")), Some("abc123"));
    }

    #[test]
    fn other_schemes_and_blank_tokens_are_ignored() {
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&headers("Bearer   ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}

use axum::extract::{FromRequestParts, Request};
use axum::middleware::Next;
use axum::response::Response;
use http::request::Parts;
use http::HeaderMap;

use crate::api::server::RouteError;

/// Header carrying the identity provider's stable external user id. The
/// value is trusted as given; verifying it is the provider's job.
pub const EXTERNAL_ID_HEADER: &str = "x-external-id";

/// The caller's external identity, inserted by [`require_identity`] and
/// read back by handlers as an extractor.
#[derive(Debug, Clone)]
pub struct ExternalIdentity(pub String);

pub fn identity_from(headers: &HeaderMap) -> Option<String> {
    headers
        .get(EXTERNAL_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

/// Reject requests without an external identity before they reach the
/// handler.
pub async fn require_identity(mut req: Request, next: Next) -> Result<Response, RouteError> {
    let Some(identity) = identity_from(req.headers()) else {
        return Err(RouteError::NotAuthenticated);
    };

    req.extensions_mut().insert(ExternalIdentity(identity));
    Ok(next.run(req).await)
}

impl<S> FromRequestParts<S> for ExternalIdentity
where
    S: Send + Sync,
{
    type Rejection = RouteError;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ExternalIdentity>()
            .cloned()
            .ok_or(RouteError::NotAuthenticated)
    }
}

use axum::extract::FromRequestParts;
use http::request::Parts;

use crate::{attributes, Error, RequestAttributes, Segment, SharedIdentity, USER_ATTRIBUTE};

impl<S> FromRequestParts<S> for RequestAttributes
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        RequestAttributes::from_extensions(&parts.extensions)
            .ok_or(Error::MissingIdentity(USER_ATTRIBUTE))
    }
}

impl<S> FromRequestParts<S> for Segment
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Segment>()
            .cloned()
            .ok_or(Error::MissingSegment)
    }
}

/// Extractor for the request's `user` identity.
///
/// Rejects with [`Error::MissingIdentity`] when
/// [`AuthUserLayer`](crate::AuthUserLayer) is not installed.
#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub SharedIdentity);

impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        attributes::require_user(&parts.extensions).map(Self)
    }
}

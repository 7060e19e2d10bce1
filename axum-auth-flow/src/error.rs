use axum::response::{IntoResponse, Response};
use http::StatusCode;
use tower::BoxError;

/// An error type which maps contract violations, session failures and
/// collaborator failures.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request carries no `user` attribute implementing
    /// [`UserIdentity`](crate::UserIdentity).
    ///
    /// This is a wiring mistake, e.g. a workflow mounted outside of
    /// [`AuthUserLayer`](crate::AuthUserLayer), and not an authentication
    /// failure.
    #[error("request attribute `{0}` is missing or does not implement `UserIdentity`")]
    MissingIdentity(&'static str),

    /// The request carries no session segment.
    ///
    /// Segments are installed by [`AuthUserLayer`](crate::AuthUserLayer), which
    /// in turn needs the `tower_sessions` session layer.
    #[error("session segment not found; is `AuthUserLayer` installed?")]
    MissingSegment,

    /// A mapping to `tower_sessions::session::Error`.
    #[error(transparent)]
    Session(#[from] tower_sessions::session::Error),

    /// A session segment value could not be converted.
    #[error(transparent)]
    Serde(#[from] serde_json::Error),

    /// The authenticator failed, as opposed to rejecting the credentials.
    #[error("authenticator failed: {0}")]
    Authenticator(#[source] BoxError),

    /// The persistent login store failed to create or delete a record.
    #[error("persistent login store failed: {0}")]
    PersistentLogin(#[source] BoxError),

    /// A configured status code is out of range.
    #[error(transparent)]
    InvalidStatus(#[from] http::status::InvalidStatusCode),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        tracing::error!(err = %self, "auth workflow failed");
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}

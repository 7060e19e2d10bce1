use std::{fmt, sync::Arc};

use http::{Response, StatusCode};
use time::{Duration, OffsetDateTime};

use crate::{
    identity::display_id, CookieSetter, Error, PersistentLoginDeleter, RequestAttributes,
    SessionSegment,
};

/// Tears down every place the login state lives: the persistent-login cookie,
/// the stored persistent logins, the session segment and the request's
/// identity.
///
/// The steps run in that order and nothing is rolled back: if a later step
/// fails, earlier ones stay done and the error is returned.
#[derive(Clone)]
pub struct LogoutWorkflow {
    deleter: Arc<dyn PersistentLoginDeleter>,
    cookie_name: String,
    status: StatusCode,
}

impl LogoutWorkflow {
    /// Creates a workflow expiring cookie `cookie_name` and answering `204`.
    pub fn new(
        cookie_name: impl Into<String>,
        deleter: impl PersistentLoginDeleter + 'static,
    ) -> Self {
        Self::from_arc(cookie_name, Arc::new(deleter))
    }

    /// Like [`new`](Self::new), for a deleter that is already shared.
    pub fn from_arc(
        cookie_name: impl Into<String>,
        deleter: Arc<dyn PersistentLoginDeleter>,
    ) -> Self {
        Self {
            deleter,
            cookie_name: cookie_name.into(),
            status: StatusCode::NO_CONTENT,
        }
    }

    /// Status for a completed logout.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Name of the persistent-login cookie.
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Runs the logout for one request.
    ///
    /// Logging out twice is harmless: the second run hands `None` to the
    /// deleter.
    #[tracing::instrument(level = "debug", skip_all, fields(user.id), err)]
    pub async fn handle<B>(
        &self,
        attributes: &RequestAttributes,
        segment: &dyn SessionSegment,
        cookies: &dyn CookieSetter,
        mut response: Response<B>,
    ) -> Result<Response<B>, Error> {
        let user = attributes.require_user()?;

        tracing::info!(cookie = %self.cookie_name, "delete persistent login cookie");
        cookies.set_cookie(
            &self.cookie_name,
            None,
            OffsetDateTime::now_utc() - Duration::hours(1),
        );

        let user_id = user.id();
        tracing::Span::current().record("user.id", display_id(user_id.as_ref()));
        self.deleter
            .delete(user_id.as_ref())
            .await
            .map_err(Error::PersistentLogin)?;
        tracing::info!(user.id = display_id(user_id.as_ref()), "deleted persistent logins");

        segment.clear().await?;
        user.set_id(None);

        *response.status_mut() = self.status;
        Ok(response)
    }
}

impl fmt::Debug for LogoutWorkflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogoutWorkflow")
            .field("cookie_name", &self.cookie_name)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

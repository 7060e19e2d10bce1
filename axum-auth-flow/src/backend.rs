use async_trait::async_trait;
use secrecy::SecretString;
use time::OffsetDateTime;
use tower::BoxError;
use tower_cookies::{Cookie, Cookies};

use crate::UserId;

/// Verifies credentials.
///
/// Returning `Ok(None)` (or an empty [`UserId`]) means the credentials were
/// rejected. `Err` is reserved for the authenticator itself failing, e.g. an
/// unreachable database, and propagates to the caller.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use axum_auth_flow::{Authenticator, UserId};
/// use secrecy::{ExposeSecret, SecretString};
/// use tower::BoxError;
///
/// struct Ferris;
///
/// #[async_trait]
/// impl Authenticator for Ferris {
///     async fn authenticate(
///         &self,
///         username: &str,
///         password: &SecretString,
///     ) -> Result<Option<UserId>, BoxError> {
///         Ok((username == "ferris" && password.expose_secret() == "hunter42")
///             .then(|| UserId::new("1")))
///     }
/// }
/// ```
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Returns the id of the user owning these credentials.
    async fn authenticate(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<Option<UserId>, BoxError>;
}

/// Creates a long-lived ("remember me") login for a user.
///
/// How the grant is stored and how its token reaches the client is up to the
/// implementation.
#[async_trait]
pub trait PersistentLoginCreator: Send + Sync {
    /// Creates a persistent login for `user_id`.
    async fn create(&self, user_id: &UserId) -> Result<(), BoxError>;
}

/// Deletes every persistent login of a user.
#[async_trait]
pub trait PersistentLoginDeleter: Send + Sync {
    /// Deletes the persistent logins of `user_id`.
    ///
    /// `None` is passed when nobody was logged in and must be a no-op.
    async fn delete(&self, user_id: Option<&UserId>) -> Result<(), BoxError>;
}

/// Sets response cookies.
///
/// A cookie is deleted by setting it without a value and with an expiry in
/// the past.
pub trait CookieSetter: Send + Sync {
    /// Sets cookie `name` to `value`, expiring at `expires`.
    fn set_cookie(&self, name: &str, value: Option<&str>, expires: OffsetDateTime);
}

impl CookieSetter for Cookies {
    fn set_cookie(&self, name: &str, value: Option<&str>, expires: OffsetDateTime) {
        let mut cookie = Cookie::new(name.to_owned(), value.unwrap_or_default().to_owned());
        cookie.set_path("/");
        cookie.set_expires(expires);
        self.add(cookie);
    }
}

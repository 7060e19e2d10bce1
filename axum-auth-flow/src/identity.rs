use std::{
    fmt::{self, Debug, Display},
    sync::Arc,
};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Opaque identifier of an authenticated user.
///
/// The crate never interprets the value. An empty identifier is treated like
/// no identifier at all, mirroring how authenticators commonly signal failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a new identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` when the identifier carries no value.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

/// The mutable holder of the current actor's identifier for one request.
///
/// Implementations use interior mutability: the same value is shared between
/// [`AuthUserLayer`](crate::AuthUserLayer) and the handler that logs a user in
/// or out, and both must observe the same state.
///
/// # Examples
///
/// ```rust
/// use axum_auth_flow::{UserId, UserIdentity};
/// use std::sync::Mutex;
///
/// #[derive(Debug, Default)]
/// struct Visitor {
///     id: Mutex<Option<UserId>>,
/// }
///
/// impl UserIdentity for Visitor {
///     fn id(&self) -> Option<UserId> {
///         self.id.lock().ok()?.clone()
///     }
///
///     fn set_id(&self, id: Option<UserId>) {
///         if let Ok(mut slot) = self.id.lock() {
///             *slot = id;
///         }
///     }
/// }
/// ```
pub trait UserIdentity: Debug + Send + Sync {
    /// Returns the identifier, `None` when unauthenticated.
    fn id(&self) -> Option<UserId>;

    /// Replaces the identifier.
    fn set_id(&self, id: Option<UserId>);

    /// Returns `true` when an identifier is present.
    fn is_authenticated(&self) -> bool {
        self.id().is_some_and(|id| !id.is_empty())
    }
}

/// A reference-counted identity as stored in
/// [`RequestAttributes`](crate::RequestAttributes).
pub type SharedIdentity = Arc<dyn UserIdentity>;

/// The default [`UserIdentity`], a lock around an optional [`UserId`].
#[derive(Debug, Default)]
pub struct CurrentUser {
    id: RwLock<Option<UserId>>,
}

impl CurrentUser {
    /// Creates an identity holding `id`.
    pub fn new(id: Option<UserId>) -> Self {
        Self {
            id: RwLock::new(id),
        }
    }

    /// Creates an identity holding `id`, ready to be attached to a request.
    pub fn shared(id: Option<UserId>) -> SharedIdentity {
        Arc::new(Self::new(id))
    }
}

impl UserIdentity for CurrentUser {
    fn id(&self) -> Option<UserId> {
        self.id.read().clone()
    }

    fn set_id(&self, id: Option<UserId>) {
        *self.id.write() = id;
    }
}

// Log-friendly rendering of an optional id.
pub(crate) fn display_id(id: Option<&UserId>) -> &str {
    match id {
        Some(id) if !id.is_empty() => id.as_str(),
        _ => "(none)",
    }
}

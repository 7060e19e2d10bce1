use std::{any::Any, collections::HashMap, fmt, sync::Arc};

use http::Extensions;
use parking_lot::RwLock;

use crate::{Error, SharedIdentity};

/// Name of the attribute holding the request's [`SharedIdentity`].
pub const USER_ATTRIBUTE: &str = "user";

type Attribute = Arc<dyn Any + Send + Sync>;

/// A named, mutable attribute map shared by every stage handling a request.
///
/// [`AuthUserLayer`](crate::AuthUserLayer) inserts one into the request
/// extensions before calling the inner service. Because clones share the same
/// map, whatever a handler stores here is visible to the layer once the
/// response comes back, which is how a handler may replace the `user`
/// attribute with a different identity.
#[derive(Clone, Default)]
pub struct RequestAttributes {
    inner: Arc<RwLock<HashMap<String, Attribute>>>,
}

impl RequestAttributes {
    /// Creates an empty attribute map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the map carried by `extensions`, if any.
    pub fn from_extensions(extensions: &Extensions) -> Option<Self> {
        extensions.get::<Self>().cloned()
    }

    /// Stores `value` under `name`, replacing any previous value.
    pub fn insert<T>(&self, name: impl Into<String>, value: T)
    where
        T: Any + Send + Sync,
    {
        self.inner.write().insert(name.into(), Arc::new(value));
    }

    /// Returns a clone of the value under `name` when it has type `T`.
    pub fn get<T>(&self, name: &str) -> Option<T>
    where
        T: Any + Send + Sync + Clone,
    {
        self.inner.read().get(name)?.downcast_ref::<T>().cloned()
    }

    /// Returns `true` when some value is stored under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().contains_key(name)
    }

    /// Removes the value under `name`, returning whether one was present.
    pub fn remove(&self, name: &str) -> bool {
        self.inner.write().remove(name).is_some()
    }

    /// Stores `identity` as the `user` attribute.
    pub fn set_user(&self, identity: SharedIdentity) {
        self.insert(USER_ATTRIBUTE, identity);
    }

    /// Returns the `user` attribute when it is a [`SharedIdentity`].
    pub fn user(&self) -> Option<SharedIdentity> {
        self.get::<SharedIdentity>(USER_ATTRIBUTE)
    }

    /// Like [`user`](Self::user), but treats absence as a contract violation.
    pub fn require_user(&self) -> Result<SharedIdentity, Error> {
        self.user().ok_or(Error::MissingIdentity(USER_ATTRIBUTE))
    }
}

impl fmt::Debug for RequestAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        let mut names: Vec<_> = inner.keys().collect();
        names.sort();
        f.debug_struct("RequestAttributes")
            .field("names", &names)
            .finish()
    }
}

/// Looks up the `user` identity carried by `extensions`.
pub(crate) fn require_user(extensions: &Extensions) -> Result<SharedIdentity, Error> {
    RequestAttributes::from_extensions(extensions)
        .ok_or(Error::MissingIdentity(USER_ATTRIBUTE))?
        .require_user()
}

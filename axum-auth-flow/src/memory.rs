//! Ephemeral collaborators, useful for testing and demonstration purposes.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use parking_lot::Mutex;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tower::BoxError;

use crate::{
    Authenticator, Error, PersistentLoginCreator, PersistentLoginDeleter, SessionSegment, UserId,
};

/// An [`Authenticator`] over a fixed table of plaintext passwords.
#[derive(Debug, Default)]
pub struct MemoryAuthenticator {
    users: HashMap<String, (SecretString, UserId)>,
}

impl MemoryAuthenticator {
    /// Creates an authenticator knowing no users.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a user, returning the extended authenticator.
    pub fn with_user(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
        user_id: impl Into<UserId>,
    ) -> Self {
        self.users.insert(
            username.into(),
            (SecretString::from(password.into()), user_id.into()),
        );
        self
    }
}

#[async_trait]
impl Authenticator for MemoryAuthenticator {
    async fn authenticate(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<Option<UserId>, BoxError> {
        Ok(self
            .users
            .get(username)
            .filter(|(known, _)| known.expose_secret() == password.expose_secret())
            .map(|(_, user_id)| user_id.clone()))
    }
}

/// Persistent login records kept in memory, counted per user.
#[derive(Clone, Debug, Default)]
pub struct MemoryPersistentLogins {
    logins: Arc<Mutex<HashMap<UserId, usize>>>,
}

impl MemoryPersistentLogins {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of persistent logins held for `user_id`.
    pub fn count(&self, user_id: &UserId) -> usize {
        self.logins.lock().get(user_id).copied().unwrap_or_default()
    }
}

#[async_trait]
impl PersistentLoginCreator for MemoryPersistentLogins {
    async fn create(&self, user_id: &UserId) -> Result<(), BoxError> {
        *self.logins.lock().entry(user_id.clone()).or_default() += 1;
        Ok(())
    }
}

#[async_trait]
impl PersistentLoginDeleter for MemoryPersistentLogins {
    async fn delete(&self, user_id: Option<&UserId>) -> Result<(), BoxError> {
        if let Some(user_id) = user_id {
            self.logins.lock().remove(user_id);
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct SegmentData {
    values: HashMap<String, Value>,
    flashes: HashMap<String, String>,
    renewals: usize,
}

/// A [`SessionSegment`] living in memory only.
#[derive(Clone, Debug, Default)]
pub struct MemorySegment {
    data: Arc<Mutex<SegmentData>>,
}

impl MemorySegment {
    /// Creates an empty segment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the flash message under `key` without consuming it.
    pub fn peek_flash(&self, key: &str) -> Option<String> {
        self.data.lock().flashes.get(key).cloned()
    }

    /// Returns `true` when neither values nor flash messages are stored.
    pub fn is_empty(&self) -> bool {
        let data = self.data.lock();
        data.values.is_empty() && data.flashes.is_empty()
    }

    /// How many times the session id was renewed.
    pub fn renewals(&self) -> usize {
        self.data.lock().renewals
    }
}

#[async_trait]
impl SessionSegment for MemorySegment {
    async fn get(&self, key: &str) -> Result<Option<Value>, Error> {
        Ok(self.data.lock().values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), Error> {
        self.data.lock().values.insert(key.to_owned(), value);
        Ok(())
    }

    async fn set_flash(&self, key: &str, message: &str) -> Result<(), Error> {
        self.data
            .lock()
            .flashes
            .insert(key.to_owned(), message.to_owned());
        Ok(())
    }

    async fn take_flash(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.data.lock().flashes.remove(key))
    }

    async fn clear(&self) -> Result<(), Error> {
        let mut data = self.data.lock();
        data.values.clear();
        data.flashes.clear();
        Ok(())
    }

    async fn renew_id(&self) -> Result<(), Error> {
        self.data.lock().renewals += 1;
        Ok(())
    }
}

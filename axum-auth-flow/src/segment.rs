use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_sessions::Session;

use crate::Error;

/// A named partition of server-side session storage.
///
/// Segments hold plain values plus one-shot flash messages. A flash message
/// is handed out once by [`take_flash`](SessionSegment::take_flash) and is
/// gone afterwards.
#[async_trait]
pub trait SessionSegment: Send + Sync {
    /// Returns the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Value>, Error>;

    /// Stores `value` under `key`.
    async fn set(&self, key: &str, value: Value) -> Result<(), Error>;

    /// Stores a flash message under `key`.
    async fn set_flash(&self, key: &str, message: &str) -> Result<(), Error>;

    /// Returns and forgets the flash message under `key`.
    async fn take_flash(&self, key: &str) -> Result<Option<String>, Error>;

    /// Removes every value and flash message of this segment.
    async fn clear(&self) -> Result<(), Error>;

    /// Issues a new session identifier while keeping the data.
    ///
    /// Called after a successful login to mitigate session fixation. Stores
    /// without the notion of an identifier may keep the default.
    async fn renew_id(&self) -> Result<(), Error> {
        Ok(())
    }
}

/// Everything a segment stores, kept in a single session entry.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Entry {
    #[serde(default)]
    values: HashMap<String, Value>,

    #[serde(default)]
    flash: HashMap<String, String>,
}

/// A [`SessionSegment`] backed by a `tower_sessions::Session`.
///
/// The segment occupies exactly one session entry, named after the segment,
/// holding both its values and its flash messages.
#[derive(Debug, Clone)]
pub struct Segment {
    session: Session,
    name: Arc<str>,
}

impl Segment {
    /// Creates the segment `name` of `session`.
    pub fn new(session: Session, name: impl AsRef<str>) -> Self {
        Self {
            session,
            name: name.as_ref().into(),
        }
    }

    /// The segment's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self) -> Result<Entry, Error> {
        Ok(self.session.get(&self.name).await?.unwrap_or_default())
    }

    async fn store(&self, entry: Entry) -> Result<(), Error> {
        self.session.insert(&self.name, entry).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionSegment for Segment {
    async fn get(&self, key: &str) -> Result<Option<Value>, Error> {
        Ok(self.load().await?.values.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), Error> {
        let mut entry = self.load().await?;
        entry.values.insert(key.to_owned(), value);
        self.store(entry).await
    }

    async fn set_flash(&self, key: &str, message: &str) -> Result<(), Error> {
        let mut entry = self.load().await?;
        entry.flash.insert(key.to_owned(), message.to_owned());
        self.store(entry).await
    }

    async fn take_flash(&self, key: &str) -> Result<Option<String>, Error> {
        let mut entry = self.load().await?;
        let Some(message) = entry.flash.remove(key) else {
            return Ok(None);
        };

        self.store(entry).await?;
        Ok(Some(message))
    }

    async fn clear(&self) -> Result<(), Error> {
        self.session.remove_value(&self.name).await?;
        Ok(())
    }

    async fn renew_id(&self) -> Result<(), Error> {
        self.session.cycle_id().await?;
        Ok(())
    }
}

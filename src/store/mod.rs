//! Document storage for foods and meals, plus user accounts.
//!
//! Records are stored as JSON documents keyed by a store-assigned id. The
//! `creator` and `name` of each document are kept beside the body so that
//! queries can filter by owner and order by name without decoding.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::auth::repo_types::User;
use crate::feed::{Change, ChangeFeed, ChangeKind};

#[cfg(test)]
pub mod memory;
pub mod postgres;

#[cfg(test)]
pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Foods,
    Meals,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Foods => "foods",
            Collection::Meals => "meals",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document not found")]
    NotFound,
    #[error("email already registered")]
    DuplicateEmail,
    #[error("document was modified concurrently")]
    Conflict,
    #[error("malformed document: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// A document as it sits in the store.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub id: Uuid,
    pub collection: Collection,
    pub creator: Uuid,
    pub name: String,
    pub body: serde_json::Value,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Payload for insert and full replace.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub creator: Uuid,
    pub name: String,
    pub body: serde_json::Value,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents of `collection` owned by `creator`, ordered by name.
    async fn query(&self, collection: Collection, creator: Uuid)
        -> Result<Vec<RawDocument>, StoreError>;

    async fn get(&self, collection: Collection, id: Uuid)
        -> Result<Option<RawDocument>, StoreError>;

    /// Stores a new document under a freshly assigned id.
    async fn insert(&self, collection: Collection, doc: NewDocument)
        -> Result<RawDocument, StoreError>;

    /// Replaces the whole document. `NotFound` if `id` does not exist.
    /// With `seen` set, the write only happens while the stored
    /// `updated_at` still equals it, and `Conflict` is returned otherwise.
    async fn replace(
        &self,
        collection: Collection,
        id: Uuid,
        doc: NewDocument,
        seen: Option<OffsetDateTime>,
    ) -> Result<RawDocument, StoreError>;

    /// `NotFound` if `id` does not exist.
    async fn delete(&self, collection: Collection, id: Uuid) -> Result<(), StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    /// `DuplicateEmail` if the email is taken.
    async fn create(
        &self,
        email: &str,
        password_hash: &str,
        profile_picture_url: Option<&str>,
    ) -> Result<User, StoreError>;
}

/// A typed record living in one collection.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: Collection;

    fn creator(&self) -> Uuid;
    fn name(&self) -> &str;
}

/// A record together with its store metadata.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stored<T> {
    pub id: Uuid,
    #[serde(flatten)]
    pub record: T,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl<T: Record> Stored<T> {
    fn decode(raw: RawDocument) -> Result<Self, StoreError> {
        Ok(Self {
            id: raw.id,
            record: serde_json::from_value(raw.body)?,
            created_at: raw.created_at,
            updated_at: raw.updated_at,
        })
    }
}

fn encode<T: Record>(record: &T) -> Result<NewDocument, StoreError> {
    Ok(NewDocument {
        creator: record.creator(),
        name: record.name().to_string(),
        body: serde_json::to_value(record)?,
    })
}

/// Typed access to the document store. Every successful write is published
/// on the change feed.
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn DocumentStore>,
    feed: ChangeFeed,
}

impl Repository {
    pub fn new(store: Arc<dyn DocumentStore>, feed: ChangeFeed) -> Self {
        Self { store, feed }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Change> {
        self.feed.subscribe()
    }

    pub async fn list<T: Record>(&self, creator: Uuid) -> Result<Vec<Stored<T>>, StoreError> {
        self.store
            .query(T::COLLECTION, creator)
            .await?
            .into_iter()
            .map(Stored::decode)
            .collect()
    }

    pub async fn find<T: Record>(&self, id: Uuid) -> Result<Option<Stored<T>>, StoreError> {
        self.store
            .get(T::COLLECTION, id)
            .await?
            .map(Stored::decode)
            .transpose()
    }

    /// Like [`Repository::find`], but documents owned by someone else are
    /// reported as `NotFound`.
    pub async fn find_owned<T: Record>(
        &self,
        id: Uuid,
        creator: Uuid,
    ) -> Result<Stored<T>, StoreError> {
        match self.store.get(T::COLLECTION, id).await? {
            Some(raw) if raw.creator == creator => Stored::decode(raw),
            _ => Err(StoreError::NotFound),
        }
    }

    pub async fn create<T: Record>(&self, record: T) -> Result<Stored<T>, StoreError> {
        let raw = self.store.insert(T::COLLECTION, encode(&record)?).await?;
        self.publish(T::COLLECTION, raw.creator, raw.id, ChangeKind::Created);
        Stored::decode(raw)
    }

    pub async fn replace<T: Record>(&self, id: Uuid, record: T) -> Result<Stored<T>, StoreError> {
        self.write(id, record, None).await
    }

    /// Writes back a record read as of `seen` (its `updated_at`). Fails with
    /// `Conflict` if someone else wrote it in between.
    pub async fn update<T: Record>(
        &self,
        id: Uuid,
        seen: OffsetDateTime,
        record: T,
    ) -> Result<Stored<T>, StoreError> {
        self.write(id, record, Some(seen)).await
    }

    async fn write<T: Record>(
        &self,
        id: Uuid,
        record: T,
        seen: Option<OffsetDateTime>,
    ) -> Result<Stored<T>, StoreError> {
        let raw = self
            .store
            .replace(T::COLLECTION, id, encode(&record)?, seen)
            .await?;
        self.publish(T::COLLECTION, raw.creator, raw.id, ChangeKind::Updated);
        Stored::decode(raw)
    }

    pub async fn delete_owned<T: Record>(&self, id: Uuid, creator: Uuid) -> Result<(), StoreError> {
        let existing = self.find_owned::<T>(id, creator).await?;
        self.store.delete(T::COLLECTION, existing.id).await?;
        self.publish(T::COLLECTION, creator, id, ChangeKind::Deleted);
        Ok(())
    }

    fn publish(&self, collection: Collection, creator: Uuid, id: Uuid, kind: ChangeKind) {
        self.feed.publish(Change {
            collection,
            creator,
            id,
            kind,
        });
    }
}

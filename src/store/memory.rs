use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Collection, DocumentStore, NewDocument, RawDocument, StoreError, UserStore};
use crate::auth::repo_types::User;

/// In-process store backing the test suite. Names sort by byte order, the
/// same as the `COLLATE "C"` ordering of the Postgres store.
#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<Uuid, RawDocument>>,
    users: RwLock<HashMap<Uuid, User>>,
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn query(
        &self,
        collection: Collection,
        creator: Uuid,
    ) -> Result<Vec<RawDocument>, StoreError> {
        let documents = self.documents.read().await;
        let mut found: Vec<RawDocument> = documents
            .values()
            .filter(|d| d.collection == collection && d.creator == creator)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(found)
    }

    async fn get(&self, collection: Collection, id: Uuid) -> Result<Option<RawDocument>, StoreError> {
        let documents = self.documents.read().await;
        Ok(documents
            .get(&id)
            .filter(|d| d.collection == collection)
            .cloned())
    }

    async fn insert(
        &self,
        collection: Collection,
        doc: NewDocument,
    ) -> Result<RawDocument, StoreError> {
        let now = OffsetDateTime::now_utc();
        let raw = RawDocument {
            id: Uuid::new_v4(),
            collection,
            creator: doc.creator,
            name: doc.name,
            body: doc.body,
            created_at: now,
            updated_at: now,
        };
        self.documents.write().await.insert(raw.id, raw.clone());
        Ok(raw)
    }

    async fn replace(
        &self,
        collection: Collection,
        id: Uuid,
        doc: NewDocument,
        seen: Option<OffsetDateTime>,
    ) -> Result<RawDocument, StoreError> {
        let mut documents = self.documents.write().await;
        let existing = documents
            .get_mut(&id)
            .filter(|d| d.collection == collection)
            .ok_or(StoreError::NotFound)?;
        if seen.is_some_and(|seen| seen != existing.updated_at) {
            return Err(StoreError::Conflict);
        }
        existing.creator = doc.creator;
        existing.name = doc.name;
        existing.body = doc.body;
        // A write in the same clock tick must still move the version.
        let now = OffsetDateTime::now_utc();
        existing.updated_at = if now > existing.updated_at {
            now
        } else {
            existing.updated_at + time::Duration::nanoseconds(1)
        };
        Ok(existing.clone())
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<(), StoreError> {
        let mut documents = self.documents.write().await;
        match documents.get(&id) {
            Some(d) if d.collection == collection => {
                documents.remove(&id);
                Ok(())
            }
            _ => Err(StoreError::NotFound),
        }
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn create(
        &self,
        email: &str,
        password_hash: &str,
        profile_picture_url: Option<&str>,
    ) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == email) {
            return Err(StoreError::DuplicateEmail);
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            profile_picture_url: profile_picture_url.map(str::to_string),
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(creator: Uuid, name: &str) -> NewDocument {
        NewDocument {
            creator,
            name: name.into(),
            body: json!({ "name": name }),
        }
    }

    #[tokio::test]
    async fn collections_do_not_leak_into_each_other() {
        let store = MemoryStore::default();
        let owner = Uuid::new_v4();
        let food = store.insert(Collection::Foods, doc(owner, "pasta")).await.unwrap();

        assert!(store.get(Collection::Meals, food.id).await.unwrap().is_none());
        assert!(store.query(Collection::Meals, owner).await.unwrap().is_empty());
        assert!(matches!(
            store.delete(Collection::Meals, food.id).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn replace_swaps_the_whole_body() {
        let store = MemoryStore::default();
        let owner = Uuid::new_v4();
        let created = store.insert(Collection::Foods, doc(owner, "a")).await.unwrap();

        let replaced = store
            .replace(Collection::Foods, created.id, doc(owner, "b"), None)
            .await
            .unwrap();
        assert_eq!(replaced.id, created.id);
        assert_eq!(replaced.name, "b");
        assert_eq!(replaced.body, json!({ "name": "b" }));
        assert_eq!(replaced.created_at, created.created_at);
    }

    #[tokio::test]
    async fn replace_and_delete_of_missing_ids_fail() {
        let store = MemoryStore::default();
        let id = Uuid::new_v4();
        assert!(matches!(
            store.replace(Collection::Foods, id, doc(Uuid::new_v4(), "x"), None).await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.delete(Collection::Foods, id).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn names_sort_by_byte_order() {
        let store = MemoryStore::default();
        let owner = Uuid::new_v4();
        for name in ["apple", "Zucchini", "Banana"] {
            store.insert(Collection::Foods, doc(owner, name)).await.unwrap();
        }
        let names: Vec<String> = store
            .query(Collection::Foods, owner)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["Banana", "Zucchini", "apple"]);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryStore::default();
        let first = store.create("a@b.co", "hash", None).await.unwrap();
        assert!(matches!(
            store.create("a@b.co", "other", None).await,
            Err(StoreError::DuplicateEmail)
        ));
        let found = store.find_by_email("a@b.co").await.unwrap().unwrap();
        assert_eq!(found.id, first.id);
        assert!(store.find_by_id(first.id).await.unwrap().is_some());
    }
}

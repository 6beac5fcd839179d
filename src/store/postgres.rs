use async_trait::async_trait;
use sqlx::{types::Json, FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{Collection, DocumentStore, NewDocument, RawDocument, StoreError, UserStore};
use crate::auth::repo_types::User;

/// Postgres-backed store. Documents live in a single `documents` table keyed
/// by id, with the collection name as a column.
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &PgPool {
        &self.db
    }
}

#[derive(Debug, FromRow)]
struct DocumentRow {
    id: Uuid,
    creator: Uuid,
    name: String,
    body: Json<serde_json::Value>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl DocumentRow {
    fn into_raw(self, collection: Collection) -> RawDocument {
        RawDocument {
            id: self.id,
            collection,
            creator: self.creator,
            name: self.name,
            body: self.body.0,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn query(
        &self,
        collection: Collection,
        creator: Uuid,
    ) -> Result<Vec<RawDocument>, StoreError> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, creator, name, body, created_at, updated_at
            FROM documents
            WHERE collection = $1 AND creator = $2
            ORDER BY name COLLATE "C" ASC, id ASC
            "#,
        )
        .bind(collection.as_str())
        .bind(creator)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(|r| r.into_raw(collection)).collect())
    }

    async fn get(&self, collection: Collection, id: Uuid) -> Result<Option<RawDocument>, StoreError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, creator, name, body, created_at, updated_at
            FROM documents
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection.as_str())
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(|r| r.into_raw(collection)))
    }

    async fn insert(
        &self,
        collection: Collection,
        doc: NewDocument,
    ) -> Result<RawDocument, StoreError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            INSERT INTO documents (id, collection, creator, name, body)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, creator, name, body, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(collection.as_str())
        .bind(doc.creator)
        .bind(doc.name)
        .bind(Json(doc.body))
        .fetch_one(&self.db)
        .await?;
        Ok(row.into_raw(collection))
    }

    async fn replace(
        &self,
        collection: Collection,
        id: Uuid,
        doc: NewDocument,
        seen: Option<OffsetDateTime>,
    ) -> Result<RawDocument, StoreError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            UPDATE documents
               SET creator = $3, name = $4, body = $5,
                   updated_at = greatest(now(), updated_at + interval '1 microsecond')
             WHERE collection = $1 AND id = $2
               AND ($6::timestamptz IS NULL OR updated_at = $6)
            RETURNING id, creator, name, body, created_at, updated_at
            "#,
        )
        .bind(collection.as_str())
        .bind(id)
        .bind(doc.creator)
        .bind(doc.name)
        .bind(Json(doc.body))
        .bind(seen)
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(row) => Ok(row.into_raw(collection)),
            None if seen.is_some() && self.get(collection, id).await?.is_some() => {
                Err(StoreError::Conflict)
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection.as_str())
            .bind(id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, profile_picture_url, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, profile_picture_url, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(
        &self,
        email: &str,
        password_hash: &str,
        profile_picture_url: Option<&str>,
    ) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, profile_picture_url)
            VALUES ($1, $2, $3)
            RETURNING id, email, password_hash, profile_picture_url, created_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(profile_picture_url)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                StoreError::DuplicateEmail
            }
            other => StoreError::Database(other),
        })
    }
}

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,                             // unique user ID, stamped as `creator` on records
    pub email: String,                        // login email, lowercased
    #[serde(skip_serializing)]
    pub password_hash: String,                // Argon2 hash, not exposed in JSON
    pub profile_picture_url: Option<String>,  // avatar shown by clients
    pub created_at: OffsetDateTime,           // creation timestamp
}

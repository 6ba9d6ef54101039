use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "password_strength", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StrengthStatus {
    VeryWeak,
    Weak,
    Average,
    Strong,
    VeryStrong,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: Option<String>,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub password_score: i32,
    pub password_strength: StrengthStatus,
    pub wallet_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

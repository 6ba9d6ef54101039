use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Concert {
    pub id: Uuid,
    pub artist_id: Uuid,
    pub title: String,
    pub date: DateTime<Utc>,
    pub address: String,
    pub capacity: i32,
    pub genre: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub created_at: DateTime<Utc>,
}

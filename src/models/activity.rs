use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Habit type whose entries feed weight progress.
pub const WEIGHT_HABIT: &str = "weight";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Workout {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: DateTime<Utc>,
    pub duration_minutes: Option<i32>,
    pub name: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Meal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: DateTime<Utc>,
    pub name: Option<String>,
    pub calories: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Habit {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub habit_type: String,
    pub value: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    #[serde(rename = "type")]
    pub habit_type: Option<String>,
}

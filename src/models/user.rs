use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::services::body::{bmi, Bmi};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub identity_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub sex: Option<String>,
    pub age: Option<i32>,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub issues: Option<String>,
    pub motive: Option<String>,
    pub goal: Option<String>,
    pub diet: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// True once the user has filled in any of the core profile fields.
    pub fn has_profile(&self) -> bool {
        self.name.as_deref().is_some_and(|n| !n.is_empty())
            || self.age.is_some()
            || self.weight_kg.is_some()
            || self.height_cm.is_some()
    }
}

#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: Option<String>,
    pub name: Option<String>,
    pub sex: Option<String>,
    pub age: Option<i32>,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub issues: Option<String>,
    pub motive: Option<String>,
    pub goal: Option<String>,
    pub diet: Option<String>,
    pub image_url: Option<String>,
    pub bmi: Option<Bmi>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(u: User) -> Self {
        let bmi = bmi(u.weight_kg, u.height_cm);
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            sex: u.sex,
            age: u.age,
            weight_kg: u.weight_kg,
            height_cm: u.height_cm,
            issues: u.issues,
            motive: u.motive,
            goal: u.goal,
            diet: u.diet,
            image_url: u.image_url,
            bmi,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

/// Profile upsert result. The regeneration flags tell the client that stored
/// plans were built from the previous profile.
#[derive(Debug, Serialize)]
pub struct ProfileUpdateResponse {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub should_regenerate_meals: bool,
    pub should_regenerate_workouts: bool,
}

#[cfg(test)]
pub(crate) fn sample_user() -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        identity_id: "user_2abc".into(),
        email: Some("sam@example.com".into()),
        name: None,
        sex: None,
        age: None,
        weight_kg: None,
        height_cm: None,
        issues: None,
        motive: None,
        goal: None,
        diet: None,
        image_url: None,
        created_at: now,
        updated_at: now,
    }
}

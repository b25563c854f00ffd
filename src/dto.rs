//! # FitCoach: Request/Response DTOs
//!
//! Conventions:
//! - `*Request`  → deserialized from client JSON body
//! - `*Response` → serialized to client JSON
//! - Field validation is expressed via `validator` derive macros; handlers
//!   call `.validate()?` before touching the database

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

// ============================================================================
// Common
// ============================================================================

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
    pub id: Uuid,
}

// ============================================================================
// Profile
// ============================================================================

/// PUT /api/profile: full replacement of the profile fields.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpsertProfileRequest {
    #[validate(length(max = 100, message = "Name must be under 100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 32))]
    pub sex: Option<String>,
    #[validate(range(min = 1, max = 120, message = "Age must be 1-120"))]
    pub age: Option<i32>,
    #[validate(range(min = 1.0, max = 500.0, message = "Weight must be 1-500 kg"))]
    pub weight_kg: Option<f64>,
    #[validate(range(min = 30.0, max = 300.0, message = "Height must be 30-300 cm"))]
    pub height_cm: Option<f64>,
    #[validate(length(max = 2000))]
    pub issues: Option<String>,
    #[validate(length(max = 2000))]
    pub motive: Option<String>,
    #[validate(length(max = 2000))]
    pub goal: Option<String>,
    #[validate(length(max = 2000))]
    pub diet: Option<String>,
    #[validate(url(message = "Image URL must be a valid URL"))]
    pub image_url: Option<String>,
}

impl UpsertProfileRequest {
    /// Blank strings are stored as NULL.
    pub fn normalized(self) -> Self {
        fn clean(v: Option<String>) -> Option<String> {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        }
        Self {
            name: clean(self.name),
            sex: clean(self.sex),
            issues: clean(self.issues),
            motive: clean(self.motive),
            goal: clean(self.goal),
            diet: clean(self.diet),
            image_url: clean(self.image_url),
            ..self
        }
    }
}

// ============================================================================
// Activity logs
// ============================================================================

/// POST /api/workouts
#[derive(Debug, Deserialize, Validate)]
pub struct CreateWorkoutRequest {
    pub date: Option<DateTime<Utc>>,
    #[validate(range(min = 0, max = 1440, message = "Duration must be 0-1440 minutes"))]
    pub duration_minutes: Option<i32>,
    #[validate(length(max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// POST /api/meals
#[derive(Debug, Deserialize, Validate)]
pub struct CreateMealRequest {
    pub date: Option<DateTime<Utc>>,
    #[validate(length(max = 200))]
    pub name: Option<String>,
    #[validate(range(min = 0, max = 20000, message = "Calories must be 0-20000"))]
    pub calories: Option<i32>,
}

/// POST /api/habits
#[derive(Debug, Deserialize, Validate)]
pub struct CreateHabitRequest {
    pub date: Option<DateTime<Utc>>,
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 50, message = "Habit type must be 1-50 characters"))]
    pub habit_type: String,
    pub value: f64,
}

// ============================================================================
// Plans
// ============================================================================

/// PUT /api/plans/:kind
#[derive(Debug, Deserialize, Validate)]
pub struct SavePlanRequest {
    #[validate(length(min = 1, max = 100000, message = "Plan text is required"))]
    pub plan: String,
    pub generated_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Chat
// ============================================================================

/// POST /api/chat
#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    pub conversation_id: Option<Uuid>,
    #[serde(default)]
    #[validate(length(max = 4000, message = "Message must be under 4000 characters"))]
    pub message: String,
}

// ============================================================================
// Contact
// ============================================================================

/// POST /api/contact
#[derive(Debug, Deserialize, Validate)]
pub struct ContactRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 10, max = 5000, message = "Message must be at least 10 characters long"))]
    pub message: String,
}

impl ContactRequest {
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            message: self.message.trim().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub success: bool,
    pub message: String,
    pub contact_id: Uuid,
}

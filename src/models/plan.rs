use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::services::ai::GenerationSource;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "plan_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PlanKind {
    Meal,
    Workout,
}

impl fmt::Display for PlanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanKind::Meal => f.write_str("meal"),
            PlanKind::Workout => f.write_str("workout"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GeneratedPlan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: PlanKind,
    pub plan: String,
    pub generated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct GeneratePlanResponse {
    pub kind: PlanKind,
    pub plan: String,
    pub source: GenerationSource,
    /// The stored plan; absent when generation fell back.
    pub saved: Option<GeneratedPlan>,
}

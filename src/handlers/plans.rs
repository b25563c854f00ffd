use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::dto::SavePlanRequest;
use crate::error::{AppError, AppResult};
use crate::handlers::profile::{ensure_user, find_user};
use crate::models::plan::{GeneratePlanResponse, GeneratedPlan, PlanKind};
use crate::services::ai::{generate_or_fallback, GenerationSource};
use crate::services::prompts::{describe_profile, plan_prompt};
use crate::AppState;

fn fallback_text(kind: PlanKind) -> String {
    format!("Sorry, we couldn't generate your {kind} plan right now. Please try again later.")
}

async fn upsert_plan(
    db: &PgPool,
    user_id: Uuid,
    kind: PlanKind,
    plan: &str,
    generated_at: DateTime<Utc>,
) -> AppResult<GeneratedPlan> {
    let saved = sqlx::query_as::<_, GeneratedPlan>(
        r#"
        INSERT INTO generated_plans (id, user_id, kind, plan, generated_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (user_id, kind) DO UPDATE SET
            plan = EXCLUDED.plan,
            generated_at = EXCLUDED.generated_at,
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(kind)
    .bind(plan)
    .bind(generated_at)
    .fetch_one(db)
    .await?;
    Ok(saved)
}

pub async fn get_plan(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(kind): Path<PlanKind>,
) -> AppResult<Json<Option<GeneratedPlan>>> {
    let user = find_user(&state.db, &auth_user.identity_id).await?;

    let plan = sqlx::query_as::<_, GeneratedPlan>(
        "SELECT * FROM generated_plans WHERE user_id = $1 AND kind = $2",
    )
    .bind(user.id)
    .bind(kind)
    .fetch_optional(&state.db)
    .await?;

    Ok(Json(plan))
}

pub async fn save_plan(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(kind): Path<PlanKind>,
    Json(body): Json<SavePlanRequest>,
) -> AppResult<Json<GeneratedPlan>> {
    body.validate()?;
    let user = ensure_user(&state.db, &auth_user).await?;

    let saved = upsert_plan(
        &state.db,
        user.id,
        kind,
        &body.plan,
        body.generated_at.unwrap_or_else(Utc::now),
    )
    .await?;

    tracing::info!(user_id = %user.id, %kind, plan_len = body.plan.len(), "Plan saved");
    Ok(Json(saved))
}

/// Generate a plan from the caller's profile and store it. A failed
/// generation returns the fallback text and leaves any stored plan untouched.
pub async fn generate_plan(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(kind): Path<PlanKind>,
) -> AppResult<Json<GeneratePlanResponse>> {
    let user = find_user(&state.db, &auth_user.identity_id).await?;
    if user.name.as_deref().map_or(true, str::is_empty) {
        return Err(AppError::Validation(format!(
            "Complete your profile before generating a {kind} plan"
        )));
    }

    let prompt = plan_prompt(kind, &describe_profile(&user));
    let generated = generate_or_fallback(state.ai.as_ref(), &prompt, &fallback_text(kind)).await;

    let saved = match generated.source {
        GenerationSource::Gemini => {
            Some(upsert_plan(&state.db, user.id, kind, &generated.text, Utc::now()).await?)
        }
        GenerationSource::Fallback => None,
    };

    tracing::info!(
        user_id = %user.id,
        %kind,
        source = ?generated.source,
        "Plan generation finished"
    );

    Ok(Json(GeneratePlanResponse {
        kind,
        plan: generated.text,
        source: generated.source,
        saved,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_text_names_kind() {
        assert_eq!(
            fallback_text(PlanKind::Workout),
            "Sorry, we couldn't generate your workout plan right now. Please try again later."
        );
    }

    #[test]
    fn test_generate_response_shape() {
        let resp = GeneratePlanResponse {
            kind: PlanKind::Meal,
            plan: fallback_text(PlanKind::Meal),
            source: GenerationSource::Fallback,
            saved: None,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["kind"], "meal");
        assert_eq!(json["source"], "fallback");
        assert!(json["saved"].is_null());
    }
}

use axum::{extract::State, Extension, Json};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::dto::UpsertProfileRequest;
use crate::error::{AppError, AppResult};
use crate::models::plan::PlanKind;
use crate::models::user::{ProfileUpdateResponse, User, UserProfile};
use crate::AppState;

/// Name given to users created implicitly by a write before they filled in
/// their profile.
const DEFAULT_USER_NAME: &str = "User";

/// Creates the user row on first sight. An existing row is only touched when
/// the identity provider reports a different email.
const ENSURE_USER_SQL: &str = r#"
    INSERT INTO users (id, identity_id, email, name)
    VALUES ($1, $2, $3, $4)
    ON CONFLICT (identity_id) DO UPDATE SET
        email = EXCLUDED.email,
        updated_at = NOW()
    WHERE EXCLUDED.email IS NOT NULL
      AND users.email IS DISTINCT FROM EXCLUDED.email
    RETURNING *
"#;

pub async fn find_user_optional(db: &PgPool, identity_id: &str) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE identity_id = $1")
        .bind(identity_id)
        .fetch_optional(db)
        .await?;
    Ok(user)
}

pub async fn find_user(db: &PgPool, identity_id: &str) -> AppResult<User> {
    find_user_optional(db, identity_id)
        .await?
        .ok_or(AppError::NotFound("User not found".into()))
}

/// Fetch the caller's user row, creating a placeholder one if this identity
/// has never been seen.
pub async fn ensure_user(db: &PgPool, auth_user: &AuthUser) -> AppResult<User> {
    let inserted = sqlx::query_as::<_, User>(ENSURE_USER_SQL)
        .bind(Uuid::new_v4())
        .bind(&auth_user.identity_id)
        .bind(&auth_user.email)
        .bind(DEFAULT_USER_NAME)
        .fetch_optional(db)
        .await?;

    // No row comes back when the user exists and the email is unchanged.
    match inserted {
        Some(user) => Ok(user),
        None => find_user(db, &auth_user.identity_id).await,
    }
}

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<UserProfile>> {
    let user = find_user(&state.db, &auth_user.identity_id).await?;
    Ok(Json(user.into()))
}

pub async fn upsert_profile(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<UpsertProfileRequest>,
) -> AppResult<Json<ProfileUpdateResponse>> {
    let body = body.normalized();
    body.validate()?;

    let is_update = find_user_optional(&state.db, &auth_user.identity_id)
        .await?
        .is_some_and(|u| u.has_profile());

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, identity_id, email, name, sex, age, weight_kg, height_cm,
                           issues, motive, goal, diet, image_url)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        ON CONFLICT (identity_id) DO UPDATE SET
            email = COALESCE(EXCLUDED.email, users.email),
            name = EXCLUDED.name,
            sex = EXCLUDED.sex,
            age = EXCLUDED.age,
            weight_kg = EXCLUDED.weight_kg,
            height_cm = EXCLUDED.height_cm,
            issues = EXCLUDED.issues,
            motive = EXCLUDED.motive,
            goal = EXCLUDED.goal,
            diet = EXCLUDED.diet,
            image_url = EXCLUDED.image_url,
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&auth_user.identity_id)
    .bind(&auth_user.email)
    .bind(&body.name)
    .bind(&body.sex)
    .bind(body.age)
    .bind(body.weight_kg)
    .bind(body.height_cm)
    .bind(&body.issues)
    .bind(&body.motive)
    .bind(&body.goal)
    .bind(&body.diet)
    .bind(&body.image_url)
    .fetch_one(&state.db)
    .await?;

    let (should_regenerate_meals, should_regenerate_workouts) = if is_update {
        let kinds = sqlx::query_scalar::<_, PlanKind>(
            "SELECT kind FROM generated_plans WHERE user_id = $1",
        )
        .bind(user.id)
        .fetch_all(&state.db)
        .await?;
        (
            kinds.contains(&PlanKind::Meal),
            kinds.contains(&PlanKind::Workout),
        )
    } else {
        (false, false)
    };

    tracing::info!(
        user_id = %user.id,
        is_update,
        should_regenerate_meals,
        should_regenerate_workouts,
        "Profile saved"
    );

    Ok(Json(ProfileUpdateResponse {
        profile: user.into(),
        should_regenerate_meals,
        should_regenerate_workouts,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_user_only_touches_row_on_email_change() {
        let sql = ENSURE_USER_SQL.split_whitespace().collect::<Vec<_>>().join(" ");
        let (_, conflict) = sql.split_once("ON CONFLICT (identity_id) DO UPDATE").unwrap();
        let (set, guard) = conflict.split_once(" WHERE ").unwrap();
        assert!(set.contains("updated_at = NOW()"));
        assert!(guard.contains("users.email IS DISTINCT FROM EXCLUDED.email"));
        assert!(guard.contains("EXCLUDED.email IS NOT NULL"));
        assert!(guard.trim_end().ends_with("RETURNING *"));
    }
}

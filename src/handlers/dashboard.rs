use axum::{extract::State, Extension, Json};
use chrono::Utc;

use crate::auth::middleware::AuthUser;
use crate::error::AppResult;
use crate::handlers::profile::find_user;
use crate::models::activity::{Habit, Meal, Workout, WEIGHT_HABIT};
use crate::services::stats::{compute_dashboard_stats, DashboardStats};
use crate::AppState;

pub async fn get_dashboard(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<DashboardStats>> {
    let user = find_user(&state.db, &auth_user.identity_id).await?;

    let workouts = sqlx::query_as::<_, Workout>(
        "SELECT * FROM workouts WHERE user_id = $1 ORDER BY date DESC",
    )
    .bind(user.id)
    .fetch_all(&state.db)
    .await?;

    let meals = sqlx::query_as::<_, Meal>("SELECT * FROM meals WHERE user_id = $1")
        .bind(user.id)
        .fetch_all(&state.db)
        .await?;

    let weight_habits = sqlx::query_as::<_, Habit>(
        "SELECT * FROM habits WHERE user_id = $1 AND habit_type = $2 ORDER BY date ASC",
    )
    .bind(user.id)
    .bind(WEIGHT_HABIT)
    .fetch_all(&state.db)
    .await?;

    let stats = compute_dashboard_stats(&workouts, &meals, &weight_habits, Utc::now());
    tracing::debug!(
        user_id = %user.id,
        workouts = workouts.len(),
        meals = meals.len(),
        weight_entries = weight_habits.len(),
        "Dashboard stats computed"
    );

    Ok(Json(stats))
}

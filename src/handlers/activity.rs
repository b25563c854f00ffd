use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::dto::{CreateHabitRequest, CreateMealRequest, CreateWorkoutRequest, DeleteResponse};
use crate::error::{AppError, AppResult};
use crate::handlers::profile::{ensure_user, find_user_optional};
use crate::models::activity::{ActivityQuery, Habit, Meal, Workout};
use crate::AppState;

const DEFAULT_LOOKBACK_DAYS: i64 = 30;

fn resolve_range(query: &ActivityQuery) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
    let end = query.end.unwrap_or_else(Utc::now);
    let start = query
        .start
        .unwrap_or_else(|| end - Duration::days(DEFAULT_LOOKBACK_DAYS));
    if start > end {
        return Err(AppError::Validation("start must not be after end".into()));
    }
    Ok((start, end))
}

// ── Workouts ─────────────────────────────────────────────────────────────

pub async fn create_workout(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CreateWorkoutRequest>,
) -> AppResult<Json<Workout>> {
    body.validate()?;
    let user = ensure_user(&state.db, &auth_user).await?;

    let workout = sqlx::query_as::<_, Workout>(
        r#"
        INSERT INTO workouts (id, user_id, date, duration_minutes, name, notes)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.id)
    .bind(body.date.unwrap_or_else(Utc::now))
    .bind(body.duration_minutes)
    .bind(&body.name)
    .bind(&body.notes)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(workout))
}

pub async fn list_workouts(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<ActivityQuery>,
) -> AppResult<Json<Vec<Workout>>> {
    let (start, end) = resolve_range(&query)?;
    let Some(user) = find_user_optional(&state.db, &auth_user.identity_id).await? else {
        return Ok(Json(Vec::new()));
    };

    let workouts = sqlx::query_as::<_, Workout>(
        r#"
        SELECT * FROM workouts
        WHERE user_id = $1 AND date BETWEEN $2 AND $3
        ORDER BY date DESC
        "#,
    )
    .bind(user.id)
    .bind(start)
    .bind(end)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(workouts))
}

pub async fn delete_workout(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(workout_id): Path<Uuid>,
) -> AppResult<Json<DeleteResponse>> {
    let result = sqlx::query(
        r#"
        DELETE FROM workouts w USING users u
        WHERE w.id = $1 AND w.user_id = u.id AND u.identity_id = $2
        "#,
    )
    .bind(workout_id)
    .bind(&auth_user.identity_id)
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Workout not found".into()));
    }

    Ok(Json(DeleteResponse {
        deleted: true,
        id: workout_id,
    }))
}

// ── Meals ────────────────────────────────────────────────────────────────

pub async fn create_meal(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CreateMealRequest>,
) -> AppResult<Json<Meal>> {
    body.validate()?;
    let user = ensure_user(&state.db, &auth_user).await?;

    let meal = sqlx::query_as::<_, Meal>(
        r#"
        INSERT INTO meals (id, user_id, date, name, calories)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.id)
    .bind(body.date.unwrap_or_else(Utc::now))
    .bind(&body.name)
    .bind(body.calories)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(meal))
}

pub async fn list_meals(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<ActivityQuery>,
) -> AppResult<Json<Vec<Meal>>> {
    let (start, end) = resolve_range(&query)?;
    let Some(user) = find_user_optional(&state.db, &auth_user.identity_id).await? else {
        return Ok(Json(Vec::new()));
    };

    let meals = sqlx::query_as::<_, Meal>(
        r#"
        SELECT * FROM meals
        WHERE user_id = $1 AND date BETWEEN $2 AND $3
        ORDER BY date DESC
        "#,
    )
    .bind(user.id)
    .bind(start)
    .bind(end)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(meals))
}

pub async fn delete_meal(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(meal_id): Path<Uuid>,
) -> AppResult<Json<DeleteResponse>> {
    let result = sqlx::query(
        r#"
        DELETE FROM meals m USING users u
        WHERE m.id = $1 AND m.user_id = u.id AND u.identity_id = $2
        "#,
    )
    .bind(meal_id)
    .bind(&auth_user.identity_id)
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Meal not found".into()));
    }

    Ok(Json(DeleteResponse {
        deleted: true,
        id: meal_id,
    }))
}

// ── Habits ───────────────────────────────────────────────────────────────

pub async fn create_habit(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CreateHabitRequest>,
) -> AppResult<Json<Habit>> {
    body.validate()?;
    let habit_type = body.habit_type.trim().to_lowercase();
    if habit_type.is_empty() {
        return Err(AppError::Validation("Habit type is required".into()));
    }
    if !body.value.is_finite() {
        return Err(AppError::Validation("Habit value must be a number".into()));
    }

    let user = ensure_user(&state.db, &auth_user).await?;

    let habit = sqlx::query_as::<_, Habit>(
        r#"
        INSERT INTO habits (id, user_id, date, habit_type, value)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.id)
    .bind(body.date.unwrap_or_else(Utc::now))
    .bind(&habit_type)
    .bind(body.value)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(habit))
}

pub async fn list_habits(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<ActivityQuery>,
) -> AppResult<Json<Vec<Habit>>> {
    let (start, end) = resolve_range(&query)?;
    let Some(user) = find_user_optional(&state.db, &auth_user.identity_id).await? else {
        return Ok(Json(Vec::new()));
    };
    let habit_type = query.habit_type.as_deref().map(|t| t.trim().to_lowercase());

    let habits = sqlx::query_as::<_, Habit>(
        r#"
        SELECT * FROM habits
        WHERE user_id = $1 AND date BETWEEN $2 AND $3
          AND ($4::text IS NULL OR habit_type = $4)
        ORDER BY date ASC
        "#,
    )
    .bind(user.id)
    .bind(start)
    .bind(end)
    .bind(habit_type)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(habits))
}

pub async fn delete_habit(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(habit_id): Path<Uuid>,
) -> AppResult<Json<DeleteResponse>> {
    let result = sqlx::query(
        r#"
        DELETE FROM habits h USING users u
        WHERE h.id = $1 AND h.user_id = u.id AND u.identity_id = $2
        "#,
    )
    .bind(habit_id)
    .bind(&auth_user.identity_id)
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Habit not found".into()));
    }

    Ok(Json(DeleteResponse {
        deleted: true,
        id: habit_id,
    }))
}

//! Dashboard statistics derived from a user's activity logs.
//!
//! Everything here is a pure function of its inputs. The caller fetches the
//! records and passes the current time in, so results are reproducible.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::activity::{Habit, Meal, Workout, WEIGHT_HABIT};

/// Estimated calories burned per minute of any workout.
pub const CALORIES_PER_MINUTE: i64 = 5;

/// Meals a day needs for it to count as an adherent day.
pub const MEALS_PER_ADHERENT_DAY: usize = 3;

const WEEK_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub workout_streak: u32,
    /// Percentage of logged days with at least three meals, 0-100.
    pub meal_adherence: u32,
    pub calories_burned: i64,
    /// Latest weight minus earliest weight. Negative means weight was lost.
    pub weight_progress: f64,
    pub weekly_workouts: usize,
    pub weekly_meals: usize,
}

pub fn compute_dashboard_stats(
    workouts: &[Workout],
    meals: &[Meal],
    habits: &[Habit],
    now: DateTime<Utc>,
) -> DashboardStats {
    let week_ago = now - Duration::days(WEEK_DAYS);

    DashboardStats {
        workout_streak: workout_streak(workouts),
        meal_adherence: meal_adherence(meals),
        calories_burned: calories_burned(workouts),
        weight_progress: weight_progress(habits),
        weekly_workouts: workouts.iter().filter(|w| w.date >= week_ago).count(),
        weekly_meals: meals.iter().filter(|m| m.date >= week_ago).count(),
    }
}

/// Number of workouts, newest first, before the first gap longer than a day.
pub fn workout_streak(workouts: &[Workout]) -> u32 {
    let mut dates: Vec<DateTime<Utc>> = workouts.iter().map(|w| w.date).collect();
    dates.sort_unstable_by(|a, b| b.cmp(a));

    let Some(&first) = dates.first() else {
        return 0;
    };

    let mut streak = 0;
    let mut prev = first;
    for date in dates {
        if (prev - date).abs() > Duration::days(1) {
            break;
        }
        streak += 1;
        prev = date;
    }
    streak
}

pub fn meal_adherence(meals: &[Meal]) -> u32 {
    let mut per_day: HashMap<NaiveDate, usize> = HashMap::new();
    for meal in meals {
        *per_day.entry(meal.date.date_naive()).or_insert(0) += 1;
    }

    if per_day.is_empty() {
        return 0;
    }

    let adherent = per_day
        .values()
        .filter(|&&count| count >= MEALS_PER_ADHERENT_DAY)
        .count();
    (adherent as f64 * 100.0 / per_day.len() as f64).round() as u32
}

pub fn calories_burned(workouts: &[Workout]) -> i64 {
    workouts
        .iter()
        .map(|w| i64::from(w.duration_minutes.unwrap_or(0)) * CALORIES_PER_MINUTE)
        .sum()
}

pub fn weight_progress(habits: &[Habit]) -> f64 {
    let mut weights: Vec<&Habit> = habits
        .iter()
        .filter(|h| h.habit_type == WEIGHT_HABIT)
        .collect();
    if weights.len() < 2 {
        return 0.0;
    }
    weights.sort_by_key(|h| h.date);

    match (weights.first(), weights.last()) {
        (Some(first), Some(last)) => last.value - first.value,
        _ => 0.0,
    }
}

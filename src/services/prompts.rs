use crate::models::plan::PlanKind;
use crate::models::user::User;

pub fn chat_prompt(question: &str) -> String {
    format!(
        "You are a health and fitness AI assistant. Answer the following user question in a helpful, concise way.\n\nQuestion: {question}"
    )
}

pub fn plan_prompt(kind: PlanKind, user_info: &str) -> String {
    match kind {
        PlanKind::Meal => format!(
            "Generate a healthy daily meal plan for: {user_info}. Include breakfast, lunch, dinner, and snacks with nutrition values."
        ),
        PlanKind::Workout => format!(
            "Generate a personalized workout plan for: {user_info}. Include warm-up, main exercises, and cool-down."
        ),
    }
}

/// One-line profile summary fed into plan prompts. Missing fields are left
/// blank rather than omitted so the model always sees the same shape.
pub fn describe_profile(user: &User) -> String {
    fn text(v: &Option<String>) -> &str {
        v.as_deref().unwrap_or("")
    }
    fn number<T: ToString>(v: Option<T>) -> String {
        v.map(|n| n.to_string()).unwrap_or_default()
    }

    format!(
        "Name: {}, Sex: {}, Age: {}, Weight: {}kg, Height: {}cm, Issues: {}, Motive: {}, Goal: {}, Diet: {}",
        text(&user.name),
        text(&user.sex),
        number(user.age),
        number(user.weight_kg),
        number(user.height_cm),
        text(&user.issues),
        text(&user.motive),
        text(&user.goal),
        text(&user.diet),
    )
}

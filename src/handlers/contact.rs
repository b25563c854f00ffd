use axum::{extract::State, Json};
use uuid::Uuid;
use validator::Validate;

use crate::dto::{ContactRequest, ContactResponse};
use crate::error::AppResult;
use crate::models::contact::Contact;
use crate::AppState;

pub async fn submit_contact(
    State(state): State<AppState>,
    Json(body): Json<ContactRequest>,
) -> AppResult<Json<ContactResponse>> {
    let body = body.normalized();
    body.validate()?;

    let contact = sqlx::query_as::<_, Contact>(
        r#"
        INSERT INTO contacts (id, name, email, message)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&body.name)
    .bind(&body.email)
    .bind(&body.message)
    .fetch_one(&state.db)
    .await?;

    tracing::info!(contact_id = %contact.id, "Contact message stored");

    Ok(Json(ContactResponse {
        success: true,
        message: "Thank you for your message! We'll get back to you soon.".into(),
        contact_id: contact.id,
    }))
}

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::dto::ChatRequest;
use crate::error::{AppError, AppResult};
use crate::handlers::profile::find_user;
use crate::models::conversation::{
    Conversation, ConversationQuery, ConversationWithMessages, Message, MessageRole,
};
use crate::services::ai::generate_or_fallback;
use crate::services::prompts::chat_prompt;
use crate::AppState;

pub const CHAT_FALLBACK: &str = "Sorry, there was an error.";

async fn find_conversation(
    db: &PgPool,
    conversation_id: Uuid,
    user_id: Uuid,
) -> AppResult<Conversation> {
    sqlx::query_as::<_, Conversation>(
        "SELECT * FROM conversations WHERE id = $1 AND user_id = $2",
    )
    .bind(conversation_id)
    .bind(user_id)
    .fetch_optional(db)
    .await?
    .ok_or(AppError::NotFound("Conversation not found".into()))
}

async fn load_messages(db: &PgPool, conversation_ids: &[Uuid]) -> AppResult<Vec<Message>> {
    let messages = sqlx::query_as::<_, Message>(
        r#"
        SELECT * FROM messages
        WHERE conversation_id = ANY($1)
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(conversation_ids)
    .fetch_all(db)
    .await?;
    Ok(messages)
}

async fn insert_message(
    db: &PgPool,
    conversation_id: Uuid,
    role: MessageRole,
    text: &str,
) -> AppResult<Message> {
    let message = sqlx::query_as::<_, Message>(
        r#"
        INSERT INTO messages (id, conversation_id, role, text)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(conversation_id)
    .bind(role)
    .bind(text)
    .fetch_one(db)
    .await?;
    Ok(message)
}

async fn with_messages(db: &PgPool, conversation: Conversation) -> AppResult<ConversationWithMessages> {
    let messages = load_messages(db, &[conversation.id]).await?;
    Ok(ConversationWithMessages {
        conversation,
        messages,
    })
}

/// Append a user message to a conversation (starting one if no id is given)
/// and answer it.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<ChatRequest>,
) -> AppResult<Json<Value>> {
    body.validate()?;
    let message = body.message.trim();
    if message.is_empty() {
        return Err(AppError::Validation("Message required".into()));
    }

    let user = find_user(&state.db, &auth_user.identity_id).await?;

    let conversation = match body.conversation_id {
        Some(id) => find_conversation(&state.db, id, user.id).await?,
        None => {
            sqlx::query_as::<_, Conversation>(
                "INSERT INTO conversations (id, user_id) VALUES ($1, $2) RETURNING *",
            )
            .bind(Uuid::new_v4())
            .bind(user.id)
            .fetch_one(&state.db)
            .await?
        }
    };

    insert_message(&state.db, conversation.id, MessageRole::User, message).await?;

    let reply = generate_or_fallback(state.ai.as_ref(), &chat_prompt(message), CHAT_FALLBACK).await;
    insert_message(&state.db, conversation.id, MessageRole::Ai, &reply.text).await?;

    tracing::debug!(
        conversation_id = %conversation.id,
        source = ?reply.source,
        "Chat reply stored"
    );

    let conversation = with_messages(&state.db, conversation).await?;
    Ok(Json(json!({ "conversation": conversation })))
}

pub async fn get_conversations(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<ConversationQuery>,
) -> AppResult<Json<Value>> {
    let user = find_user(&state.db, &auth_user.identity_id).await?;

    if let Some(id) = query.conversation_id {
        let conversation = find_conversation(&state.db, id, user.id).await?;
        let conversation = with_messages(&state.db, conversation).await?;
        return Ok(Json(json!({ "conversation": conversation })));
    }

    let conversations = sqlx::query_as::<_, Conversation>(
        "SELECT * FROM conversations WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user.id)
    .fetch_all(&state.db)
    .await?;

    let ids: Vec<Uuid> = conversations.iter().map(|c| c.id).collect();
    let messages = load_messages(&state.db, &ids).await?;

    Ok(Json(json!({
        "conversations": ConversationWithMessages::group(conversations, messages),
    })))
}

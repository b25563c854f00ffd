use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Conversation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "message_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Ai,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub role: MessageRole,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ConversationWithMessages {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub messages: Vec<Message>,
}

impl ConversationWithMessages {
    /// Attach messages to their conversations, keeping the conversation order
    /// and each conversation's message order.
    pub fn group(conversations: Vec<Conversation>, messages: Vec<Message>) -> Vec<Self> {
        let mut grouped: Vec<Self> = conversations
            .into_iter()
            .map(|conversation| Self {
                conversation,
                messages: Vec::new(),
            })
            .collect();
        for message in messages {
            if let Some(entry) = grouped
                .iter_mut()
                .find(|c| c.conversation.id == message.conversation_id)
            {
                entry.messages.push(message);
            }
        }
        grouped
    }
}

#[derive(Debug, Deserialize)]
pub struct ConversationQuery {
    pub conversation_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(conversation_id: Uuid, text: &str) -> Message {
        Message {
            id: Uuid::new_v4(),
            conversation_id,
            role: MessageRole::User,
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_group_keeps_orders() {
        let user_id = Uuid::new_v4();
        let newer = Conversation { id: Uuid::new_v4(), user_id, created_at: Utc::now() };
        let older = Conversation { id: Uuid::new_v4(), user_id, created_at: Utc::now() };
        let messages = vec![
            message(older.id, "first"),
            message(newer.id, "hello"),
            message(older.id, "second"),
        ];

        let grouped = ConversationWithMessages::group(vec![newer.clone(), older.clone()], messages);

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].conversation.id, newer.id);
        assert_eq!(grouped[0].messages.len(), 1);
        let texts: Vec<&str> = grouped[1].messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["first", "second"]);
    }

    #[test]
    fn test_group_drops_orphan_messages() {
        let conv = Conversation { id: Uuid::new_v4(), user_id: Uuid::new_v4(), created_at: Utc::now() };
        let grouped = ConversationWithMessages::group(vec![conv], vec![message(Uuid::new_v4(), "x")]);
        assert!(grouped[0].messages.is_empty());
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_value(MessageRole::Ai).unwrap(), "ai");
    }
}

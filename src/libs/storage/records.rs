use crate::libs::core::models::{ConversationId, Identity, MessageId, Role, UserId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Now, truncated to the millisecond precision the store persists, so a
/// freshly built record compares equal to its reloaded self.
pub(crate) fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    now - Duration::nanoseconds(i64::from(now.timestamp_subsec_nanos() % 1_000_000))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn new(username: &str, role: Role) -> Self {
        Self {
            user_id: UserId::new(),
            username: username.to_string(),
            role,
            is_active: true,
            created_at: now_millis(),
        }
    }
}

impl From<&UserRecord> for Identity {
    fn from(record: &UserRecord) -> Self {
        Identity {
            user_id: record.user_id,
            role: record.role,
            is_active: record.is_active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub conversation_id: ConversationId,
    pub title: Option<String>,
    pub is_group: bool,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    /// Bumped on every new message so listings sort by recency.
    pub updated_at: DateTime<Utc>,
}

impl ConversationRecord {
    pub fn new(title: Option<&str>, is_group: bool, created_by: UserId) -> Self {
        let now = now_millis();
        Self {
            conversation_id: ConversationId::new(),
            title: title.map(str::to_string),
            is_group,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Join row granting a user access to a conversation. Never hard-deleted:
/// leaving flips `is_active` so authorship history keeps its meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRecord {
    pub conversation_id: ConversationId,
    pub user_id: UserId,
    pub joined_at: DateTime<Utc>,
    pub is_admin: bool,
    pub is_active: bool,
}

impl ParticipantRecord {
    pub fn new(conversation_id: ConversationId, user_id: UserId, is_admin: bool) -> Self {
        Self {
            conversation_id,
            user_id,
            joined_at: now_millis(),
            is_admin,
            is_active: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub message_id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub is_edited: bool,
    pub edited_at: Option<DateTime<Utc>>,
    /// Weak self-reference. Cleared when the pointee is deleted, so it may
    /// be absent but never dangling.
    pub reply_to: Option<MessageId>,
}

impl MessageRecord {
    pub fn new(
        conversation_id: ConversationId,
        sender_id: UserId,
        content: &str,
        reply_to: Option<MessageId>,
    ) -> Self {
        Self {
            message_id: MessageId::new(),
            conversation_id,
            sender_id,
            content: content.to_string(),
            created_at: now_millis(),
            is_edited: false,
            edited_at: None,
            reply_to,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadReceiptRecord {
    pub message_id: MessageId,
    pub user_id: UserId,
    pub read_at: DateTime<Utc>,
}

impl ReadReceiptRecord {
    pub fn new(message_id: MessageId, user_id: UserId) -> Self {
        Self {
            message_id,
            user_id,
            read_at: now_millis(),
        }
    }
}

/// Trimmed projection of the newest message, for conversation listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastMessage {
    pub message_id: MessageId,
    pub sender_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<MessageRecord> for LastMessage {
    fn from(record: MessageRecord) -> Self {
        Self {
            message_id: record.message_id,
            sender_id: record.sender_id,
            content: record.content,
            created_at: record.created_at,
        }
    }
}

/// What a conversation listing returns per row: the conversation itself,
/// a live participant count and the top-1 newest message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub conversation: ConversationRecord,
    pub participant_count: u64,
    pub last_message: Option<LastMessage>,
}

use crate::libs::core::models::{
    ConversationId, MessageFilter, MessageId, SortOrder, UserId,
};
use crate::libs::storage::records::{
    ConversationRecord, MessageRecord, ParticipantRecord, ReadReceiptRecord, UserRecord,
};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Ties a store to the transaction type its operations run inside.
pub trait Storage {
    type Transaction<'s>: Transactional + EntityStore + 's
    where
        Self: 's;
}

pub trait Transactional {
    fn commit(self) -> Result<(), StoreError>;
    fn rollback(self) -> Result<(), StoreError>;
}

pub trait UserStore {
    fn insert_user(&mut self, record: &UserRecord) -> Result<(), StoreError>;
    fn load_user(&mut self, user_id: UserId) -> Result<Option<UserRecord>, StoreError>;
    fn load_user_by_name(&mut self, username: &str) -> Result<Option<UserRecord>, StoreError>;
}

pub trait ConversationStore {
    fn insert_conversation(&mut self, record: &ConversationRecord) -> Result<(), StoreError>;
    fn load_conversation(
        &mut self,
        conversation_id: ConversationId,
    ) -> Result<Option<ConversationRecord>, StoreError>;
    fn set_conversation_title(
        &mut self,
        conversation_id: ConversationId,
        title: Option<&str>,
    ) -> Result<(), StoreError>;
    /// Bumps `updated_at` so the conversation bubbles up in listings.
    fn touch_conversation(
        &mut self,
        conversation_id: ConversationId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
    /// Cascades to participants, messages and receipts.
    fn delete_conversation(&mut self, conversation_id: ConversationId) -> Result<(), StoreError>;
    /// Conversations where the user is an active participant, newest
    /// activity first. This is the only way listings ever reach the rows,
    /// so scoping happens before any caller-supplied filter.
    fn conversations_for_user(
        &mut self,
        user_id: UserId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ConversationRecord>, StoreError>;
    fn count_conversations_for_user(&mut self, user_id: UserId) -> Result<u64, StoreError>;
}

pub trait ParticipantStore {
    fn insert_participant(&mut self, record: &ParticipantRecord) -> Result<(), StoreError>;
    fn load_participant(
        &mut self,
        conversation_id: ConversationId,
        user_id: UserId,
    ) -> Result<Option<ParticipantRecord>, StoreError>;
    fn set_participant_active(
        &mut self,
        conversation_id: ConversationId,
        user_id: UserId,
        active: bool,
    ) -> Result<(), StoreError>;
    fn count_active_participants(
        &mut self,
        conversation_id: ConversationId,
    ) -> Result<u64, StoreError>;
}

pub trait MessageStore {
    fn insert_message(&mut self, record: &MessageRecord) -> Result<(), StoreError>;
    fn load_message(
        &mut self,
        message_id: MessageId,
    ) -> Result<Option<MessageRecord>, StoreError>;
    fn apply_edit(
        &mut self,
        message_id: MessageId,
        content: &str,
        edited_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
    fn delete_message(&mut self, message_id: MessageId) -> Result<(), StoreError>;
    /// Nulls out `reply_to` on every message referencing the given one, so
    /// deletion never leaves a dangling reference. Returns rows touched.
    fn clear_replies_to(&mut self, message_id: MessageId) -> Result<u64, StoreError>;
    fn messages_for_conversation(
        &mut self,
        conversation_id: ConversationId,
        filter: &MessageFilter,
        order: SortOrder,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MessageRecord>, StoreError>;
    fn count_messages(
        &mut self,
        conversation_id: ConversationId,
        filter: &MessageFilter,
    ) -> Result<u64, StoreError>;
    /// Top-1 newest message of a conversation, one bounded lookup.
    fn last_message(
        &mut self,
        conversation_id: ConversationId,
    ) -> Result<Option<MessageRecord>, StoreError>;
    /// Set difference: messages in the user's active conversations, minus
    /// those receipted by the user, minus those the user sent.
    fn unread_messages_for(&mut self, user_id: UserId) -> Result<Vec<MessageRecord>, StoreError>;
}

pub trait ReceiptStore {
    /// Returns false when the receipt already existed.
    fn insert_receipt(&mut self, record: &ReadReceiptRecord) -> Result<bool, StoreError>;
    fn has_receipt(
        &mut self,
        message_id: MessageId,
        user_id: UserId,
    ) -> Result<bool, StoreError>;
}

pub trait EntityStore:
    UserStore + ConversationStore + ParticipantStore + MessageStore + ReceiptStore
{
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(String),
    #[error("connection pool error: {0}")]
    Pool(String),
    #[error("constraint violated: {0}")]
    Constraint(String),
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> StoreError {
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Constraint(err.to_string())
            }
            _ => StoreError::Sqlite(err.to_string()),
        }
    }
}

impl From<r2d2::Error> for StoreError {
    fn from(err: r2d2::Error) -> StoreError {
        StoreError::Pool(err.to_string())
    }
}

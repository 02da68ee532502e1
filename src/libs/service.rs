use crate::libs::core::authorization::AuthorizationEngine;
use crate::libs::core::models::{
    AccessPolicy, Action, ConversationId, Identity, MessageFilter, MessageId, Page, PageRequest,
    ResourceRef, Role, SortOrder, UserId,
};
use crate::libs::core::{mutation, query_planner};
use crate::libs::error::{ChatError, Entity};
use crate::libs::storage::database::storage_sqlite::{SqliteStore, SqliteTransaction};
use crate::libs::storage::records::{
    ConversationRecord, ConversationSummary, MessageRecord, ParticipantRecord, UserRecord,
};
use crate::libs::storage::storage_traits::{
    ConversationStore, MessageStore, Transactional, UserStore,
};
use tracing::info;

/// The outward face of the crate: one pooled SQLite store plus one
/// authorization engine, stateless per call. Every operation runs inside
/// its own transaction; an error before commit rolls the whole call back,
/// so multi-row mutations are all-or-nothing.
pub struct ChatService {
    store: SqliteStore,
    engine: AuthorizationEngine,
}

impl ChatService {
    pub fn open(path: &str) -> Result<Self, ChatError> {
        Self::open_with_policy(path, AccessPolicy::default())
    }

    pub fn open_with_policy(path: &str, policy: AccessPolicy) -> Result<Self, ChatError> {
        let store = SqliteStore::open(path)?;
        info!(path, "chat service ready");
        Ok(Self {
            store,
            engine: AuthorizationEngine::new(policy),
        })
    }

    pub fn engine(&self) -> &AuthorizationEngine {
        &self.engine
    }

    fn with_tx<T, F>(&self, f: F) -> Result<T, ChatError>
    where
        F: FnOnce(&mut SqliteTransaction) -> Result<T, ChatError>,
    {
        let mut conn = self.store.new_connection()?;
        let mut tx = SqliteTransaction::new(&mut conn)?;
        // Dropping an uncommitted rusqlite transaction rolls it back.
        let out = f(&mut tx)?;
        tx.commit()?;
        Ok(out)
    }

    /// Standalone authorization check, for boundary layers that want to
    /// probe before acting.
    pub fn authorize(
        &self,
        identity: &Identity,
        action: Action,
        resource: &ResourceRef,
    ) -> Result<(), ChatError> {
        self.with_tx(|tx| self.engine.authorize(tx, identity, action, resource))
    }

    /// Builds an identity context from a stored user, for callers that
    /// resolved credentials out of band.
    pub fn identity_for(&self, user_id: UserId) -> Result<Identity, ChatError> {
        self.with_tx(|tx| {
            tx.load_user(user_id)?
                .map(|user| Identity::from(&user))
                .ok_or(ChatError::NotFound(Entity::User))
        })
    }

    pub fn register_user(&self, username: &str, role: Role) -> Result<UserRecord, ChatError> {
        self.with_tx(|tx| mutation::register_user(tx, username, role))
    }

    pub fn create_conversation(
        &self,
        identity: &Identity,
        title: Option<&str>,
        is_group: bool,
        participant_ids: &[UserId],
    ) -> Result<ConversationRecord, ChatError> {
        self.with_tx(|tx| {
            mutation::create_conversation(tx, identity, title, is_group, participant_ids)
        })
    }

    pub fn get_conversation(
        &self,
        identity: &Identity,
        conversation_id: ConversationId,
    ) -> Result<ConversationRecord, ChatError> {
        self.with_tx(|tx| {
            self.engine.authorize(
                tx,
                identity,
                Action::ReadConversation,
                &ResourceRef::Conversation(conversation_id),
            )?;
            tx.load_conversation(conversation_id)?
                .ok_or(ChatError::NotFound(Entity::Conversation))
        })
    }

    pub fn get_message(
        &self,
        identity: &Identity,
        message_id: MessageId,
    ) -> Result<MessageRecord, ChatError> {
        self.with_tx(|tx| {
            self.engine.authorize(
                tx,
                identity,
                Action::ReadMessage,
                &ResourceRef::Message(message_id),
            )?;
            tx.load_message(message_id)?
                .ok_or(ChatError::NotFound(Entity::Message))
        })
    }

    pub fn list_conversations(
        &self,
        identity: &Identity,
        page: &PageRequest,
    ) -> Result<Page<ConversationSummary>, ChatError> {
        self.with_tx(|tx| query_planner::list_conversations(tx, identity, page))
    }

    pub fn list_messages(
        &self,
        identity: &Identity,
        conversation_id: ConversationId,
        filter: &MessageFilter,
        order: SortOrder,
        page: &PageRequest,
    ) -> Result<Page<MessageRecord>, ChatError> {
        self.with_tx(|tx| {
            query_planner::list_messages(
                tx,
                &self.engine,
                identity,
                conversation_id,
                filter,
                order,
                page,
            )
        })
    }

    pub fn unread_messages(&self, identity: &Identity) -> Result<Vec<MessageRecord>, ChatError> {
        self.with_tx(|tx| query_planner::unread_messages(tx, identity))
    }

    pub fn send_message(
        &self,
        identity: &Identity,
        conversation_id: ConversationId,
        content: &str,
        reply_to: Option<MessageId>,
    ) -> Result<MessageRecord, ChatError> {
        self.with_tx(|tx| {
            mutation::send_message(tx, &self.engine, identity, conversation_id, content, reply_to)
        })
    }

    pub fn edit_message(
        &self,
        identity: &Identity,
        message_id: MessageId,
        new_content: &str,
    ) -> Result<MessageRecord, ChatError> {
        self.with_tx(|tx| {
            mutation::edit_message(tx, &self.engine, identity, message_id, new_content)
        })
    }

    pub fn delete_message(
        &self,
        identity: &Identity,
        message_id: MessageId,
    ) -> Result<(), ChatError> {
        self.with_tx(|tx| mutation::delete_message(tx, &self.engine, identity, message_id))
    }

    pub fn rename_conversation(
        &self,
        identity: &Identity,
        conversation_id: ConversationId,
        title: Option<&str>,
    ) -> Result<ConversationRecord, ChatError> {
        self.with_tx(|tx| {
            mutation::rename_conversation(tx, &self.engine, identity, conversation_id, title)
        })
    }

    pub fn delete_conversation(
        &self,
        identity: &Identity,
        conversation_id: ConversationId,
    ) -> Result<(), ChatError> {
        self.with_tx(|tx| {
            mutation::delete_conversation(tx, &self.engine, identity, conversation_id)
        })
    }

    pub fn add_participant(
        &self,
        identity: &Identity,
        conversation_id: ConversationId,
        user_id: UserId,
    ) -> Result<ParticipantRecord, ChatError> {
        self.with_tx(|tx| {
            mutation::add_participant(tx, &self.engine, identity, conversation_id, user_id)
        })
    }

    pub fn remove_participant(
        &self,
        identity: &Identity,
        conversation_id: ConversationId,
        user_id: UserId,
    ) -> Result<(), ChatError> {
        self.with_tx(|tx| {
            mutation::remove_participant(tx, &self.engine, identity, conversation_id, user_id)
        })
    }

    pub fn mark_read(&self, identity: &Identity, message_id: MessageId) -> Result<(), ChatError> {
        self.with_tx(|tx| mutation::mark_read(tx, &self.engine, identity, message_id))
    }
}

use crate::libs::core::models::{
    AccessPolicy, Action, DeletePolicy, Identity, ParticipantPolicy, ResourceRef,
};
use crate::libs::error::{ChatError, DenyReason, Entity};
use crate::libs::storage::records::{ConversationRecord, MessageRecord, ParticipantRecord};
use crate::libs::storage::storage_traits::EntityStore;

/// Single adjudication point for every (identity, action, resource) triple.
///
/// The two criteria are deliberately kept apart: participancy gates reads
/// and conversation-level writes, authorship alone gates message mutation.
/// A participant who is not the sender can read a message but never edit
/// or delete it.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationEngine {
    policy: AccessPolicy,
}

impl AuthorizationEngine {
    pub fn new(policy: AccessPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// Returns `Ok(())` when the action is permitted, otherwise the typed
    /// denial. Consulted before any planner or coordinator work; a denial
    /// here means nothing has touched the store yet.
    pub fn authorize<S: EntityStore>(
        &self,
        store: &mut S,
        identity: &Identity,
        action: Action,
        resource: &ResourceRef,
    ) -> Result<(), ChatError> {
        if !identity.is_active {
            return Err(ChatError::Unauthenticated);
        }

        match action {
            Action::ReadConversation | Action::UpdateConversation => {
                let conversation = self.require_conversation(store, resource)?;
                self.require_active_participant(
                    store,
                    &conversation,
                    identity,
                )?;
                Ok(())
            }
            Action::DeleteConversation => {
                let conversation = self.require_conversation(store, resource)?;
                self.require_active_participant(store, &conversation, identity)?;
                if self.policy.delete_conversation == DeletePolicy::CreatorOnly
                    && conversation.created_by != identity.user_id
                {
                    return Err(ChatError::Forbidden(DenyReason::NotSender));
                }
                Ok(())
            }
            Action::CreateMessage => {
                let conversation = self.require_conversation(store, resource)?;
                self.require_active_participant(store, &conversation, identity)?;
                Ok(())
            }
            Action::AddParticipant | Action::RemoveParticipant => {
                let conversation = self.require_conversation(store, resource)?;
                let participant =
                    self.require_active_participant(store, &conversation, identity)?;
                if self.policy.manage_participants == ParticipantPolicy::ConversationAdmin
                    && !participant.is_admin
                {
                    return Err(ChatError::Forbidden(DenyReason::NotParticipant));
                }
                Ok(())
            }
            Action::ReadMessage => {
                let message = self.require_message(store, resource)?;
                let conversation = store
                    .load_conversation(message.conversation_id)?
                    .ok_or(ChatError::NotFound(Entity::Conversation))?;
                self.require_active_participant(store, &conversation, identity)?;
                Ok(())
            }
            Action::UpdateMessage | Action::DeleteMessage => {
                // Authorship is the sole criterion here; participancy is
                // not consulted, so a sender who has since left can still
                // manage their own messages, and no other participant can.
                let message = self.require_message(store, resource)?;
                if message.sender_id != identity.user_id {
                    return Err(ChatError::Forbidden(DenyReason::NotSender));
                }
                Ok(())
            }
        }
    }

    fn require_conversation<S: EntityStore>(
        &self,
        store: &mut S,
        resource: &ResourceRef,
    ) -> Result<ConversationRecord, ChatError> {
        let ResourceRef::Conversation(conversation_id) = resource else {
            return Err(ChatError::NotFound(Entity::Conversation));
        };
        store
            .load_conversation(*conversation_id)?
            .ok_or(ChatError::NotFound(Entity::Conversation))
    }

    fn require_message<S: EntityStore>(
        &self,
        store: &mut S,
        resource: &ResourceRef,
    ) -> Result<MessageRecord, ChatError> {
        let ResourceRef::Message(message_id) = resource else {
            return Err(ChatError::NotFound(Entity::Message));
        };
        store
            .load_message(*message_id)?
            .ok_or(ChatError::NotFound(Entity::Message))
    }

    fn require_active_participant<S: EntityStore>(
        &self,
        store: &mut S,
        conversation: &ConversationRecord,
        identity: &Identity,
    ) -> Result<ParticipantRecord, ChatError> {
        match store.load_participant(conversation.conversation_id, identity.user_id)? {
            None => Err(ChatError::Forbidden(DenyReason::NotParticipant)),
            Some(participant) if !participant.is_active => {
                Err(ChatError::Forbidden(DenyReason::InactiveParticipant))
            }
            Some(participant) => Ok(participant),
        }
    }
}

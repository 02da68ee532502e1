use crate::libs::core::authorization::AuthorizationEngine;
use crate::libs::core::models::{
    Action, ConversationId, Identity, MessageFilter, Page, PageRequest, ResourceRef, SortOrder,
};
use crate::libs::error::ChatError;
use crate::libs::storage::records::{ConversationSummary, LastMessage, MessageRecord};
use crate::libs::storage::storage_traits::EntityStore;

/// Lists the caller's conversations, newest activity first.
///
/// Scoping to the caller's active participations happens inside the store
/// query itself, so no filter or pagination choice can surface a
/// conversation the caller is not in.
pub fn list_conversations<S: EntityStore>(
    store: &mut S,
    identity: &Identity,
    page: &PageRequest,
) -> Result<Page<ConversationSummary>, ChatError> {
    if !identity.is_active {
        return Err(ChatError::Unauthenticated);
    }

    let (limit, offset) = page.bounds();
    let conversations = store.conversations_for_user(identity.user_id, limit, offset)?;
    let total = store.count_conversations_for_user(identity.user_id)?;

    let mut items = Vec::with_capacity(conversations.len());
    for conversation in conversations {
        // Live count and a single top-1 lookup per conversation; no scan.
        let participant_count = store.count_active_participants(conversation.conversation_id)?;
        let last_message = store
            .last_message(conversation.conversation_id)?
            .map(LastMessage::from);
        items.push(ConversationSummary {
            conversation,
            participant_count,
            last_message,
        });
    }

    Ok(Page {
        items,
        total,
        limit: page.limit,
        offset: page.offset,
    })
}

/// Lists messages inside one conversation the caller participates in.
///
/// Ordering is an explicit parameter; `SortOrder::default()` is ascending
/// creation time, the conversation detail order. Ties are broken by
/// message id. A caller who is not an active participant gets a
/// `Forbidden`, never an empty page.
pub fn list_messages<S: EntityStore>(
    store: &mut S,
    engine: &AuthorizationEngine,
    identity: &Identity,
    conversation_id: ConversationId,
    filter: &MessageFilter,
    order: SortOrder,
    page: &PageRequest,
) -> Result<Page<MessageRecord>, ChatError> {
    engine.authorize(
        store,
        identity,
        Action::ReadConversation,
        &ResourceRef::Conversation(conversation_id),
    )?;

    let (limit, offset) = page.bounds();
    let items = store.messages_for_conversation(conversation_id, filter, order, limit, offset)?;
    let total = store.count_messages(conversation_id, filter)?;

    Ok(Page {
        items,
        total,
        limit: page.limit,
        offset: page.offset,
    })
}

/// Messages the caller has not seen: everything in their active
/// conversations minus what they receipted minus what they sent. Derived
/// on every call; there is no materialized unread flag to go stale.
pub fn unread_messages<S: EntityStore>(
    store: &mut S,
    identity: &Identity,
) -> Result<Vec<MessageRecord>, ChatError> {
    if !identity.is_active {
        return Err(ChatError::Unauthenticated);
    }
    Ok(store.unread_messages_for(identity.user_id)?)
}

use crate::libs::core::authorization::AuthorizationEngine;
use crate::libs::core::models::{
    Action, ConversationId, Identity, MessageId, ResourceRef, Role, UserId,
};
use crate::libs::error::{ChatError, DenyReason, Entity};
use crate::libs::storage::records::{
    now_millis, ConversationRecord, MessageRecord, ParticipantRecord, ReadReceiptRecord,
    UserRecord,
};
use crate::libs::storage::storage_traits::EntityStore;
use tracing::debug;

/// Upper bound on message content, counted in chars after trimming.
pub const MAX_CONTENT_CHARS: usize = 1000;

fn validate_content(content: &str) -> Result<&str, ChatError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(ChatError::ValidationFailed {
            field: "content",
            rule: "must not be empty".to_string(),
        });
    }
    if trimmed.chars().count() > MAX_CONTENT_CHARS {
        return Err(ChatError::ValidationFailed {
            field: "content",
            rule: format!("must be at most {MAX_CONTENT_CHARS} characters"),
        });
    }
    Ok(trimmed)
}

/// Registers a user. Usernames are unique; a taken name is a `Conflict`.
pub fn register_user<S: EntityStore>(
    store: &mut S,
    username: &str,
    role: Role,
) -> Result<UserRecord, ChatError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(ChatError::ValidationFailed {
            field: "username",
            rule: "must not be empty".to_string(),
        });
    }
    if store.load_user_by_name(username)?.is_some() {
        return Err(ChatError::Conflict(format!(
            "username `{username}` is already taken"
        )));
    }
    let record = UserRecord::new(username, role);
    store.insert_user(&record)?;
    debug!(user_id = %record.user_id, "user registered");
    Ok(record)
}

/// Creates a conversation with its initial participant set in one unit.
///
/// The creator is always included (and carries the conversation-admin
/// flag); ids must be distinct and the final set must hold at least two
/// users, all of which must exist.
pub fn create_conversation<S: EntityStore>(
    store: &mut S,
    identity: &Identity,
    title: Option<&str>,
    is_group: bool,
    participant_ids: &[UserId],
) -> Result<ConversationRecord, ChatError> {
    if !identity.is_active {
        return Err(ChatError::Unauthenticated);
    }

    let mut members: Vec<UserId> = vec![identity.user_id];
    for &user_id in participant_ids {
        if user_id == identity.user_id {
            continue;
        }
        if members.contains(&user_id) {
            return Err(ChatError::ValidationFailed {
                field: "participant_ids",
                rule: "duplicate participant ids".to_string(),
            });
        }
        members.push(user_id);
    }
    if members.len() < 2 {
        return Err(ChatError::ValidationFailed {
            field: "participant_ids",
            rule: "a conversation needs at least 2 participants".to_string(),
        });
    }
    for &user_id in &members {
        if store.load_user(user_id)?.is_none() {
            return Err(ChatError::NotFound(Entity::User));
        }
    }

    let conversation = ConversationRecord::new(title, is_group, identity.user_id);
    store.insert_conversation(&conversation)?;
    for &user_id in &members {
        let is_admin = user_id == identity.user_id;
        store.insert_participant(&ParticipantRecord::new(
            conversation.conversation_id,
            user_id,
            is_admin,
        ))?;
    }

    debug!(
        conversation_id = %conversation.conversation_id,
        participants = members.len(),
        "conversation created"
    );
    Ok(conversation)
}

/// Persists a message and bumps the conversation's `updated_at` in the
/// same transaction, so a send either fully lands or leaves no trace.
pub fn send_message<S: EntityStore>(
    store: &mut S,
    engine: &AuthorizationEngine,
    identity: &Identity,
    conversation_id: ConversationId,
    content: &str,
    reply_to: Option<MessageId>,
) -> Result<MessageRecord, ChatError> {
    engine.authorize(
        store,
        identity,
        Action::CreateMessage,
        &ResourceRef::Conversation(conversation_id),
    )?;
    let content = validate_content(content)?;

    if let Some(parent_id) = reply_to {
        let parent = store
            .load_message(parent_id)?
            .ok_or(ChatError::NotFound(Entity::Message))?;
        if parent.conversation_id != conversation_id {
            return Err(ChatError::ValidationFailed {
                field: "reply_to",
                rule: "reply must reference a message in the same conversation".to_string(),
            });
        }
    }

    let record = MessageRecord::new(conversation_id, identity.user_id, content, reply_to);
    store.insert_message(&record)?;
    store.touch_conversation(conversation_id, record.created_at)?;

    debug!(message_id = %record.message_id, conversation_id = %conversation_id, "message sent");
    Ok(record)
}

/// Rewrites a message's content. Authorship is re-verified against the
/// row inside the transaction, closing the window between the engine's
/// check and the write. `created_at` never changes.
pub fn edit_message<S: EntityStore>(
    store: &mut S,
    engine: &AuthorizationEngine,
    identity: &Identity,
    message_id: MessageId,
    new_content: &str,
) -> Result<MessageRecord, ChatError> {
    engine.authorize(
        store,
        identity,
        Action::UpdateMessage,
        &ResourceRef::Message(message_id),
    )?;
    let content = validate_content(new_content)?;

    let mut record = store
        .load_message(message_id)?
        .ok_or(ChatError::NotFound(Entity::Message))?;
    if record.sender_id != identity.user_id {
        return Err(ChatError::Forbidden(DenyReason::NotSender));
    }

    let edited_at = now_millis();
    store.apply_edit(message_id, content, edited_at)?;
    record.content = content.to_string();
    record.is_edited = true;
    record.edited_at = Some(edited_at);
    Ok(record)
}

/// Deletes a message, first clearing `reply_to` on its dependents so no
/// reference dangles. Both steps share the transaction.
pub fn delete_message<S: EntityStore>(
    store: &mut S,
    engine: &AuthorizationEngine,
    identity: &Identity,
    message_id: MessageId,
) -> Result<(), ChatError> {
    engine.authorize(
        store,
        identity,
        Action::DeleteMessage,
        &ResourceRef::Message(message_id),
    )?;
    let cleared = store.clear_replies_to(message_id)?;
    store.delete_message(message_id)?;
    debug!(message_id = %message_id, replies_cleared = cleared, "message deleted");
    Ok(())
}

/// Retitles a conversation. Gated on active participancy, like any other
/// conversation-level write.
pub fn rename_conversation<S: EntityStore>(
    store: &mut S,
    engine: &AuthorizationEngine,
    identity: &Identity,
    conversation_id: ConversationId,
    title: Option<&str>,
) -> Result<ConversationRecord, ChatError> {
    engine.authorize(
        store,
        identity,
        Action::UpdateConversation,
        &ResourceRef::Conversation(conversation_id),
    )?;
    let mut record = store
        .load_conversation(conversation_id)?
        .ok_or(ChatError::NotFound(Entity::Conversation))?;
    store.set_conversation_title(conversation_id, title)?;
    record.title = title.map(str::to_string);
    Ok(record)
}

pub fn delete_conversation<S: EntityStore>(
    store: &mut S,
    engine: &AuthorizationEngine,
    identity: &Identity,
    conversation_id: ConversationId,
) -> Result<(), ChatError> {
    engine.authorize(
        store,
        identity,
        Action::DeleteConversation,
        &ResourceRef::Conversation(conversation_id),
    )?;
    store.delete_conversation(conversation_id)?;
    debug!(conversation_id = %conversation_id, "conversation deleted");
    Ok(())
}

/// Adds a user to a conversation. Idempotent: an already-active membership
/// is returned as-is, a membership left behind by `remove_participant` is
/// reactivated.
pub fn add_participant<S: EntityStore>(
    store: &mut S,
    engine: &AuthorizationEngine,
    identity: &Identity,
    conversation_id: ConversationId,
    user_id: UserId,
) -> Result<ParticipantRecord, ChatError> {
    engine.authorize(
        store,
        identity,
        Action::AddParticipant,
        &ResourceRef::Conversation(conversation_id),
    )?;
    if store.load_user(user_id)?.is_none() {
        return Err(ChatError::NotFound(Entity::User));
    }

    match store.load_participant(conversation_id, user_id)? {
        Some(participant) if participant.is_active => Ok(participant),
        Some(mut participant) => {
            store.set_participant_active(conversation_id, user_id, true)?;
            participant.is_active = true;
            Ok(participant)
        }
        None => {
            let record = ParticipantRecord::new(conversation_id, user_id, false);
            // A concurrent insert of the same pair surfaces as Conflict.
            store.insert_participant(&record)?;
            Ok(record)
        }
    }
}

/// Marks a membership inactive. The row stays, keeping the historical tie
/// between the user and their past messages.
pub fn remove_participant<S: EntityStore>(
    store: &mut S,
    engine: &AuthorizationEngine,
    identity: &Identity,
    conversation_id: ConversationId,
    user_id: UserId,
) -> Result<(), ChatError> {
    engine.authorize(
        store,
        identity,
        Action::RemoveParticipant,
        &ResourceRef::Conversation(conversation_id),
    )?;
    if store.load_participant(conversation_id, user_id)?.is_none() {
        return Err(ChatError::NotFound(Entity::Participant));
    }
    store.set_participant_active(conversation_id, user_id, false)?;
    Ok(())
}

/// Records that the caller has seen a message. Idempotent; marking one's
/// own message is a no-op since a sender counts as having read it.
pub fn mark_read<S: EntityStore>(
    store: &mut S,
    engine: &AuthorizationEngine,
    identity: &Identity,
    message_id: MessageId,
) -> Result<(), ChatError> {
    engine.authorize(
        store,
        identity,
        Action::ReadMessage,
        &ResourceRef::Message(message_id),
    )?;
    let message = store
        .load_message(message_id)?
        .ok_or(ChatError::NotFound(Entity::Message))?;
    if message.sender_id == identity.user_id {
        return Ok(());
    }
    store.insert_receipt(&ReadReceiptRecord::new(message_id, identity.user_id))?;
    Ok(())
}

mod common;

use common::*;
use palaver_chat_lib::{
    ChatError, DenyReason, Entity, MessageFilter, PageRequest, Role, SortOrder, UserId,
};

#[test]
fn listing_is_scoped_to_active_participations() {
    let env = env();
    let (alice_id, bob_id, conversation) = two_person_conversation(&env.service);
    let (_carol, carol_id) = register(&env.service, "carol");

    let alice_page = env
        .service
        .list_conversations(&alice_id, &PageRequest::default())
        .unwrap();
    assert_eq!(alice_page.total, 1);
    assert_eq!(
        alice_page.items[0].conversation.conversation_id,
        conversation.conversation_id
    );

    // Carol participates in nothing; the page is genuinely empty.
    let carol_page = env
        .service
        .list_conversations(&carol_id, &PageRequest::default())
        .unwrap();
    assert_eq!(carol_page.total, 0);

    // Leaving drops the conversation from Bob's listing.
    env.service
        .remove_participant(&alice_id, conversation.conversation_id, bob_id.user_id)
        .unwrap();
    let bob_page = env
        .service
        .list_conversations(&bob_id, &PageRequest::default())
        .unwrap();
    assert_eq!(bob_page.total, 0);
}

#[test]
fn summary_carries_live_count_and_last_message() {
    let env = env();
    let (alice_id, _bob_id, conversation) = two_person_conversation(&env.service);

    let empty = env
        .service
        .list_conversations(&alice_id, &PageRequest::default())
        .unwrap();
    assert_eq!(empty.items[0].participant_count, 2);
    assert!(empty.items[0].last_message.is_none());

    env.service
        .send_message(&alice_id, conversation.conversation_id, "older", None)
        .unwrap();
    tick();
    let newest = env
        .service
        .send_message(&alice_id, conversation.conversation_id, "newest", None)
        .unwrap();
    let carol = env.service.register_user("carol", Role::Guest).unwrap();
    env.service
        .add_participant(&alice_id, conversation.conversation_id, carol.user_id)
        .unwrap();

    let page = env
        .service
        .list_conversations(&alice_id, &PageRequest::default())
        .unwrap();
    let summary = &page.items[0];
    assert_eq!(summary.participant_count, 3);
    let last = summary.last_message.as_ref().unwrap();
    assert_eq!(last.message_id, newest.message_id);
    assert_eq!(last.content, "newest");
}

#[test]
fn recent_activity_floats_to_the_top() {
    let env = env();
    let (alice, alice_id) = register(&env.service, "alice");
    let (_bob, bob_id) = register(&env.service, "bob");

    let first = env
        .service
        .create_conversation(&alice_id, Some("first"), false, &[alice.user_id, bob_id.user_id])
        .unwrap();
    tick();
    let second = env
        .service
        .create_conversation(&alice_id, Some("second"), false, &[alice.user_id, bob_id.user_id])
        .unwrap();

    tick();
    env.service
        .send_message(&bob_id, first.conversation_id, "ping", None)
        .unwrap();

    let page = env
        .service
        .list_conversations(&alice_id, &PageRequest::default())
        .unwrap();
    assert_eq!(page.items[0].conversation.conversation_id, first.conversation_id);
    assert_eq!(page.items[1].conversation.conversation_id, second.conversation_id);
}

#[test]
fn denied_listing_is_an_error_not_an_empty_page() {
    let env = env();
    let (_alice_id, _bob_id, conversation) = two_person_conversation(&env.service);
    let (_carol, carol_id) = register(&env.service, "carol");

    // A filter cannot be used to probe a foreign conversation.
    assert_eq!(
        env.service
            .list_messages(
                &carol_id,
                conversation.conversation_id,
                &MessageFilter::default(),
                SortOrder::Ascending,
                &PageRequest::default(),
            )
            .unwrap_err(),
        ChatError::Forbidden(DenyReason::NotParticipant)
    );
}

#[test]
fn unread_set_excludes_own_and_receipted_messages() {
    let env = env();
    let (alice_id, bob_id, conversation) = two_person_conversation(&env.service);

    let m1 = env
        .service
        .send_message(&alice_id, conversation.conversation_id, "from alice", None)
        .unwrap();
    let m2 = env
        .service
        .send_message(&bob_id, conversation.conversation_id, "from bob", None)
        .unwrap();

    // No receipts yet: each side sees only the other's message.
    let alice_unread = env.service.unread_messages(&alice_id).unwrap();
    assert_eq!(
        alice_unread.iter().map(|m| m.message_id).collect::<Vec<_>>(),
        vec![m2.message_id]
    );
    let bob_unread = env.service.unread_messages(&bob_id).unwrap();
    assert_eq!(
        bob_unread.iter().map(|m| m.message_id).collect::<Vec<_>>(),
        vec![m1.message_id]
    );

    env.service.mark_read(&alice_id, m2.message_id).unwrap();
    assert!(env.service.unread_messages(&alice_id).unwrap().is_empty());

    // Marking twice is fine, as is marking one's own message.
    env.service.mark_read(&alice_id, m2.message_id).unwrap();
    env.service.mark_read(&alice_id, m1.message_id).unwrap();
    assert!(env.service.unread_messages(&alice_id).unwrap().is_empty());
}

#[test]
fn unread_set_ends_with_participation() {
    let env = env();
    let (alice_id, bob_id, conversation) = two_person_conversation(&env.service);

    env.service
        .send_message(&alice_id, conversation.conversation_id, "note", None)
        .unwrap();
    assert_eq!(env.service.unread_messages(&bob_id).unwrap().len(), 1);

    env.service
        .remove_participant(&alice_id, conversation.conversation_id, bob_id.user_id)
        .unwrap();
    assert!(env.service.unread_messages(&bob_id).unwrap().is_empty());
}

#[test]
fn conversation_creation_validates_participants() {
    let env = env();
    let (alice, alice_id) = register(&env.service, "alice");
    let (bob, _bob_id) = register(&env.service, "bob");

    // Creator alone is below the 2-participant floor.
    assert!(matches!(
        env.service
            .create_conversation(&alice_id, None, false, &[alice.user_id])
            .unwrap_err(),
        ChatError::ValidationFailed { field: "participant_ids", .. }
    ));

    assert!(matches!(
        env.service
            .create_conversation(&alice_id, None, false, &[bob.user_id, bob.user_id])
            .unwrap_err(),
        ChatError::ValidationFailed { field: "participant_ids", .. }
    ));

    assert_eq!(
        env.service
            .create_conversation(&alice_id, None, false, &[UserId::new()])
            .unwrap_err(),
        ChatError::NotFound(Entity::User)
    );

    // The creator is included implicitly.
    let conversation = env
        .service
        .create_conversation(&alice_id, Some("pair"), false, &[bob.user_id])
        .unwrap();
    let page = env
        .service
        .list_conversations(&alice_id, &PageRequest::default())
        .unwrap();
    assert_eq!(page.items[0].participant_count, 2);
    assert_eq!(conversation.created_by, alice.user_id);
}

#[test]
fn rename_and_delete_conversation() {
    let env = env();
    let (alice_id, bob_id, conversation) = two_person_conversation(&env.service);

    let renamed = env
        .service
        .rename_conversation(&bob_id, conversation.conversation_id, Some("renamed"))
        .unwrap();
    assert_eq!(renamed.title.as_deref(), Some("renamed"));

    env.service
        .send_message(&alice_id, conversation.conversation_id, "bye", None)
        .unwrap();
    env.service
        .delete_conversation(&bob_id, conversation.conversation_id)
        .unwrap();

    assert_eq!(
        env.service
            .get_conversation(&alice_id, conversation.conversation_id)
            .unwrap_err(),
        ChatError::NotFound(Entity::Conversation)
    );
    assert!(env
        .service
        .list_conversations(&alice_id, &PageRequest::default())
        .unwrap()
        .items
        .is_empty());
}

mod common;

use common::*;
use palaver_chat_lib::{
    ChatError, DenyReason, Entity, MessageFilter, PageRequest, SortOrder, MAX_CONTENT_CHARS,
};

#[test]
fn send_then_list_round_trip_bumps_conversation() {
    let env = env();
    let (alice_id, _bob_id, conversation) = two_person_conversation(&env.service);

    env.service
        .send_message(&alice_id, conversation.conversation_id, "first", None)
        .unwrap();
    tick();
    let sent = env
        .service
        .send_message(&alice_id, conversation.conversation_id, "second", None)
        .unwrap();

    let page = env
        .service
        .list_messages(
            &alice_id,
            conversation.conversation_id,
            &MessageFilter::default(),
            SortOrder::Ascending,
            &PageRequest::default(),
        )
        .unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.items.last().unwrap().message_id, sent.message_id);

    let refreshed = env
        .service
        .get_conversation(&alice_id, conversation.conversation_id)
        .unwrap();
    assert!(refreshed.updated_at >= conversation.updated_at);
    assert_eq!(refreshed.updated_at, sent.created_at);
}

#[test]
fn non_participant_send_is_rejected_and_persists_nothing() {
    let env = env();
    let (alice_id, _bob_id, conversation) = two_person_conversation(&env.service);
    let (_carol, carol_id) = register(&env.service, "carol");

    assert_eq!(
        env.service
            .send_message(&carol_id, conversation.conversation_id, "let me in", None)
            .unwrap_err(),
        ChatError::Forbidden(DenyReason::NotParticipant)
    );

    let page = env
        .service
        .list_messages(
            &alice_id,
            conversation.conversation_id,
            &MessageFilter::default(),
            SortOrder::Ascending,
            &PageRequest::default(),
        )
        .unwrap();
    assert_eq!(page.total, 0);
}

#[test]
fn content_is_trimmed_and_validated() {
    let env = env();
    let (alice_id, _bob_id, conversation) = two_person_conversation(&env.service);

    let sent = env
        .service
        .send_message(&alice_id, conversation.conversation_id, "  padded  ", None)
        .unwrap();
    assert_eq!(sent.content, "padded");

    assert!(matches!(
        env.service
            .send_message(&alice_id, conversation.conversation_id, "   ", None)
            .unwrap_err(),
        ChatError::ValidationFailed { field: "content", .. }
    ));

    let too_long = "x".repeat(MAX_CONTENT_CHARS + 1);
    assert!(matches!(
        env.service
            .send_message(&alice_id, conversation.conversation_id, &too_long, None)
            .unwrap_err(),
        ChatError::ValidationFailed { field: "content", .. }
    ));
}

#[test]
fn replies_stay_within_their_conversation() {
    let env = env();
    let (alice_id, bob_id, conversation) = two_person_conversation(&env.service);
    let other = env
        .service
        .create_conversation(&alice_id, None, false, &[alice_id.user_id, bob_id.user_id])
        .unwrap();

    let parent = env
        .service
        .send_message(&alice_id, conversation.conversation_id, "parent", None)
        .unwrap();

    let reply = env
        .service
        .send_message(
            &bob_id,
            conversation.conversation_id,
            "child",
            Some(parent.message_id),
        )
        .unwrap();
    assert_eq!(reply.reply_to, Some(parent.message_id));

    // Same message id from another conversation is a validation error.
    assert!(matches!(
        env.service
            .send_message(
                &bob_id,
                other.conversation_id,
                "cross",
                Some(parent.message_id),
            )
            .unwrap_err(),
        ChatError::ValidationFailed { field: "reply_to", .. }
    ));

    // Missing pointee is NotFound.
    assert_eq!(
        env.service
            .send_message(
                &bob_id,
                conversation.conversation_id,
                "dangling",
                Some(palaver_chat_lib::MessageId::new()),
            )
            .unwrap_err(),
        ChatError::NotFound(Entity::Message)
    );
}

#[test]
fn deleting_a_message_clears_dependent_replies() {
    let env = env();
    let (alice_id, bob_id, conversation) = two_person_conversation(&env.service);

    let parent = env
        .service
        .send_message(&alice_id, conversation.conversation_id, "parent", None)
        .unwrap();
    let reply = env
        .service
        .send_message(
            &bob_id,
            conversation.conversation_id,
            "child",
            Some(parent.message_id),
        )
        .unwrap();

    env.service
        .delete_message(&alice_id, parent.message_id)
        .unwrap();

    let reply = env.service.get_message(&bob_id, reply.message_id).unwrap();
    assert_eq!(reply.reply_to, None);
    assert_eq!(
        env.service
            .get_message(&bob_id, parent.message_id)
            .unwrap_err(),
        ChatError::NotFound(Entity::Message)
    );
}

#[test]
fn edit_sets_flags_and_keeps_created_at() {
    let env = env();
    let (alice_id, bob_id, conversation) = two_person_conversation(&env.service);

    let sent = env
        .service
        .send_message(&alice_id, conversation.conversation_id, "draft", None)
        .unwrap();

    // A fellow participant cannot edit someone else's message.
    assert_eq!(
        env.service
            .edit_message(&bob_id, sent.message_id, "hijacked")
            .unwrap_err(),
        ChatError::Forbidden(DenyReason::NotSender)
    );

    let edited = env
        .service
        .edit_message(&alice_id, sent.message_id, "final")
        .unwrap();
    assert_eq!(edited.content, "final");
    assert!(edited.is_edited);
    assert!(edited.edited_at.is_some());
    assert_eq!(edited.created_at, sent.created_at);

    let reloaded = env.service.get_message(&bob_id, sent.message_id).unwrap();
    assert_eq!(reloaded, edited);
}

#[test]
fn message_listing_orders_and_filters() {
    let env = env();
    let (alice_id, bob_id, conversation) = two_person_conversation(&env.service);

    for text in ["one", "two", "three"] {
        env.service
            .send_message(&alice_id, conversation.conversation_id, text, None)
            .unwrap();
        tick();
    }
    env.service
        .send_message(&bob_id, conversation.conversation_id, "four", None)
        .unwrap();

    let ascending = env
        .service
        .list_messages(
            &alice_id,
            conversation.conversation_id,
            &MessageFilter::default(),
            SortOrder::Ascending,
            &PageRequest::default(),
        )
        .unwrap();
    let contents: Vec<_> = ascending.items.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, ["one", "two", "three", "four"]);

    let descending = env
        .service
        .list_messages(
            &alice_id,
            conversation.conversation_id,
            &MessageFilter::default(),
            SortOrder::Descending,
            &PageRequest::default(),
        )
        .unwrap();
    assert_eq!(descending.items.first().unwrap().content, "four");

    let from_bob = env
        .service
        .list_messages(
            &alice_id,
            conversation.conversation_id,
            &MessageFilter {
                sender: Some(bob_id.user_id),
                ..MessageFilter::default()
            },
            SortOrder::Ascending,
            &PageRequest::default(),
        )
        .unwrap();
    assert_eq!(from_bob.total, 1);
    assert_eq!(from_bob.items[0].content, "four");

    let matching = env
        .service
        .list_messages(
            &alice_id,
            conversation.conversation_id,
            &MessageFilter {
                content_contains: Some("t".to_string()),
                ..MessageFilter::default()
            },
            SortOrder::Ascending,
            &PageRequest::default(),
        )
        .unwrap();
    let contents: Vec<_> = matching.items.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, ["two", "three"]);
}

#[test]
fn pagination_is_stable_across_pages() {
    let env = env();
    let (alice_id, _bob_id, conversation) = two_person_conversation(&env.service);

    for i in 0..5 {
        env.service
            .send_message(
                &alice_id,
                conversation.conversation_id,
                &format!("msg {i}"),
                None,
            )
            .unwrap();
    }

    let full = env
        .service
        .list_messages(
            &alice_id,
            conversation.conversation_id,
            &MessageFilter::default(),
            SortOrder::Ascending,
            &PageRequest::default(),
        )
        .unwrap();

    let mut paged = Vec::new();
    for offset in [0u64, 2, 4] {
        let page = env
            .service
            .list_messages(
                &alice_id,
                conversation.conversation_id,
                &MessageFilter::default(),
                SortOrder::Ascending,
                &PageRequest::new(2, offset),
            )
            .unwrap();
        assert_eq!(page.total, 5);
        paged.extend(page.items);
    }
    assert_eq!(paged, full.items);
}

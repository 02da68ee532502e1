//! Authorization and query-shaping core for a conversation/message store.
//!
//! The crate decides who may see or mutate which conversations and
//! messages, builds the access-scoped listing queries (last message,
//! unread set, pagination), and applies writes atomically over a pooled
//! SQLite store. Identity arrives pre-authenticated from an external
//! collaborator; transport and serialization live in a boundary layer on
//! top of [`ChatService`].

pub mod libs;

pub use libs::core::authorization::AuthorizationEngine;
pub use libs::core::models::{
    AccessPolicy, Action, ConversationId, DeletePolicy, Identity, MessageFilter, MessageId, Page,
    PageRequest, ParticipantPolicy, ResourceRef, Role, SortOrder, UserId, DEFAULT_PAGE_SIZE,
    MAX_PAGE_SIZE,
};
pub use libs::core::mutation::MAX_CONTENT_CHARS;
pub use libs::error::{ChatError, DenyReason, Entity};
pub use libs::service::ChatService;
pub use libs::storage::records::{
    ConversationRecord, ConversationSummary, LastMessage, MessageRecord, ParticipantRecord,
    ReadReceiptRecord, UserRecord,
};
pub use libs::storage::storage_traits::{
    ConversationStore, EntityStore, MessageStore, ParticipantStore, ReceiptStore, Storage,
    StoreError, Transactional, UserStore,
};

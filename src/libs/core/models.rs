use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Default page size when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 50;
/// Hard ceiling on a single page, whatever the caller asks for.
pub const MAX_PAGE_SIZE: u32 = 200;

macro_rules! uuid_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub Uuid);

        impl $name {
            /// Mints a fresh time-ordered (v7) id.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(UserId);
uuid_id!(ConversationId);
uuid_id!(MessageId);

/// Global user role. Conversation-scoped admin rights live on the
/// participant row, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Guest,
    Host,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::Host => "host",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "guest" => Some(Role::Guest),
            "host" => Some(Role::Host),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Authenticated principal, supplied by the external auth collaborator.
/// The core trusts it verbatim for the duration of one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
    pub is_active: bool,
}

/// The operations the authorization engine adjudicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ReadConversation,
    UpdateConversation,
    DeleteConversation,
    ReadMessage,
    UpdateMessage,
    DeleteMessage,
    CreateMessage,
    AddParticipant,
    RemoveParticipant,
}

/// Tagged reference to the resource an action targets. Each variant carries
/// exactly what authorization needs to resolve the check, so the engine
/// never inspects runtime types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceRef {
    Conversation(ConversationId),
    Message(MessageId),
}

/// Who may delete a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeletePolicy {
    #[default]
    AnyParticipant,
    CreatorOnly,
}

/// Who may add or remove participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParticipantPolicy {
    #[default]
    AnyParticipant,
    ConversationAdmin,
}

/// Configurable policy knobs for the authorization engine. Defaults match
/// the documented baseline: any active participant may delete the
/// conversation or manage its membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccessPolicy {
    pub delete_conversation: DeletePolicy,
    pub manage_participants: ParticipantPolicy,
}

/// Explicit, named message ordering. `Ascending` (oldest first) is the
/// default and is what a conversation detail view wants; `Descending` gives
/// a latest-first feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub(crate) fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

/// Offset/limit pagination. Ties on the primary sort key are always broken
/// by id, so pages stay stable across calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u32,
    pub offset: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl PageRequest {
    pub fn new(limit: u32, offset: u64) -> Self {
        Self { limit, offset }
    }

    /// Clamped (limit, offset) pair suitable for SQL binding.
    pub(crate) fn bounds(&self) -> (i64, i64) {
        let limit = self.limit.clamp(1, MAX_PAGE_SIZE);
        (limit as i64, self.offset as i64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub limit: u32,
    pub offset: u64,
}

/// Caller-supplied narrowing of a message listing. Applied only after the
/// listing has been scoped to a conversation the caller participates in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageFilter {
    pub sender: Option<UserId>,
    pub sent_after: Option<DateTime<Utc>>,
    pub sent_before: Option<DateTime<Utc>>,
    pub content_contains: Option<String>,
}

use crate::libs::storage::storage_traits::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why an authorization check denied an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenyReason {
    NotParticipant,
    NotSender,
    InactiveParticipant,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DenyReason::NotParticipant => write!(f, "not a participant of the conversation"),
            DenyReason::NotSender => write!(f, "not the sender of the message"),
            DenyReason::InactiveParticipant => write!(f, "participant has left the conversation"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    User,
    Conversation,
    Message,
    Participant,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Entity::User => write!(f, "user"),
            Entity::Conversation => write!(f, "conversation"),
            Entity::Message => write!(f, "message"),
            Entity::Participant => write!(f, "participant"),
        }
    }
}

/// The crate-wide error taxonomy. Every operation returns one of these;
/// the boundary layer maps variants to transport status codes. A denied
/// authorization is always a `Forbidden`, never an empty result.
#[derive(Debug, Error, PartialEq)]
pub enum ChatError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("forbidden: {0}")]
    Forbidden(DenyReason),
    #[error("{0} not found")]
    NotFound(Entity),
    #[error("validation failed on `{field}`: {rule}")]
    ValidationFailed { field: &'static str, rule: String },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<StoreError> for ChatError {
    fn from(err: StoreError) -> Self {
        match err {
            // Unique-constraint races the coordinator cannot pre-empt.
            StoreError::Constraint(msg) => ChatError::Conflict(msg),
            other => ChatError::StoreUnavailable(other.to_string()),
        }
    }
}

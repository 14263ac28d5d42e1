//! Training records and their validation.
//!
//! A record is valid when it has only `system` and `messages` at the top
//! level, `system` (if present) is a string, and `messages` holds at least
//! two `{role, content}` turns that start with `user`, end with `assistant`
//! and alternate in between.

use super::common::{Message, Role};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

const SYSTEM_FIELD: &str = "system";
const MESSAGES_FIELD: &str = "messages";
const ROLE_FIELD: &str = "role";
const CONTENT_FIELD: &str = "content";

/// Minimum number of turns in a record.
pub const MIN_MESSAGES: usize = 2;

/// A validated training example.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct TrainingRecord {
    /// Optional system instruction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Alternating user/assistant turns.
    pub messages: Vec<Message>,
}

impl TrainingRecord {
    /// Build and validate a record from parts.
    pub fn new(system: Option<String>, messages: Vec<Message>) -> Result<Self, RecordError> {
        check_turns(messages.iter().map(|m| m.role))?;
        Ok(Self { system, messages })
    }

    /// Decode one dataset line and validate it.
    pub fn from_json_line(line: &str) -> Result<Self, RecordDecodeError> {
        let value: Value = serde_json::from_str(line)
            .map_err(|e| RecordDecodeError::Malformed(e.to_string()))?;
        Ok(validate_record(&value)?)
    }

    /// Encode as a single dataset line (no trailing newline).
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Roles in order.
    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.messages.iter().map(|m| m.role)
    }
}

impl TryFrom<Value> for TrainingRecord {
    type Error = RecordError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        validate_record(&value)
    }
}

/// A named violation of the training record contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// The line is JSON but not an object.
    #[error("record is not a JSON object")]
    NotAnObject,

    /// A top-level key other than `system` / `messages`.
    #[error("unexpected top-level field '{field}'")]
    UnknownField {
        /// The offending key.
        field: String,
    },

    /// `system` is present but not a string.
    #[error("'system' must be a string")]
    InvalidSystem,

    /// `messages` is absent.
    #[error("missing 'messages'")]
    MissingMessages,

    /// `messages` is not an array.
    #[error("'messages' must be an array")]
    MessagesNotArray,

    /// Fewer than two turns.
    #[error("'messages' must contain at least {MIN_MESSAGES} turns, found {count}")]
    TooFewMessages {
        /// Number of turns found.
        count: usize,
    },

    /// A turn that is not an object.
    #[error("message {index} is not a JSON object")]
    MessageNotObject {
        /// 0-based turn index.
        index: usize,
    },

    /// A turn key other than `role` / `content`.
    #[error("message {index} has unexpected field '{field}'")]
    UnknownMessageField {
        /// 0-based turn index.
        index: usize,
        /// The offending key.
        field: String,
    },

    /// A turn without `role`.
    #[error("message {index} is missing 'role'")]
    MissingRole {
        /// 0-based turn index.
        index: usize,
    },

    /// A role other than `user` / `assistant`.
    #[error("message {index} has invalid role '{role}'")]
    InvalidRole {
        /// 0-based turn index.
        index: usize,
        /// The rejected role (JSON text if it was not a string).
        role: String,
    },

    /// A turn without `content`.
    #[error("message {index} is missing 'content'")]
    MissingContent {
        /// 0-based turn index.
        index: usize,
    },

    /// `content` is not a string.
    #[error("message {index} 'content' must be a string")]
    InvalidContent {
        /// 0-based turn index.
        index: usize,
    },

    /// The first turn is not from the user.
    #[error("first message must have role 'user'")]
    FirstNotUser,

    /// The last turn is not from the assistant.
    #[error("last message must have role 'assistant'")]
    LastNotAssistant,

    /// Two consecutive turns share a role.
    #[error("message {index} repeats role of the previous message; roles must alternate")]
    NotAlternating {
        /// 0-based index of the second turn of the pair.
        index: usize,
    },
}

/// Failure decoding a single dataset line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordDecodeError {
    /// The line is not JSON.
    #[error("malformed JSON: {0}")]
    Malformed(String),

    /// The line is JSON but not a valid record.
    #[error(transparent)]
    Invalid(#[from] RecordError),
}

/// Validate a decoded JSON value as a training record.
///
/// Pure: no I/O, and the first violated rule is reported.
pub fn validate_record(value: &Value) -> Result<TrainingRecord, RecordError> {
    let object = value.as_object().ok_or(RecordError::NotAnObject)?;

    if let Some(field) = object
        .keys()
        .find(|k| k.as_str() != SYSTEM_FIELD && k.as_str() != MESSAGES_FIELD)
    {
        return Err(RecordError::UnknownField {
            field: field.clone(),
        });
    }

    let system = match object.get(SYSTEM_FIELD) {
        None => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => return Err(RecordError::InvalidSystem),
    };

    let raw_messages = object
        .get(MESSAGES_FIELD)
        .ok_or(RecordError::MissingMessages)?
        .as_array()
        .ok_or(RecordError::MessagesNotArray)?;

    let messages = raw_messages
        .iter()
        .enumerate()
        .map(|(index, raw)| validate_message(index, raw))
        .collect::<Result<Vec<_>, _>>()?;

    check_turns(messages.iter().map(|m| m.role))?;

    Ok(TrainingRecord { system, messages })
}

fn validate_message(index: usize, value: &Value) -> Result<Message, RecordError> {
    let object: &Map<String, Value> = value
        .as_object()
        .ok_or(RecordError::MessageNotObject { index })?;

    if let Some(field) = object
        .keys()
        .find(|k| k.as_str() != ROLE_FIELD && k.as_str() != CONTENT_FIELD)
    {
        return Err(RecordError::UnknownMessageField {
            index,
            field: field.clone(),
        });
    }

    let role = match object.get(ROLE_FIELD) {
        None => return Err(RecordError::MissingRole { index }),
        Some(Value::String(s)) => s
            .parse::<Role>()
            .map_err(|role| RecordError::InvalidRole { index, role })?,
        Some(other) => {
            return Err(RecordError::InvalidRole {
                index,
                role: other.to_string(),
            })
        }
    };

    let content = match object.get(CONTENT_FIELD) {
        None => return Err(RecordError::MissingContent { index }),
        Some(Value::String(s)) => s.clone(),
        Some(_) => return Err(RecordError::InvalidContent { index }),
    };

    Ok(Message { role, content })
}

/// Check the ordering rules over a role sequence.
fn check_turns(roles: impl ExactSizeIterator<Item = Role>) -> Result<(), RecordError> {
    let count = roles.len();
    if count < MIN_MESSAGES {
        return Err(RecordError::TooFewMessages { count });
    }

    let mut previous: Option<Role> = None;
    let mut last = Role::User;
    for (index, role) in roles.enumerate() {
        match previous {
            None if role != Role::User => return Err(RecordError::FirstNotUser),
            Some(prev) if prev == role => return Err(RecordError::NotAlternating { index }),
            _ => {}
        }
        previous = Some(role);
        last = role;
    }

    if last != Role::Assistant {
        return Err(RecordError::LastNotAssistant);
    }
    Ok(())
}

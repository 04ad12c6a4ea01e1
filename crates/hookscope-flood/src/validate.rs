use std::fmt;

use hookscope_types::{MESSAGE_TYPE, MessageId, QueryMessage};

use crate::seen::SeenIds;

/// Anything delivered to a context's message bus.
///
/// Other traffic shares the bus with queries, so raw payloads are accepted
/// and decoded here rather than at the sender.
#[derive(Debug, Clone)]
pub enum Inbound {
    Query(QueryMessage),
    Raw(Vec<u8>),
}

impl From<QueryMessage> for Inbound {
    fn from(message: QueryMessage) -> Self {
        Self::Query(message)
    }
}

/// A query that passed validation in this context.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidQuery {
    pub id: MessageId,
    pub message: QueryMessage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Empty,
    Undecodable(String),
    WrongType(String),
    MissingUid,
    ZeroUid,
    UidOutOfRange(u64),
    AlreadySeen(MessageId),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty payload"),
            Self::Undecodable(error) => write!(f, "payload is not a query envelope: {error}"),
            Self::WrongType(tag) => write!(f, "unexpected type tag {tag:?}"),
            Self::MissingUid => write!(f, "uid missing"),
            Self::ZeroUid => write!(f, "uid must be non-zero"),
            Self::UidOutOfRange(uid) => write!(f, "uid {uid} is outside the JS-safe range"),
            Self::AlreadySeen(id) => write!(f, "uid {id} already handled here"),
        }
    }
}

/// Accepts a payload iff it is a non-empty query envelope with the protocol
/// tag and a usable uid that this context has not handled yet.
///
/// Does not record the uid; the handler marks it once local processing is done.
pub fn validate(seen: &SeenIds, inbound: Inbound) -> Result<ValidQuery, Rejection> {
    let message = match inbound {
        Inbound::Query(message) => message,
        Inbound::Raw(bytes) => decode(&bytes)?,
    };
    if message.r#type != MESSAGE_TYPE {
        return Err(Rejection::WrongType(message.r#type));
    }
    let uid = message.uid.ok_or(Rejection::MissingUid)?;
    let id = MessageId::new(uid).map_err(|_| {
        if uid == 0 {
            Rejection::ZeroUid
        } else {
            Rejection::UidOutOfRange(uid)
        }
    })?;
    if seen.is_seen(id) {
        return Err(Rejection::AlreadySeen(id));
    }
    Ok(ValidQuery { id, message })
}

pub fn is_valid(seen: &SeenIds, inbound: Inbound) -> bool {
    validate(seen, inbound).is_ok()
}

fn decode(bytes: &[u8]) -> Result<QueryMessage, Rejection> {
    let trimmed = bytes.trim_ascii();
    if trimmed.is_empty() || trimmed == b"null" {
        return Err(Rejection::Empty);
    }
    facet_json::from_slice(trimmed).map_err(|error| Rejection::Undecodable(error.to_string()))
}

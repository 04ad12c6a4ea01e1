use facet::Facet;

use crate::MessageId;

/// Type tag carried by every query envelope.
pub const MESSAGE_TYPE: &str = "application/x-hook-search-v1+json";

/// Query envelope exchanged between contexts.
///
/// Forwarded unchanged by every context that accepts it; `uid` is what the
/// per-context seen set keys on.
#[derive(Facet, Debug, Clone, PartialEq)]
pub struct QueryMessage {
    /// Protocol tag, must equal [`MESSAGE_TYPE`].
    pub r#type: String,

    /// Flood identifier. Optional on the wire so foreign payloads still decode
    /// and get rejected at validation instead.
    pub uid: Option<u64>,

    /// Record field to search. Travels as `fieldName`.
    #[facet(rename = "fieldName")]
    pub field_name: String,

    /// What the field must match.
    pub pattern: SearchPattern,
}

impl QueryMessage {
    pub fn new(uid: MessageId, field_name: impl Into<String>, pattern: SearchPattern) -> Self {
        Self {
            r#type: MESSAGE_TYPE.to_string(),
            uid: Some(uid.get()),
            field_name: field_name.into(),
            pattern,
        }
    }
}

/// Exact literal or regular expression, tested against the string form of a
/// record field.
#[derive(Facet, Debug, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
#[facet(rename_all = "snake_case")]
pub enum SearchPattern {
    Literal(String),
    Regex(String),
}

impl SearchPattern {
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    pub fn regex(source: impl Into<String>) -> Self {
        Self::Regex(source.into())
    }

    pub fn is_regex(&self) -> bool {
        matches!(self, Self::Regex(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Literal(value) | Self::Regex(value) => value,
        }
    }
}

impl From<&str> for SearchPattern {
    fn from(value: &str) -> Self {
        Self::Literal(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_message_carries_protocol_tag() {
        let uid = MessageId::new(42).expect("non-zero id");
        let message = QueryMessage::new(uid, "value", SearchPattern::literal("5"));
        assert_eq!(message.r#type, MESSAGE_TYPE);
        assert_eq!(message.uid, Some(42));
        assert_eq!(message.field_name, "value");
    }

    #[test]
    fn message_survives_json_transport() {
        let uid = MessageId::new(1_700_000_000_123).expect("non-zero id");
        let message = QueryMessage::new(uid, "name", SearchPattern::regex("^c"));
        let json = facet_json::to_string(&message).expect("message should encode");
        let decoded: QueryMessage = facet_json::from_str(&json).expect("message should decode");
        assert_eq!(decoded, message);
        assert!(decoded.pattern.is_regex());
        assert_eq!(decoded.pattern.as_str(), "^c");
    }

    #[test]
    fn field_name_travels_camel_cased() {
        let json = format!(
            r#"{{"type":"{MESSAGE_TYPE}","uid":7,"fieldName":"name","pattern":{{"literal":"count"}}}}"#
        );
        let decoded: QueryMessage = facet_json::from_str(&json).expect("envelope should decode");
        assert_eq!(decoded.field_name, "name");
        assert_eq!(decoded.uid, Some(7));
        assert_eq!(decoded.pattern, SearchPattern::literal("count"));

        let encoded = facet_json::to_string(&decoded).expect("envelope should encode");
        assert!(encoded.contains(r#""fieldName":"name""#), "{encoded}");
    }
}

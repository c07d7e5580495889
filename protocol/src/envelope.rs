//! The JSON envelope every packet, in either direction, is carried in.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A raw `{name, data}` packet as it arrives on (or is sent over) the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Packet name, e.g. `onMoveRequest` or its bare alias `moveRequest`.
    pub name: String,
    /// Packet-specific payload, deserialized by the handler for `name`.
    #[serde(default = "default_data")]
    pub data: Value,
}

fn default_data() -> Value {
    Value::Null
}

impl Envelope {
    /// Builds an outgoing envelope from any serializable payload.
    pub fn new(name: impl Into<String>, data: impl Serialize) -> Self {
        Envelope {
            name: name.into(),
            data: serde_json::to_value(data).unwrap_or(Value::Null),
        }
    }

    /// Strips a leading `on` prefix so callers can match packet names
    /// regardless of whether the client used the bare or `on`-prefixed form.
    pub fn canonical_name(&self) -> String {
        canonicalize(&self.name)
    }
}

/// Both `moveRequest` and `onMoveRequest` resolve to the same handler; this
/// returns the bare, lower-camel-case form used as the router's lookup key.
pub fn canonicalize(name: &str) -> String {
    if let Some(rest) = name.strip_prefix("on")
        && rest.starts_with(|c: char| c.is_ascii_uppercase())
    {
        let mut chars = rest.chars();
        let first = chars.next().unwrap().to_ascii_lowercase();
        return format!("{first}{}", chars.as_str());
    }
    name.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalizes_on_prefixed_names() {
        assert_eq!(canonicalize("onMoveRequest"), "moveRequest");
        assert_eq!(canonicalize("moveRequest"), "moveRequest");
        assert_eq!(canonicalize("onion"), "onion");
    }

    #[test]
    fn round_trips_through_json() {
        let env = Envelope::new("onMoveRequest", serde_json::json!({"x": 1, "z": 2}));
        let json = serde_json::to_string(&env).unwrap();
        let parsed: Envelope = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.name, "onMoveRequest");
    }
}

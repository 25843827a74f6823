use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Backend identifiers arrive either as JSON strings or as bare integers.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                RawId::deserialize(deserializer).map(|raw| Self(raw.into_string()))
            }
        }
    };
}

define_id!(
    /// Treasure-hunt post or quest post id.
    EntityId
);
define_id!(
    /// Backend play-record id (one per player and entity).
    PlayRecordId
);
define_id!(
    /// Opaque quest-play handle correlating the device with the server's step cursor.
    SessionHandle
);
define_id!(ActionPointId);
define_id!(LocationId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_accept_numeric_json() {
        let id: EntityId = serde_json::from_str("42").unwrap();
        assert_eq!(id.as_str(), "42");

        let id: EntityId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(id, EntityId::from("abc"));
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let handle = SessionHandle::new("s-1");
        assert_eq!(serde_json::to_string(&handle).unwrap(), "\"s-1\"");
    }
}

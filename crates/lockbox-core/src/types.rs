//! Strong type definitions for Lockbox identifiers.
//!
//! All identifiers are newtypes to prevent misuse at compile time: a
//! `RecordId` can never be passed where a `ClientId` is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::CoreError;

macro_rules! uuid_newtype {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a new random identifier.
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the underlying UUID.
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0.hyphenated())
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|e| CoreError::InvalidId(format!("{s}: {e}")))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

uuid_newtype!(
    /// Identifier of a registered client (an identity that reads and writes).
    ClientId
);

uuid_newtype!(
    /// Identifier of a stored record, assigned by the service.
    RecordId
);

uuid_newtype!(
    /// Optimistic-concurrency token of a record.
    ///
    /// Assigned by the service on every successful mutating write. Callers
    /// only ever echo back a version they read.
    Version
);

/// The type tag of a record.
///
/// Access keys are scoped to (writer, type), so the type is the unit of
/// sharing. Types are arbitrary non-empty strings without `/`, since they
/// appear as a path segment in access-key addresses.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordType(String);

impl RecordType {
    /// Create a record type, validating its shape.
    pub fn new(name: impl Into<String>) -> Result<Self, CoreError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(CoreError::InvalidRecordType("type must not be empty".into()));
        }
        if name.contains('/') {
            return Err(CoreError::InvalidRecordType(format!(
                "type must not contain '/': {name}"
            )));
        }
        Ok(Self(name))
    }

    /// Get the type name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordType({})", self.0)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RecordType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RecordType {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RecordType> for String {
    fn from(t: RecordType) -> Self {
        t.0
    }
}

impl AsRef<str> for RecordType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The kind of resource a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A registered client identity.
    Client,
    /// A stored record.
    Record,
    /// An encrypted access key addressed to the caller.
    AccessKey,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Client => "CLIENT",
            Self::Record => "RECORD",
            Self::AccessKey => "ACCESS KEY",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_id_string_roundtrip() {
        let id = ClientId::generate();
        let parsed: ClientId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_record_id_rejects_garbage() {
        let err = "not-a-uuid".parse::<RecordId>().unwrap_err();
        assert!(matches!(err, CoreError::InvalidId(_)));
    }

    #[test]
    fn test_ids_serialize_as_plain_strings() {
        let id = RecordId::from_uuid(Uuid::nil());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"00000000-0000-0000-0000-000000000000\"");
    }

    #[test]
    fn test_record_type_validation() {
        assert!(RecordType::new("contact").is_ok());
        assert!(RecordType::new("").is_err());
        assert!(RecordType::new("   ").is_err());
        assert!(RecordType::new("a/b").is_err());
    }

    #[test]
    fn test_record_type_deserialize_validates() {
        let ok: RecordType = serde_json::from_str("\"note\"").unwrap();
        assert_eq!(ok.as_str(), "note");
        assert!(serde_json::from_str::<RecordType>("\"\"").is_err());
    }

    #[test]
    fn test_resource_kind_display() {
        assert_eq!(ResourceKind::AccessKey.to_string(), "ACCESS KEY");
        assert_eq!(ResourceKind::Record.to_string(), "RECORD");
    }
}

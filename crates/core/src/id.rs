// SPDX-License-Identifier: MIT

//! UUID-backed entity identifiers.
//!
//! All domain entities are identified by a v4 UUID (per the data model's
//! requirement that identifiers are UUIDs). [`define_uuid_id!`] generates a
//! newtype wrapper per entity so `JobId` and `TaskId` can't be swapped at a
//! call site by accident, the same way the upstream `define_id!` macro kept
//! string-backed IDs from different entities from being interchangeable.

/// Error returned when parsing an ID from a string that isn't a valid UUID.
#[derive(Debug, thiserror::Error)]
#[error("invalid id {0:?}: not a UUID")]
pub struct InvalidId(pub String);

/// Define a UUID-backed newtype ID wrapper.
///
/// Generates `new()` (random v4), `from_uuid()`, `parse()`, `as_uuid()`,
/// `Display`, `FromStr`, `From<Uuid>`, `Serialize`/`Deserialize` (as a plain
/// UUID string, matching how the type is stored and sent over the wire).
///
/// ```ignore
/// define_uuid_id! {
///     /// Unique identifier for a job.
///     pub struct JobId;
/// }
/// ```
#[macro_export]
macro_rules! define_uuid_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub uuid::Uuid);

        impl $name {
            /// Generate a new random (v4) id.
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub fn from_uuid(id: uuid::Uuid) -> Self {
                Self(id)
            }

            /// Parse an id from its canonical hyphenated string form.
            pub fn parse(s: &str) -> Result<Self, $crate::id::InvalidId> {
                uuid::Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|_| $crate::id::InvalidId(s.to_string()))
            }

            pub fn as_uuid(&self) -> uuid::Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::id::InvalidId;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl From<uuid::Uuid> for $name {
            fn from(id: uuid::Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for uuid::Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                self.0.serialize(serializer)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                uuid::Uuid::deserialize(deserializer).map(Self)
            }
        }
    };
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;

//! Newtype IDs.
//!
//! Product ids come from the backend; order ids are only ever echoed back,
//! so neither is generated locally.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($name:ident) => {
        /// An identifier assigned by the backend.
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from a string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner string.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(ProductId);
define_id!(OrderId);
define_id!(UserId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_from_str() {
        let id: ProductId = "kale-01".into();
        assert_eq!(id.as_str(), "kale-01");
        assert_eq!(id.to_string(), "kale-01");
    }

    #[test]
    fn test_id_serializes_as_plain_string() {
        let id = OrderId::new("ord-7");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"ord-7\"");
        let back: OrderId = serde_json::from_str("\"ord-7\"").unwrap();
        assert_eq!(back, id);
    }
}

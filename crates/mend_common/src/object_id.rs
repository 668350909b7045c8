//! Opaque record identifiers as they appear in the manifest text.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// The identifier of one manifest record (file reference, build file, or phase).
///
/// Ids are opaque tokens copied verbatim from the manifest (conventionally 24
/// upper-case hex digits, but any bare word is accepted). Equality is exact
/// and case-sensitive.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    /// Number of hex digits in an engine-generated id.
    pub const GENERATED_LEN: usize = 24;

    /// Creates an id from any token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the token has the shape of an engine-generated id.
    pub fn is_canonical_hex(&self) -> bool {
        self.0.len() == Self::GENERATED_LEN
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.0)
    }
}

impl Borrow<str> for ObjectId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ObjectId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ObjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn display_is_raw_token() {
        let id = ObjectId::new("807C8C322EC1897400F7AE37");
        assert_eq!(id.to_string(), "807C8C322EC1897400F7AE37");
        assert_eq!(format!("{id:?}"), "ObjectId(807C8C322EC1897400F7AE37)");
    }

    #[test]
    fn canonical_hex_shape() {
        assert!(ObjectId::new("807C8C322EC1897400F7AE37").is_canonical_hex());
        assert!(!ObjectId::new("AAA1").is_canonical_hex());
        assert!(!ObjectId::new("807c8c322ec1897400f7ae37").is_canonical_hex());
    }

    #[test]
    fn lookup_by_str_in_sets() {
        let mut set = BTreeSet::new();
        set.insert(ObjectId::from("AAA1"));
        assert!(set.contains("AAA1"));
        assert!(!set.contains("AAA2"));
    }

    #[test]
    fn serde_is_transparent() {
        let id = ObjectId::from("AAA1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"AAA1\"");
        let back: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}

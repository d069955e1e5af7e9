//! Canonical LinkedIn resource references (`urn:li:<kind>:<id>`).
//!
//! A [`Urn`] can only be obtained through the constructors in this module,
//! so every reference that reaches a request path or body has been through
//! the same normalization rule.

use std::fmt;

/// Prefix shared by every canonical reference.
pub const URN_PREFIX: &str = "urn:li:";

/// Resource kinds this crate builds references for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrnKind {
    Person,
    UgcPost,
}

impl UrnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrnKind::Person => "person",
            UrnKind::UgcPost => "ugcPost",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Urn(String);

impl Urn {
    /// Normalize a caller-supplied post reference.
    ///
    /// Input already in canonical form is kept verbatim (whatever its kind);
    /// a bare id is wrapped as a `ugcPost` reference. Normalizing an
    /// already-normalized value is a no-op.
    pub fn normalize(raw: &str) -> Self {
        Self::normalize_as(raw, UrnKind::UgcPost)
    }

    /// Same rule as [`Urn::normalize`] with an explicit kind for bare ids.
    pub fn normalize_as(raw: &str, kind: UrnKind) -> Self {
        if raw.starts_with(URN_PREFIX) {
            Urn(raw.to_string())
        } else {
            Urn(format!("{}{}:{}", URN_PREFIX, kind.as_str(), raw))
        }
    }

    /// Reference for the authorized member.
    pub fn person(subject_id: &str) -> Self {
        Self::normalize_as(subject_id, UrnKind::Person)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Percent-encoded form for use as a single path segment.
    pub fn encoded(&self) -> String {
        urlencoding::encode(&self.0).into_owned()
    }
}

impl fmt::Display for Urn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Urn {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for Urn {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_id_becomes_ugc_post() {
        assert_eq!(Urn::normalize("789").as_str(), "urn:li:ugcPost:789");
    }

    #[test]
    fn test_canonical_reference_passes_through() {
        assert_eq!(Urn::normalize("urn:li:share:789").as_str(), "urn:li:share:789");
        assert_eq!(
            Urn::normalize("urn:li:ugcPost:7012345678901234567").as_str(),
            "urn:li:ugcPost:7012345678901234567"
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            "789",
            "",
            "urn:li:share:1",
            "urn:li:ugcPost:2",
            "urn:li:",
            "urn:other:3",
            "URN:LI:share:4",
            " 5 ",
        ];
        for raw in inputs {
            let once = Urn::normalize(raw);
            let twice = Urn::normalize(once.as_str());
            assert_eq!(once, twice, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn test_person_reference() {
        assert_eq!(Urn::person("42").as_str(), "urn:li:person:42");
        assert_eq!(Urn::person("urn:li:person:42").as_str(), "urn:li:person:42");
    }

    #[test]
    fn test_encoded_escapes_colons() {
        assert_eq!(Urn::normalize("789").encoded(), "urn%3Ali%3AugcPost%3A789");
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let json = serde_json::to_string(&Urn::person("42")).unwrap();
        assert_eq!(json, r#""urn:li:person:42""#);
    }
}

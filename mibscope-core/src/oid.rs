//! OID addressing: the hierarchical key space of the MIB tree.
//!
//! An OID is an ordered list of arcs written as dotted text
//! (`1.3.6.1.4.1.9999.1.3.0`). Parsing is strict so that
//! `Oid::parse(&oid.to_text())` always gives back the same OID and
//! `oid.to_text()` always gives back the text that was parsed.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Write};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OidError {
    #[error("malformed OID '{input}': {reason}")]
    Malformed { input: String, reason: &'static str },
}

impl OidError {
    fn malformed(input: &str, reason: &'static str) -> Self {
        OidError::Malformed {
            input: input.to_string(),
            reason,
        }
    }
}

/// A numeric object identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Oid {
    arcs: Vec<u32>,
}

impl Oid {
    /// Build an OID from arcs. Callers are responsible for not passing an
    /// empty vector when the OID is meant to be addressable.
    pub fn new(arcs: Vec<u32>) -> Self {
        Self { arcs }
    }

    pub fn from_slice(arcs: &[u32]) -> Self {
        Self {
            arcs: arcs.to_vec(),
        }
    }

    /// Parse dotted text. Rejects empty input, empty segments, signs,
    /// leading zeros and anything that is not a `u32` arc.
    pub fn parse(text: &str) -> Result<Self, OidError> {
        if text.is_empty() {
            return Err(OidError::malformed(text, "empty OID"));
        }

        let mut arcs = Vec::with_capacity(text.len() / 2 + 1);
        for segment in text.split('.') {
            if segment.is_empty() {
                return Err(OidError::malformed(text, "empty segment"));
            }
            if !segment.bytes().all(|b| b.is_ascii_digit()) {
                return Err(OidError::malformed(text, "non-numeric segment"));
            }
            if segment.len() > 1 && segment.starts_with('0') {
                return Err(OidError::malformed(text, "leading zero in segment"));
            }
            let arc = segment
                .parse::<u32>()
                .map_err(|_| OidError::malformed(text, "segment out of range"))?;
            arcs.push(arc);
        }

        Ok(Self { arcs })
    }

    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(self.arcs.len() * 4);
        let mut iter = self.arcs.iter();
        if let Some(first) = iter.next() {
            // write! into a String cannot fail
            let _ = write!(out, "{first}");
            for arc in iter {
                out.push('.');
                let _ = write!(out, "{arc}");
            }
        }
        out
    }

    /// True iff `self` is a strict, in-order prefix of `other`.
    pub fn is_prefix_of(&self, other: &Oid) -> bool {
        self.arcs.len() < other.arcs.len() && other.arcs.starts_with(&self.arcs)
    }

    pub fn parent(&self) -> Option<Oid> {
        if self.arcs.len() <= 1 {
            None
        } else {
            Some(Self::from_slice(&self.arcs[..self.arcs.len() - 1]))
        }
    }

    pub fn child(&self, arc: u32) -> Oid {
        let mut arcs = Vec::with_capacity(self.arcs.len() + 1);
        arcs.extend_from_slice(&self.arcs);
        arcs.push(arc);
        Self::new(arcs)
    }

    pub fn arcs(&self) -> &[u32] {
        &self.arcs
    }

    pub fn len(&self) -> usize {
        self.arcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl FromStr for Oid {
    type Err = OidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Oid::parse(s)
    }
}

impl Serialize for Oid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_text())
    }
}

impl<'de> Deserialize<'de> for Oid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Oid::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_enterprise_oid() {
        let oid = Oid::parse("1.3.6.1.4.1.9999.1.3.0").unwrap();
        assert_eq!(oid.arcs(), &[1, 3, 6, 1, 4, 1, 9999, 1, 3, 0]);
    }

    #[test]
    fn test_round_trip_text() {
        for text in ["0", "1", "1.3.6.1", "1.3.6.1.4.1.9999.2.2.1.2.1", "4294967295.0"] {
            let oid = Oid::parse(text).unwrap();
            assert_eq!(oid.to_text(), text);
            assert_eq!(Oid::parse(&oid.to_text()).unwrap(), oid);
        }
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for text in ["", "1.3.x.1", "1..3", ".1.3", "1.3.", "01.3", "1.+3", "1.-3", "1. 3", "4294967296"] {
            assert!(Oid::parse(text).is_err(), "'{text}' should be rejected");
        }
    }

    #[test]
    fn test_is_prefix_of_is_strict() {
        let parent = Oid::parse("1.3.6.1.4.1.9999").unwrap();
        let child = Oid::parse("1.3.6.1.4.1.9999.1").unwrap();
        let lookalike = Oid::parse("1.3.6.1.4.1.99999").unwrap();

        assert!(parent.is_prefix_of(&child));
        assert!(!child.is_prefix_of(&parent));
        assert!(!parent.is_prefix_of(&parent));
        assert!(!parent.is_prefix_of(&lookalike));
    }

    #[test]
    fn test_parent_and_child() {
        let oid = Oid::parse("1.3.6.1").unwrap();
        assert_eq!(oid.parent().unwrap().to_text(), "1.3.6");
        assert_eq!(oid.child(4).to_text(), "1.3.6.1.4");
        assert!(oid.parent().unwrap().is_prefix_of(&oid));
        assert!(Oid::parse("1").unwrap().parent().is_none());
    }

    #[test]
    fn test_serde_as_dotted_text() {
        let oid = Oid::parse("1.3.6.1.4.1.9999.1.7.0").unwrap();
        let json = serde_json::to_string(&oid).unwrap();
        assert_eq!(json, "\"1.3.6.1.4.1.9999.1.7.0\"");

        let back: Oid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, oid);
        assert!(serde_json::from_str::<Oid>("\"1.3.a\"").is_err());
    }
}

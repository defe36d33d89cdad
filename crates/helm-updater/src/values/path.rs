//! Dot-prefixed key paths such as `.image.tag` or `.containers[0].image`.

use std::fmt;

use super::error::{EngineError, Result};

/// One step of a key path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Mapping key.
    Key(String),
    /// Sequence index.
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => write!(f, ".{}", key),
            Segment::Index(index) => write!(f, "[{}]", index),
        }
    }
}

/// A validated key path into a values document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPath {
    raw: String,
    segments: Vec<Segment>,
}

impl KeyPath {
    /// Parses a key path. Keys must start with `.` and name at least one segment.
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason: &str| EngineError::InvalidKey {
            key: raw.to_string(),
            reason: reason.to_string(),
        };

        let rest = raw
            .strip_prefix('.')
            .ok_or_else(|| invalid("doesn't start with '.'"))?;
        if rest.is_empty() {
            return Err(invalid("does not name any field"));
        }

        let mut segments = Vec::new();
        for part in rest.split('.') {
            let (name, mut indexes) = match part.find('[') {
                Some(pos) => part.split_at(pos),
                None => (part, ""),
            };

            if name.is_empty() && indexes.is_empty() {
                return Err(invalid("has an empty segment"));
            }
            if name.contains(']') {
                return Err(invalid("has an unbalanced ']'"));
            }
            if !name.is_empty() {
                segments.push(Segment::Key(name.to_string()));
            }

            while !indexes.is_empty() {
                let close = indexes
                    .find(']')
                    .ok_or_else(|| invalid("has an unclosed '['"))?;
                let index = indexes[1..close]
                    .parse::<usize>()
                    .map_err(|_| invalid("has a non-numeric index"))?;
                segments.push(Segment::Index(index));

                indexes = &indexes[close + 1..];
                if !indexes.is_empty() && !indexes.starts_with('[') {
                    return Err(invalid("has trailing characters after an index"));
                }
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The key path as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_path() {
        let path = KeyPath::parse(".image.tag").unwrap();
        assert_eq!(
            path.segments(),
            &[Segment::Key("image".into()), Segment::Key("tag".into())]
        );
        assert_eq!(path.to_string(), ".image.tag");
    }

    #[test]
    fn test_parse_indexes() {
        let path = KeyPath::parse(".spec.containers[0].env[2][1]").unwrap();
        assert_eq!(
            path.segments(),
            &[
                Segment::Key("spec".into()),
                Segment::Key("containers".into()),
                Segment::Index(0),
                Segment::Key("env".into()),
                Segment::Index(2),
                Segment::Index(1),
            ]
        );
    }

    #[test]
    fn test_missing_leading_dot_is_rejected() {
        let err = KeyPath::parse("image.tag").unwrap_err();
        assert_eq!(err.to_string(), "key image.tag doesn't start with '.'");
    }

    #[test]
    fn test_malformed_paths_are_rejected() {
        for raw in [".", "..a", ".a..b", ".a[", ".a[x]", ".a[0]b", ".a]", ""] {
            assert!(KeyPath::parse(raw).is_err(), "{raw} should be rejected");
        }
    }
}

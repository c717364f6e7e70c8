//! Dotted versions and version ranges.
//!
//! Versions follow the `major[.minor[.micro[.qualifier]]]` shape used by the
//! resolution runtime; missing numeric components default to zero, so `2.0`
//! and `2.0.0` are the same version.
use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    major: u32,
    minor: u32,
    micro: u32,
    qualifier: String,
}

impl Version {
    pub fn new(major: u32, minor: u32, micro: u32) -> Self {
        Version {
            major,
            minor,
            micro,
            qualifier: String::new(),
        }
    }

    /// Parse a version token, returning `None` for anything that is not one.
    ///
    /// Used both for explicit version attributes and to decide whether a
    /// folder name denotes a version.
    pub fn parse(text: &str) -> Option<Version> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let mut parts = text.splitn(4, '.');
        let major = parse_component(parts.next()?)?;
        let minor = match parts.next() {
            Some(part) => parse_component(part)?,
            None => 0,
        };
        let micro = match parts.next() {
            Some(part) => parse_component(part)?,
            None => 0,
        };
        let qualifier = match parts.next() {
            Some(part) => {
                let valid = !part.is_empty()
                    && part
                        .chars()
                        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');
                if !valid {
                    return None;
                }
                part.to_string()
            }
            None => String::new(),
        };
        Some(Version {
            major,
            minor,
            micro,
            qualifier,
        })
    }
}

fn parse_component(part: &str) -> Option<u32> {
    if part.is_empty() || !part.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)?;
        if !self.qualifier.is_empty() {
            write!(f, ".{}", self.qualifier)?;
        }
        Ok(())
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// An interval over [`Version`]s. A missing right bound means unbounded.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionRange {
    left: Version,
    left_closed: bool,
    right: Option<Version>,
    right_closed: bool,
}

impl VersionRange {
    /// Parse `[1.0,2.0)`-style intervals or a bare version (`1.0` means
    /// "1.0 or later").
    pub fn parse(text: &str) -> Option<VersionRange> {
        let text = text.trim();
        let first = text.chars().next()?;
        if first != '[' && first != '(' {
            let left = Version::parse(text)?;
            return Some(VersionRange {
                left,
                left_closed: true,
                right: None,
                right_closed: false,
            });
        }
        let last = text.chars().last()?;
        if (last != ']' && last != ')') || text.len() < 2 {
            return None;
        }
        let body = &text[1..text.len() - 1];
        let (left, right) = body.split_once(',')?;
        Some(VersionRange {
            left: Version::parse(left)?,
            left_closed: first == '[',
            right: Some(Version::parse(right)?),
            right_closed: last == ']',
        })
    }

    pub fn includes(&self, version: &Version) -> bool {
        let above_left = if self.left_closed {
            *version >= self.left
        } else {
            *version > self.left
        };
        if !above_left {
            return false;
        }
        match &self.right {
            None => true,
            Some(right) if self.right_closed => version <= right,
            Some(right) => version < right,
        }
    }

    /// Render the range as an LDAP filter over `attribute`.
    pub fn to_filter_string(&self, attribute: &str) -> String {
        let need_presence = !self.left_closed && (self.right.is_none() || !self.right_closed);
        let multiple_terms = need_presence || self.right.is_some();
        let mut filter = String::new();
        if multiple_terms {
            filter.push_str("(&");
        }
        if need_presence {
            filter.push_str(&format!("({attribute}=*)"));
        }
        if self.left_closed {
            filter.push_str(&format!("({attribute}>={})", self.left));
        } else {
            filter.push_str(&format!("(!({attribute}<={}))", self.left));
        }
        if let Some(right) = &self.right {
            if self.right_closed {
                filter.push_str(&format!("({attribute}<={right})"));
            } else {
                filter.push_str(&format!("(!({attribute}>={right}))"));
            }
        }
        if multiple_terms {
            filter.push(')');
        }
        filter
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.right {
            None => write!(f, "{}", self.left),
            Some(right) => write!(
                f,
                "{}{},{}{}",
                if self.left_closed { '[' } else { '(' },
                self.left,
                right,
                if self.right_closed { ']' } else { ')' }
            ),
        }
    }
}

impl Serialize for VersionRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

//! Code origins.

use std::fmt;
use std::sync::Arc;

/// Identity of the code unit responsible for a frame of execution.
///
/// Permissions attach to origins. Two origins are equal when their
/// identities are equal, regardless of which `Origin` value carries them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Origin(Arc<str>);

impl Origin {
    pub fn new(identity: impl AsRef<str>) -> Self {
        Self(Arc::from(identity.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Origin {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Origin {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

/// Selects the origins a grant applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginMatcher {
    Any,
    Exact(Origin),
}

impl OriginMatcher {
    pub fn parse(pattern: &str) -> Self {
        match pattern.trim() {
            "*" => OriginMatcher::Any,
            other => OriginMatcher::Exact(Origin::new(other)),
        }
    }

    pub fn matches(&self, origin: &Origin) -> bool {
        match self {
            OriginMatcher::Any => true,
            OriginMatcher::Exact(o) => o == origin,
        }
    }
}

impl fmt::Display for OriginMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OriginMatcher::Any => f.write_str("*"),
            OriginMatcher::Exact(o) => o.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_is_by_identity() {
        let a = Origin::new("plugin-a");
        let b = Origin::from(String::from("plugin-a"));
        assert_eq!(a, b);
        assert_ne!(a, Origin::new("plugin-b"));
    }

    #[test]
    fn test_matcher() {
        let a = Origin::new("plugin-a");
        assert!(OriginMatcher::parse("*").matches(&a));
        assert!(OriginMatcher::parse("plugin-a").matches(&a));
        assert!(!OriginMatcher::parse("plugin-b").matches(&a));
    }
}

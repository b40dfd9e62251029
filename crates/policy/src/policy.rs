//! Policy configuration and evaluation.

use crate::{Error, Origin, OriginMatcher, Permission, Resource, ResourceMatcher, Result};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// A single (origin, resource, permission) grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub origin: OriginMatcher,
    pub resource: ResourceMatcher,
    pub permission: Permission,
}

impl Grant {
    pub fn implies(&self, origin: &Origin, resource: &Resource, permission: Permission) -> bool {
        self.permission == permission
            && self.origin.matches(origin)
            && self.resource.matches(resource)
    }
}

impl fmt::Display for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.origin, self.permission, self.resource)
    }
}

/// The full set of grants in force.
///
/// Anything not granted is denied. An installed empty policy therefore
/// denies every guarded operation; the absence of a policy is what
/// disables enforcement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Policy {
    grants: Vec<Grant>,
}

/// On-disk form of a policy.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyFile {
    #[serde(default, rename = "grant")]
    pub grants: Vec<GrantEntry>,
}

/// One `[[grant]]` table.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GrantEntry {
    /// Origin identity, or `*` for every origin.
    pub origin: String,
    /// Resource pattern (path, path glob or `host:port`).
    pub resource: String,
    pub permissions: Vec<Permission>,
}

/// Result of a permission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny { reason: String },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

impl Policy {
    /// Create an empty policy. Once installed it denies everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Alias of [`Policy::new`] that reads better at install sites.
    pub fn deny_all() -> Self {
        Self::default()
    }

    /// Load policy from a TOML file. Relative path patterns resolve
    /// against the current directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse policy from TOML string.
    pub fn parse(toml: &str) -> Result<Self> {
        let base = std::env::current_dir()?;
        Self::parse_with_base(toml, &base)
    }

    /// Parse policy from TOML, resolving relative path patterns against `base`.
    pub fn parse_with_base(toml: &str, base: &Path) -> Result<Self> {
        let file: PolicyFile = toml::from_str(toml).map_err(|e| Error::Parse(e.to_string()))?;
        Self::from_file(file, base)
    }

    /// Compile the deserialized form into a policy.
    pub fn from_file(file: PolicyFile, base: &Path) -> Result<Self> {
        let mut policy = Self::new();
        for (i, entry) in file.grants.into_iter().enumerate() {
            if entry.permissions.is_empty() {
                return Err(Error::Invalid(format!("grant #{} has no permissions", i + 1)));
            }
            if entry.origin.trim().is_empty() {
                return Err(Error::Invalid(format!("grant #{} has an empty origin", i + 1)));
            }
            let origin = OriginMatcher::parse(&entry.origin);
            let resource = ResourceMatcher::parse(&entry.resource, base)
                .map_err(|e| Error::Invalid(format!("grant #{}: {e}", i + 1)))?;
            for permission in entry.permissions {
                policy.grants.push(Grant {
                    origin: origin.clone(),
                    resource: resource.clone(),
                    permission,
                });
            }
        }
        Ok(policy)
    }

    /// Add a grant. Patterns use the TOML syntax; relative path patterns
    /// are rejected here since there is no base directory to resolve them.
    pub fn grant(mut self, origin: &str, resource: &str, permission: Permission) -> Result<Self> {
        let pattern = resource.trim();
        if pattern.starts_with('.') {
            return Err(Error::Invalid(format!(
                "relative resource pattern '{pattern}' needs a base directory"
            )));
        }
        let resource = ResourceMatcher::parse(pattern, Path::new("/"))?;
        self.grants.push(Grant {
            origin: OriginMatcher::parse(origin),
            resource,
            permission,
        });
        Ok(self)
    }

    pub fn grants(&self) -> &[Grant] {
        &self.grants
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    /// Whether any grant gives `origin` `permission` on `resource`.
    pub fn implies(&self, origin: &Origin, resource: &Resource, permission: Permission) -> bool {
        self.grants
            .iter()
            .any(|g| g.implies(origin, resource, permission))
    }

    /// Check a single origin against the policy.
    pub fn check(&self, origin: &Origin, resource: &Resource, permission: Permission) -> Decision {
        if self.implies(origin, resource, permission) {
            Decision::Allow
        } else {
            Decision::Deny {
                reason: format!("{origin} has no {permission} grant for {resource}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(p: &str) -> Resource {
        Resource::path(p).unwrap()
    }

    #[test]
    fn test_empty_policy_denies() {
        let policy = Policy::deny_all();
        let d = policy.check(&Origin::new("a"), &path("/tmp/a.txt"), Permission::Read);
        assert_eq!(
            d,
            Decision::Deny {
                reason: "a has no read grant for /tmp/a.txt".into()
            }
        );
    }

    #[test]
    fn test_builder_grants() {
        let policy = Policy::new()
            .grant("plugin-a", "/tmp/*", Permission::Write)
            .unwrap();
        let a = Origin::new("plugin-a");
        assert!(policy.check(&a, &path("/tmp/a.txt"), Permission::Write).is_allowed());
        assert!(!policy.check(&a, &path("/tmp/a.txt"), Permission::Read).is_allowed());
        assert!(!policy
            .check(&Origin::new("plugin-b"), &path("/tmp/a.txt"), Permission::Write)
            .is_allowed());
    }

    #[test]
    fn test_builder_rejects_relative_pattern() {
        assert!(Policy::new().grant("a", "./data", Permission::Read).is_err());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[[grant]]
origin = "plugin-a"
resource = "/tmp/**"
permissions = ["read", "write"]

[[grant]]
origin = "*"
resource = "localhost:*"
permissions = ["connect"]

[[grant]]
origin = "plugin-b"
resource = "./scratch"
permissions = ["delete"]
"#;
        let policy = Policy::parse_with_base(toml, Path::new("/srv/app")).unwrap();
        assert_eq!(policy.len(), 4);

        let a = Origin::new("plugin-a");
        let b = Origin::new("plugin-b");

        // Allowed
        assert!(policy.implies(&a, &path("/tmp/x/y"), Permission::Write));
        assert!(policy.implies(&b, &Resource::endpoint("localhost", 9200), Permission::Connect));
        assert!(policy.implies(&b, &path("/srv/app/scratch/f"), Permission::Delete));

        // Denied
        assert!(!policy.implies(&a, &path("/tmp/x"), Permission::Delete));
        assert!(!policy.implies(&b, &path("/tmp/x"), Permission::Read));
        assert!(!policy.implies(&a, &Resource::endpoint("example.org", 80), Permission::Connect));
    }

    #[test]
    fn test_parse_rejects_unknown_permission() {
        let toml = r#"
[[grant]]
origin = "a"
resource = "/tmp"
permissions = ["execute"]
"#;
        assert!(matches!(
            Policy::parse_with_base(toml, Path::new("/")),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn test_parse_rejects_empty_permissions() {
        let toml = r#"
[[grant]]
origin = "a"
resource = "/tmp"
permissions = []
"#;
        assert!(matches!(
            Policy::parse_with_base(toml, Path::new("/")),
            Err(Error::Invalid(_))
        ));
    }

    #[test]
    fn test_parse_rejects_unknown_keys() {
        let toml = r#"
[[grant]]
origin = "a"
resource = "/tmp"
permissions = ["read"]
mode = "rw"
"#;
        assert!(Policy::parse_with_base(toml, Path::new("/")).is_err());
    }

    #[test]
    fn test_empty_file_is_empty_policy() {
        let policy = Policy::parse_with_base("", Path::new("/")).unwrap();
        assert!(policy.is_empty());
    }
}

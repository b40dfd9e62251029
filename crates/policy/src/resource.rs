//! Resources and resource matchers.
//!
//! A [`Resource`] is always in canonical form: paths are absolute and
//! lexically normalized, hosts are lowercase without a trailing dot.
//! Matchers are compiled from policy patterns into the same form so that
//! matching is plain component or string comparison.

use crate::{Error, Result};
use std::fmt;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};

/// The target of a guarded operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Resource {
    /// A filesystem path (also used for Unix domain socket addresses).
    Path(PathBuf),
    /// A network endpoint.
    Endpoint(Endpoint),
}

impl Resource {
    /// Build a path resource. Relative paths are rejected; callers make
    /// them absolute first.
    pub fn path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_absolute() {
            return Err(Error::Invalid(format!(
                "resource path must be absolute: {}",
                path.display()
            )));
        }
        Ok(Resource::Path(normalize(path)))
    }

    pub fn endpoint(host: &str, port: u16) -> Self {
        Resource::Endpoint(Endpoint::new(host, port))
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Path(p) => write!(f, "{}", p.display()),
            Resource::Endpoint(e) => e.fmt(f),
        }
    }
}

impl From<SocketAddr> for Resource {
    fn from(addr: SocketAddr) -> Self {
        Resource::Endpoint(addr.into())
    }
}

/// A host and port pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: canonical_host(host),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Self::new(&addr.ip().to_string(), addr.port())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

fn canonical_host(host: &str) -> String {
    let host = host.trim();
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    host.trim_end_matches('.').to_ascii_lowercase()
}

/// Lexically normalize a path: drop `.` components and resolve `..`
/// against the preceding component. `..` never climbs above the root.
///
/// This does not touch the filesystem, so symlinks are not resolved.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            Component::Normal(name) => out.push(name),
        }
    }
    out
}

/// Selects the resources a grant applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceMatcher {
    /// Every resource, path or endpoint.
    Any,
    /// The path itself and everything beneath it.
    Subtree(PathBuf),
    /// Direct children of a directory, not the directory itself.
    Children(PathBuf),
    Endpoint(EndpointPattern),
}

impl ResourceMatcher {
    /// Compile a policy pattern. Relative path patterns are resolved
    /// against `base`.
    pub fn parse(pattern: &str, base: &Path) -> Result<Self> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(Error::Invalid("empty resource pattern".into()));
        }
        if pattern == "*" {
            return Ok(ResourceMatcher::Any);
        }
        let looks_like_path = Path::new(pattern).is_absolute() || pattern.starts_with('.');
        if !looks_like_path && (pattern.starts_with('[') || pattern.contains(':')) {
            return EndpointPattern::parse(pattern).map(ResourceMatcher::Endpoint);
        }

        let (dir, children) = if let Some(dir) = pattern.strip_suffix("/**") {
            (dir, false)
        } else if let Some(dir) = pattern.strip_suffix("/-") {
            (dir, false)
        } else if let Some(dir) = pattern.strip_suffix("/*") {
            (dir, true)
        } else {
            (pattern, false)
        };
        let dir = if dir.is_empty() { "/" } else { dir };
        let dir = normalize(&base.join(dir));

        Ok(if children {
            ResourceMatcher::Children(dir)
        } else {
            ResourceMatcher::Subtree(dir)
        })
    }

    pub fn matches(&self, resource: &Resource) -> bool {
        match (self, resource) {
            (ResourceMatcher::Any, _) => true,
            (ResourceMatcher::Subtree(dir), Resource::Path(p)) => p.starts_with(dir),
            (ResourceMatcher::Children(dir), Resource::Path(p)) => {
                p.parent() == Some(dir.as_path())
            }
            (ResourceMatcher::Endpoint(pat), Resource::Endpoint(e)) => pat.matches(e),
            _ => false,
        }
    }
}

impl fmt::Display for ResourceMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceMatcher::Any => f.write_str("*"),
            ResourceMatcher::Subtree(p) if p.parent().is_none() => write!(f, "{}**", p.display()),
            ResourceMatcher::Subtree(p) => write!(f, "{}/**", p.display()),
            ResourceMatcher::Children(p) if p.parent().is_none() => write!(f, "{}*", p.display()),
            ResourceMatcher::Children(p) => write!(f, "{}/*", p.display()),
            ResourceMatcher::Endpoint(e) => e.fmt(f),
        }
    }
}

/// `host:port` pattern with wildcard support on either side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointPattern {
    host: HostPattern,
    port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum HostPattern {
    Any,
    Exact(String),
    /// `*.example.org`: any subdomain, stored as `.example.org`.
    Suffix(String),
}

impl EndpointPattern {
    fn parse(pattern: &str) -> Result<Self> {
        let (host, port) = if let Some(rest) = pattern.strip_prefix('[') {
            let (host, port) = rest
                .split_once("]:")
                .ok_or_else(|| Error::Invalid(format!("bad endpoint pattern '{pattern}'")))?;
            (host, port)
        } else {
            pattern.rsplit_once(':').ok_or_else(|| {
                Error::Invalid(format!("endpoint pattern needs a port: '{pattern}'"))
            })?
        };

        let port = match port {
            "*" => None,
            p => Some(
                p.parse::<u16>()
                    .map_err(|_| Error::Invalid(format!("bad port in '{pattern}'")))?,
            ),
        };

        let host = match host {
            "" => return Err(Error::Invalid(format!("empty host in '{pattern}'"))),
            "*" => HostPattern::Any,
            h => match h.strip_prefix("*.") {
                Some(domain) => HostPattern::Suffix(format!(".{}", canonical_host(domain))),
                None => HostPattern::Exact(canonical_host(h)),
            },
        };

        Ok(Self { host, port })
    }

    fn matches(&self, endpoint: &Endpoint) -> bool {
        let host_ok = match &self.host {
            HostPattern::Any => true,
            HostPattern::Exact(h) => h == endpoint.host(),
            HostPattern::Suffix(s) => endpoint.host().ends_with(s.as_str()),
        };
        host_ok && self.port.is_none_or(|p| p == endpoint.port())
    }
}

impl fmt::Display for EndpointPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.host {
            HostPattern::Any => f.write_str("*")?,
            HostPattern::Exact(h) if h.contains(':') => write!(f, "[{h}]")?,
            HostPattern::Exact(h) => f.write_str(h)?,
            HostPattern::Suffix(s) => write!(f, "*{s}")?,
        }
        match self.port {
            Some(p) => write!(f, ":{p}"),
            None => f.write_str(":*"),
        }
    }
}

//! Guarded socket primitives.
//!
//! Connecting and binding both require `connect` permission on the
//! endpoint. Host names are checked as written, before any resolution.

use crate::Result;
use crate::interceptor::{Arg, Interceptor};
use crate::registry::Operation;
use std::net::{SocketAddr, TcpListener, TcpStream};
#[cfg(unix)]
use std::os::unix::net::{UnixListener, UnixStream};
#[cfg(unix)]
use std::path::Path;

/// Socket access through an [`Interceptor`].
#[derive(Debug, Clone, Copy)]
pub struct Net<'a> {
    interceptor: &'a Interceptor,
}

impl<'a> Net<'a> {
    pub(crate) fn new(interceptor: &'a Interceptor) -> Self {
        Self { interceptor }
    }

    pub fn connect(&self, addr: SocketAddr) -> Result<TcpStream> {
        self.interceptor.intercept(Operation::Connect, &[Arg::Socket(addr)])?;
        Ok(TcpStream::connect(addr)?)
    }

    /// Connect by host name. The grant must name the host, not the
    /// addresses it resolves to.
    pub fn connect_host(&self, host: &str, port: u16) -> Result<TcpStream> {
        self.interceptor
            .intercept(Operation::Connect, &[Arg::Host(host, port)])?;
        Ok(TcpStream::connect((host, port))?)
    }

    pub fn bind(&self, addr: SocketAddr) -> Result<TcpListener> {
        self.interceptor.intercept(Operation::Bind, &[Arg::Socket(addr)])?;
        Ok(TcpListener::bind(addr)?)
    }

    #[cfg(unix)]
    pub fn connect_unix(&self, path: impl AsRef<Path>) -> Result<UnixStream> {
        let path = path.as_ref();
        self.interceptor.intercept(Operation::Connect, &[Arg::Path(path)])?;
        Ok(UnixStream::connect(path)?)
    }

    #[cfg(unix)]
    pub fn bind_unix(&self, path: impl AsRef<Path>) -> Result<UnixListener> {
        let path = path.as_ref();
        self.interceptor.intercept(Operation::Bind, &[Arg::Path(path)])?;
        Ok(UnixListener::bind(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::enter;
    use policy::{Permission, Policy, PolicyEngine};

    fn loopback_policy() -> Policy {
        Policy::new()
            .grant("app", "127.0.0.1:*", Permission::Connect)
            .unwrap()
    }

    #[test]
    fn test_local_connection() {
        let interceptor = Interceptor::new(PolicyEngine::with_policy(loopback_policy()));
        let _app = enter("app");

        let listener = interceptor.net().bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let client = interceptor.net().connect(addr).unwrap();
        assert_eq!(client.peer_addr().unwrap(), addr);
    }

    #[test]
    fn test_connect_denied_for_other_origin() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let interceptor = Interceptor::new(PolicyEngine::with_policy(loopback_policy()));
        let _app = enter("app");
        let _plugin = enter("plugin");

        let err = interceptor.net().connect(addr).unwrap_err();
        let v = err.violation().unwrap();
        assert_eq!(v.origin.as_str(), "plugin");
        assert_eq!(v.permission, Permission::Connect);
    }

    #[test]
    fn test_bind_denied_outside_grant() {
        let interceptor = Interceptor::new(PolicyEngine::with_policy(loopback_policy()));
        let _app = enter("app");
        let err = interceptor.net().bind("0.0.0.0:0".parse().unwrap()).unwrap_err();
        assert!(err.is_access_denied());
    }

    #[test]
    fn test_host_names_checked_as_written() {
        let interceptor = Interceptor::new(PolicyEngine::with_policy(loopback_policy()));
        let _app = enter("app");
        // localhost is not 127.0.0.1 as far as the policy is concerned.
        let err = interceptor.net().connect_host("localhost", 1).unwrap_err();
        assert!(err.is_access_denied());
    }

    #[cfg(unix)]
    #[test]
    fn test_unix_domain_socket() {
        let dir = tempfile::TempDir::new().unwrap();
        let socket = dir.path().join("test.sock");
        let policy = Policy::new()
            .grant("app", dir.path().to_str().unwrap(), Permission::Connect)
            .unwrap();
        let interceptor = Interceptor::new(PolicyEngine::with_policy(policy));
        let _app = enter("app");

        let listener = interceptor.net().bind_unix(&socket).unwrap();
        let client = interceptor.net().connect_unix(&socket).unwrap();
        let (accepted, _) = listener.accept().unwrap();
        assert!(client.peer_addr().is_ok());
        assert!(accepted.local_addr().is_ok());

        let _plugin = enter("plugin");
        assert!(interceptor.net().connect_unix(&socket).unwrap_err().is_access_denied());
    }
}

//! Interception point registry.
//!
//! The set of guarded operations is closed. Adding one means adding a
//! variant here, and every `match` below has to say what it requires.

use policy::Permission;
use std::fmt;

/// A guarded operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Open a bidirectional channel.
    Open,
    Write,
    CreateFile,
    CreateDirectories,
    CreateLink,
    Copy,
    Move,
    NewByteChannel,
    Delete,
    DeleteIfExists,
    /// Connect a socket.
    Connect,
    /// Bind a listening socket.
    Bind,
}

/// The resource family an operation touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Filesystem,
    Socket,
}

/// Access category reported when an operation is denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Open,
    Write,
    Delete,
    Connect,
}

impl Operation {
    pub const ALL: [Operation; 12] = [
        Operation::Open,
        Operation::Write,
        Operation::CreateFile,
        Operation::CreateDirectories,
        Operation::CreateLink,
        Operation::Copy,
        Operation::Move,
        Operation::NewByteChannel,
        Operation::Delete,
        Operation::DeleteIfExists,
        Operation::Connect,
        Operation::Bind,
    ];

    /// Permissions every origin in the chain must hold.
    ///
    /// `Open` asks for read and write whatever mode the caller wants.
    pub const fn required(self) -> &'static [Permission] {
        match self {
            Operation::Open => &[Permission::Read, Permission::Write],
            Operation::Write
            | Operation::CreateFile
            | Operation::CreateDirectories
            | Operation::CreateLink
            | Operation::Copy
            | Operation::Move
            | Operation::NewByteChannel => &[Permission::Write],
            Operation::Delete | Operation::DeleteIfExists => &[Permission::Delete],
            Operation::Connect | Operation::Bind => &[Permission::Connect],
        }
    }

    pub const fn access_kind(self) -> AccessKind {
        match self {
            Operation::Open => AccessKind::Open,
            Operation::Write
            | Operation::CreateFile
            | Operation::CreateDirectories
            | Operation::CreateLink
            | Operation::Copy
            | Operation::Move
            | Operation::NewByteChannel => AccessKind::Write,
            Operation::Delete | Operation::DeleteIfExists => AccessKind::Delete,
            Operation::Connect | Operation::Bind => AccessKind::Connect,
        }
    }

    pub const fn family(self) -> Family {
        match self {
            Operation::Connect | Operation::Bind => Family::Socket,
            _ => Family::Filesystem,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Operation::Open => "open",
            Operation::Write => "write",
            Operation::CreateFile => "createFile",
            Operation::CreateDirectories => "createDirectories",
            Operation::CreateLink => "createLink",
            Operation::Copy => "copy",
            Operation::Move => "move",
            Operation::NewByteChannel => "newByteChannel",
            Operation::Delete => "delete",
            Operation::DeleteIfExists => "deleteIfExists",
            Operation::Connect => "connect",
            Operation::Bind => "bind",
        }
    }

    /// Look up an operation by name. Names outside the registry are not
    /// guarded and yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        Operation::ALL.into_iter().find(|op| op.name() == name)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Family::Filesystem => "filesystem",
            Family::Socket => "socket",
        })
    }
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AccessKind::Open => "OPEN",
            AccessKind::Write => "WRITE",
            AccessKind::Delete => "DELETE",
            AccessKind::Connect => "CONNECT",
        })
    }
}

//! Guarded filesystem primitives.
//!
//! Each function runs the interceptor first and only then calls into
//! `std::fs`. A denied call returns [`Error::AccessDenied`] without touching
//! the filesystem.
//!
//! [`Error::AccessDenied`]: crate::Error::AccessDenied

use crate::Result;
use crate::interceptor::{Arg, Interceptor};
use crate::registry::Operation;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;

/// Filesystem access through an [`Interceptor`].
#[derive(Debug, Clone, Copy)]
pub struct Fs<'a> {
    interceptor: &'a Interceptor,
}

impl<'a> Fs<'a> {
    pub(crate) fn new(interceptor: &'a Interceptor) -> Self {
        Self { interceptor }
    }

    fn guard(&self, operation: Operation, path: &Path) -> Result<()> {
        self.interceptor.intercept(operation, &[Arg::Path(path)])?;
        Ok(())
    }

    /// Open a channel for reading and writing. Read and write permission
    /// are both required whatever `options` asks for.
    pub fn open(&self, path: impl AsRef<Path>, options: &OpenOptions) -> Result<File> {
        let path = path.as_ref();
        self.guard(Operation::Open, path)?;
        Ok(options.open(path)?)
    }

    /// Open with arbitrary options; requires write permission.
    pub fn new_byte_channel(&self, path: impl AsRef<Path>, options: &OpenOptions) -> Result<File> {
        let path = path.as_ref();
        self.guard(Operation::NewByteChannel, path)?;
        Ok(options.open(path)?)
    }

    pub fn write(&self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Result<()> {
        let path = path.as_ref();
        self.guard(Operation::Write, path)?;
        Ok(fs::write(path, contents)?)
    }

    /// Create a new, empty file. Fails if it already exists.
    pub fn create_file(&self, path: impl AsRef<Path>) -> Result<File> {
        let path = path.as_ref();
        self.guard(Operation::CreateFile, path)?;
        Ok(OpenOptions::new().write(true).create_new(true).open(path)?)
    }

    pub fn create_dir_all(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.guard(Operation::CreateDirectories, path)?;
        Ok(fs::create_dir_all(path)?)
    }

    /// Create `link` as a hard link to `original`. Both paths are checked.
    pub fn hard_link(&self, original: impl AsRef<Path>, link: impl AsRef<Path>) -> Result<()> {
        let (original, link) = (original.as_ref(), link.as_ref());
        self.guard(Operation::CreateLink, link)?;
        self.guard(Operation::CreateLink, original)?;
        Ok(fs::hard_link(original, link)?)
    }

    /// Copy `from` to `to`. Both paths are checked.
    pub fn copy(&self, from: impl AsRef<Path>, to: impl AsRef<Path>) -> Result<u64> {
        let (from, to) = (from.as_ref(), to.as_ref());
        self.guard(Operation::Copy, from)?;
        self.guard(Operation::Copy, to)?;
        Ok(fs::copy(from, to)?)
    }

    /// Move `from` to `to`. Both paths are checked.
    pub fn rename(&self, from: impl AsRef<Path>, to: impl AsRef<Path>) -> Result<()> {
        let (from, to) = (from.as_ref(), to.as_ref());
        self.guard(Operation::Move, from)?;
        self.guard(Operation::Move, to)?;
        Ok(fs::rename(from, to)?)
    }

    pub fn remove_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.guard(Operation::Delete, path)?;
        Ok(fs::remove_file(path)?)
    }

    /// Remove an empty directory.
    pub fn remove_dir(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.guard(Operation::Delete, path)?;
        Ok(fs::remove_dir(path)?)
    }

    /// Remove a file if it exists. Returns whether it did.
    pub fn remove_file_if_exists(&self, path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        self.guard(Operation::DeleteIfExists, path)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

//! Resource canonicalization.

use crate::{Error, Result};
use policy::Resource;
use policy::resource::normalize;
use std::path::{Path, PathBuf};

/// Make `path` absolute against the current directory and normalize it
/// lexically, so `a/../b.txt` and `/cwd/b.txt` name the same resource.
pub fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(normalize(path));
    }
    let cwd = std::env::current_dir().map_err(|source| Error::Canonicalize {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(normalize(&cwd.join(path)))
}

pub fn path_resource(path: &Path) -> Result<Resource> {
    Ok(Resource::Path(absolute(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_path_is_normalized() {
        let p = absolute(Path::new("/tmp/./x/../a.txt")).unwrap();
        assert_eq!(p, PathBuf::from("/tmp/a.txt"));
    }

    #[test]
    fn test_relative_path_joins_cwd() {
        let cwd = std::env::current_dir().unwrap();
        let p = absolute(Path::new("sub/../a.txt")).unwrap();
        assert_eq!(p, cwd.join("a.txt"));
        assert_eq!(
            path_resource(Path::new("./a.txt")).unwrap(),
            path_resource(&cwd.join("a.txt")).unwrap()
        );
    }
}

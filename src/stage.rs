//! One stage of a command line: its arguments and where its standard
//! streams point.

use crate::error::LineError;
use nix::fcntl::OFlag;
use std::fs::{File, OpenOptions};
use std::os::fd::OwnedFd;
use std::os::unix::fs::OpenOptionsExt;
use std::process::Stdio;

/// Where a standard stream of a stage comes from.
///
/// Dropping an `Owned` descriptor closes the interpreter's copy of it.
#[derive(Debug, Default)]
pub enum Descriptor {
    /// The interpreter's own standard stream, passed through untouched.
    #[default]
    Inherited,
    /// A pipe end or an opened file that belongs to exactly one stage.
    Owned(OwnedFd),
}

impl Descriptor {
    pub fn is_inherited(&self) -> bool {
        matches!(self, Descriptor::Inherited)
    }

    /// Convert this descriptor into a [`Stdio`] handle for `std::process::Command`.
    pub fn into_stdio(self) -> Stdio {
        match self {
            Descriptor::Inherited => Stdio::inherit(),
            Descriptor::Owned(fd) => Stdio::from(fd),
        }
    }
}

impl From<File> for Descriptor {
    fn from(file: File) -> Self {
        Descriptor::Owned(file.into())
    }
}

impl From<OwnedFd> for Descriptor {
    fn from(fd: OwnedFd) -> Self {
        Descriptor::Owned(fd)
    }
}

/// Standard stream bindings and the wait policy of a stage.
#[derive(Debug)]
pub struct StageIo {
    pub stdin: Descriptor,
    pub stdout: Descriptor,
    /// `false` when the stage was terminated by `&`.
    pub foreground: bool,
}

impl Default for StageIo {
    fn default() -> Self {
        Self {
            stdin: Descriptor::Inherited,
            stdout: Descriptor::Inherited,
            foreground: true,
        }
    }
}

/// A complete stage ready for dispatch. `argv` is never empty.
#[derive(Debug)]
pub struct Stage {
    pub argv: Vec<String>,
    pub io: StageIo,
}

impl Stage {
    pub fn name(&self) -> &str {
        &self.argv[0]
    }
}

/// Open `path` as the target of `<`.
pub fn open_for_read(path: &str) -> Result<Descriptor, LineError> {
    File::open(path)
        .map(Descriptor::from)
        .map_err(|source| LineError::OpenTarget {
            path: path.to_owned(),
            source,
        })
}

/// Open `path` as the target of `>`: write-only, created with owner
/// read/write permissions, truncated if it exists.
pub fn open_for_write(path: &str) -> Result<Descriptor, LineError> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .map(Descriptor::from)
        .map_err(|source| LineError::OpenTarget {
            path: path.to_owned(),
            source,
        })
}

/// Create a pipe whose ends are not inherited across `exec` unless they are
/// explicitly bound to a child's standard stream.
///
/// Returns `(read_end, write_end)`.
pub fn open_pipe() -> Result<(OwnedFd, OwnedFd), LineError> {
    Ok(nix::unistd::pipe2(OFlag::O_CLOEXEC)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::temp_path;
    use std::fs;
    use std::io::{Read, Write};
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn test_default_io_is_inherited_foreground() {
        let io = StageIo::default();
        assert!(io.stdin.is_inherited());
        assert!(io.stdout.is_inherited());
        assert!(io.foreground);
    }

    #[test]
    fn test_open_for_write_truncates_existing_file() {
        let path = temp_path("open_for_write");
        fs::write(&path, "old contents that are long").unwrap();

        let desc = open_for_write(path.to_str().unwrap()).unwrap();
        let Descriptor::Owned(fd) = desc else {
            panic!("expected an owned descriptor");
        };
        let mut file = File::from(fd);
        file.write_all(b"new").unwrap();
        drop(file);

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_open_for_write_creates_owner_only_file() {
        let path = temp_path("fresh_target");
        let _ = fs::remove_file(&path);
        drop(open_for_write(path.to_str().unwrap()).unwrap());
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o077, 0);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_open_for_read_missing_file_names_path() {
        let err = open_for_read("/definitely/not/here").unwrap_err();
        assert!(err.to_string().starts_with("/definitely/not/here:"));
    }

    #[test]
    fn test_pipe_carries_bytes() {
        let (read_end, write_end) = open_pipe().unwrap();
        let mut writer = File::from(write_end);
        writer.write_all(b"abc").unwrap();
        drop(writer);

        let mut buf = String::new();
        File::from(read_end).read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "abc");
    }
}

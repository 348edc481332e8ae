use std::{fmt, io};

/// Errno-shaped error codes a [`FileSystem`](crate::FileSystem) may raise
/// (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Errno {
    /// No such file or directory.
    Enoent,
    /// File exists.
    Eexist,
    /// Bad file descriptor.
    Ebadf,
    /// Is a directory.
    Eisdir,
    /// Not a directory.
    Enotdir,
    /// Directory not empty.
    Enotempty,
    /// Anything else the host OS reported.
    Other,
}

impl Errno {
    /// Classifies a [`std::io::Error`] into the errno-shaped taxonomy.
    pub fn from_io(err: &io::Error) -> Self {
        // Linux errno numbers; `ErrorKind` doesn't expose EISDIR/ENOTDIR/
        // ENOTEMPTY on stable Rust, so fall back to the raw OS code.
        const ENOENT: i32 = 2;
        const EBADF: i32 = 9;
        const EEXIST: i32 = 17;
        const ENOTDIR: i32 = 20;
        const EISDIR: i32 = 21;
        const ENOTEMPTY: i32 = 39;

        match err.kind() {
            io::ErrorKind::NotFound => Errno::Enoent,
            io::ErrorKind::AlreadyExists => Errno::Eexist,
            _ => match err.raw_os_error() {
                Some(ENOENT) => Errno::Enoent,
                Some(EEXIST) => Errno::Eexist,
                Some(EBADF) => Errno::Ebadf,
                Some(EISDIR) => Errno::Eisdir,
                Some(ENOTDIR) => Errno::Enotdir,
                Some(ENOTEMPTY) => Errno::Enotempty,
                _ => Errno::Other,
            },
        }
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Errno::Enoent => "ENOENT",
            Errno::Eexist => "EEXIST",
            Errno::Ebadf => "EBADF",
            Errno::Eisdir => "EISDIR",
            Errno::Enotdir => "ENOTDIR",
            Errno::Enotempty => "ENOTEMPTY",
            Errno::Other => "EOTHER",
        };
        f.write_str(s)
    }
}

/// An error raised by a [`FileSystem`](crate::FileSystem) call.
#[derive(Debug, thiserror::Error)]
#[error("{syscall} failed ({errno}): {source}")]
pub struct FsError {
    /// The syscall that failed.
    pub syscall: &'static str,
    /// The classified errno.
    pub errno: Errno,
    /// The underlying OS error.
    #[source]
    pub source: io::Error,
}

impl FsError {
    /// Wraps an I/O error raised while performing `syscall`.
    pub fn new(syscall: &'static str, source: io::Error) -> Self {
        let errno = Errno::from_io(&source);
        Self {
            syscall,
            errno,
            source,
        }
    }
}

/// The result type returned by [`FileSystem`](crate::FileSystem) calls.
pub type Result<T> = std::result::Result<T, FsError>;

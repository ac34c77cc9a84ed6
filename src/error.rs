use std::{fmt, io, result};

/// Error taxonomy for the tree, the block store and the bulk loaders.
///
/// One variant per failure class; callers are expected to discard and
/// retry the tree directory on any of these.
#[derive(Debug)]
pub enum Error {
    /// A precondition the caller was responsible for did not hold:
    /// a non-empty tree at the start of a bulk load, `beta` outside
    /// `[0,1]`, an empty comparator tuple, and so on.
    PreconditionFailed(String),
    /// The leaf-entry input stream was malformed or truncated.
    ParseError { offset: u64, message: String },
    /// Temp disk space or a directory-allocator id could not be obtained.
    ResourceExhausted(String),
    /// An on-disk invariant was violated: a block's `count` exceeds its
    /// capacity, a handle points past the file, a child pointer dangles.
    Corruption(String),
    /// A structural invariant was violated by the implementation itself.
    Logic(String),
    /// Propagated I/O failure.
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::PreconditionFailed(msg) => write!(f, "precondition failed: {}", msg),
            Error::ParseError { offset, message } => {
                write!(f, "parse error at offset {}: {}", offset, message)
            }
            Error::ResourceExhausted(msg) => write!(f, "resource exhausted: {}", msg),
            Error::Corruption(msg) => write!(f, "corruption: {}", msg),
            Error::Logic(msg) => write!(f, "logic error: {}", msg),
            Error::Io(err) => write!(f, "i/o error: {}", err),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

pub type Result<T> = result::Result<T, Error>;

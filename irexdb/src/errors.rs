use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;

use crate::common::{atomic, Atomic};

/// Error kinds for irexdb operations.
///
/// Each kind names a category of failure so callers can branch on it without
/// parsing messages.
///
/// # Examples
///
/// ```rust,ignore
/// use irexdb::errors::{IrexError, ErrorKind, IrexResult};
///
/// fn example() -> IrexResult<()> {
///     Err(IrexError::new("Document already exists with id a", ErrorKind::DuplicateKey))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    /// An insert supplied an `_id` that already exists in the collection
    DuplicateKey,
    /// An upsert query matched more than one document
    AmbiguousUpsert,
    /// A query uses an unknown operator or an operand the matcher cannot evaluate
    MalformedQuery,
    /// Reading or writing the backing datafile failed, or the datafile is corrupt
    Persistence,
    /// The update function wrapped by a value cache failed
    ValueCacheRefresh,

    /// The supplied `_id` is not a non-empty string
    InvalidId,
    /// The operation is not valid in the current context
    InvalidOperation,
    /// Error encoding or decoding data
    EncodingError,
    /// Generic IO error
    IOError,
    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::DuplicateKey => write!(f, "Duplicate key"),
            ErrorKind::AmbiguousUpsert => write!(f, "Ambiguous upsert"),
            ErrorKind::MalformedQuery => write!(f, "Malformed query"),
            ErrorKind::Persistence => write!(f, "Persistence error"),
            ErrorKind::ValueCacheRefresh => write!(f, "Value cache refresh error"),
            ErrorKind::InvalidId => write!(f, "Invalid ID"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::EncodingError => write!(f, "Encoding error"),
            ErrorKind::IOError => write!(f, "IO error"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Error type returned by every fallible irexdb operation.
///
/// `IrexError` carries a message, a kind, an optional cause and the backtrace
/// captured where it was created.
///
/// # Examples
///
/// ```rust,ignore
/// use irexdb::errors::{IrexError, ErrorKind};
///
/// let cause = IrexError::new("disk full", ErrorKind::IOError);
/// let err = IrexError::new_with_cause("Failed to flush collection pkgs", ErrorKind::Persistence, cause);
/// assert_eq!(err.kind(), &ErrorKind::Persistence);
/// ```
#[derive(Clone)]
pub struct IrexError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<IrexError>>,
    backtrace: Atomic<Backtrace>,
}

impl IrexError {
    /// Creates a new `IrexError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        IrexError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: atomic(Backtrace::new()),
        }
    }

    /// Creates a new `IrexError` that keeps `cause` in its error chain.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: IrexError) -> Self {
        IrexError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: atomic(Backtrace::new()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&IrexError> {
        self.cause.as_deref()
    }
}

impl Display for IrexError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for IrexError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // message with stack trace, or the cause chain if there is one
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace.read()),
        }
    }
}

impl Error for IrexError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// Shorthand for `Result<T, IrexError>`.
pub type IrexResult<T> = Result<T, IrexError>;

impl From<std::io::Error> for IrexError {
    fn from(err: std::io::Error) -> Self {
        IrexError::new(&format!("IO error: {}", err), ErrorKind::IOError)
    }
}

impl From<serde_json::Error> for IrexError {
    fn from(err: serde_json::Error) -> Self {
        IrexError::new(
            &format!("JSON encoding error: {}", err),
            ErrorKind::EncodingError,
        )
    }
}

impl From<tempfile::PersistError> for IrexError {
    fn from(err: tempfile::PersistError) -> Self {
        IrexError::new(
            &format!("Failed to replace datafile: {}", err.error),
            ErrorKind::IOError,
        )
    }
}

impl From<tokio::task::JoinError> for IrexError {
    fn from(err: tokio::task::JoinError) -> Self {
        IrexError::new(
            &format!("Background task failed: {}", err),
            ErrorKind::InternalError,
        )
    }
}

impl From<String> for IrexError {
    fn from(msg: String) -> Self {
        IrexError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for IrexError {
    fn from(msg: &str) -> Self {
        IrexError::new(msg, ErrorKind::InternalError)
    }
}

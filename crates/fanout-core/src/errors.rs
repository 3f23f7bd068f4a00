//! Bucket store errors.
//!
//! The category only shapes the message shown to the user. The dispatcher
//! retries every failed copy the same way regardless of category.

use std::io;

/// Broad category of a bucket store failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// Bucket or object does not exist.
    NotFound,
    /// Target exists where the operation needed it absent.
    AlreadyExists,
    /// Caller lacks access to the bucket or object.
    PermissionDenied,
    /// Object name rejected before touching storage.
    InvalidName,
    /// Any other I/O failure.
    Io,
}

/// A bucket store error with the object it concerns.
#[derive(Debug)]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub message: String,
    /// `bucket/object` the operation was acting on, if known.
    pub object: Option<String>,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind, message: impl Into<String>, object: Option<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            object,
        }
    }

    pub fn not_found(message: impl Into<String>, object: Option<String>) -> Self {
        Self::new(StoreErrorKind::NotFound, message, object)
    }

    pub fn invalid_name(message: impl Into<String>, object: Option<String>) -> Self {
        Self::new(StoreErrorKind::InvalidName, message, object)
    }

    /// Wraps an I/O error, keeping its category.
    pub fn from_io(err: &io::Error, object: Option<String>) -> Self {
        Self::new(categorize_io_error(err), err.to_string(), object)
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref object) = self.object {
            write!(f, "{}: {}", object, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for StoreError {}

/// Map an IO error onto a store error category.
pub fn categorize_io_error(err: &io::Error) -> StoreErrorKind {
    match err.kind() {
        io::ErrorKind::NotFound => StoreErrorKind::NotFound,
        io::ErrorKind::AlreadyExists => StoreErrorKind::AlreadyExists,
        io::ErrorKind::PermissionDenied => StoreErrorKind::PermissionDenied,
        io::ErrorKind::InvalidInput => StoreErrorKind::InvalidName,
        _ => StoreErrorKind::Io,
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_object() {
        let err = StoreError::not_found("no such object", Some("bucket/0-a".to_string()));
        assert_eq!(err.to_string(), "bucket/0-a: no such object");
        let bare = StoreError::new(StoreErrorKind::Io, "disk on fire", None);
        assert_eq!(bare.to_string(), "disk on fire");
    }

    #[test]
    fn io_error_categorization() {
        let missing = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert_eq!(categorize_io_error(&missing), StoreErrorKind::NotFound);

        let perm = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(categorize_io_error(&perm), StoreErrorKind::PermissionDenied);

        let timeout = io::Error::new(io::ErrorKind::TimedOut, "slow");
        assert_eq!(categorize_io_error(&timeout), StoreErrorKind::Io);
    }

    #[test]
    fn from_io_keeps_category() {
        let perm = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err = StoreError::from_io(&perm, Some("b/o".into()));
        assert_eq!(err.kind, StoreErrorKind::PermissionDenied);
        assert!(err.to_string().contains("denied"));
    }
}

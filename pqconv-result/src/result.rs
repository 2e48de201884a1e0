use crate::error::Error;

/// Result type alias used throughout pqconv.
///
/// Shorthand for `std::result::Result<T, Error>`; every fallible pqconv
/// operation returns this type.
pub type Result<T> = std::result::Result<T, Error>;

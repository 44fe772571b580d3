use thiserror::Error;

/// Custom error type for the Galleon engine.
///
/// This enum unifies error handling across the library. Every fallible
/// operation surfaces one of these kinds; nothing in the engine unwinds on
/// user input.
///
/// # Examples
///
/// ```rust
/// use galleon::error::GalleonError;
///
/// let err = GalleonError::ColumnNotFound("price".to_string());
/// println!("Error: {}", err);
/// // Output: Error: column not found: price
/// ```
#[derive(Error, Debug, PartialEq, Clone)]
pub enum GalleonError {
    #[error("length mismatch: {0}")]
    LengthMismatch(String),
    #[error("duplicate column: {0}")]
    DuplicateColumn(String),
    #[error("column not found: {0}")]
    ColumnNotFound(String),
    #[error("dtype mismatch: {0}")]
    DTypeMismatch(String),
    #[error("unsupported dtype: {0}")]
    UnsupportedDType(String),
    #[error("type promotion failed: {0}")]
    TypePromotion(String),
    #[error("domain error: {0}")]
    DomainError(String),
    #[error("operation cancelled")]
    Cancelled,
    #[error("reader error: {0}")]
    ReaderError(String),
}

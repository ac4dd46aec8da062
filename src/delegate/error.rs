use thiserror::Error;

/// Result type alias for delegate operations
pub type Result<T> = std::result::Result<T, DelegateError>;

/// Failures reported synchronously by a delegate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DelegateError {
    /// Indexed access past the end of the handler list
    #[error("handler index {index} out of range for delegate of length {len}")]
    OutOfRange { index: usize, len: usize },

    /// Invocation of a delegate holding no handlers
    #[error("cannot invoke a delegate with no handlers")]
    EmptyInvocation,
}

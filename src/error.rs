use thiserror::Error;

/// The error side of [`Future::get`](crate::Future::get).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error<E> {
    /// The promise was rejected with an application error.
    #[error("promise rejected: {0}")]
    Rejected(E),
    /// The promise was cancelled; carries no payload.
    #[error("promise cancelled")]
    Cancelled,
}

impl<E> Error<E> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Returns the rejection payload, if any.
    pub fn rejected(self) -> Option<E> {
        match self {
            Error::Rejected(err) => Some(err),
            Error::Cancelled => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn test_error_display() {
        let err: Error<String> = Error::Rejected("boom".into());
        assert_eq!(err.to_string(), "promise rejected: boom");
        assert_eq!(Error::<String>::Cancelled.to_string(), "promise cancelled");
    }

    #[test]
    fn test_error_accessors() {
        assert!(Error::<()>::Cancelled.is_cancelled());
        assert_eq!(Error::Rejected(3).rejected(), Some(3));
        assert_eq!(Error::<i32>::Cancelled.rejected(), None);
    }
}

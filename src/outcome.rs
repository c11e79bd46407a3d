use crate::Error;

/// Discriminant of an [`Outcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    Success,
    Failure,
    Cancelled,
}

/// The final, immutable result a future settles with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T, E> {
    Success(T),
    Failure(E),
    Cancelled,
}

impl<T, E> Outcome<T, E> {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Success(_) => OutcomeKind::Success,
            Outcome::Failure(_) => OutcomeKind::Failure,
            Outcome::Cancelled => OutcomeKind::Cancelled,
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind() == OutcomeKind::Success
    }

    pub fn is_failure(&self) -> bool {
        self.kind() == OutcomeKind::Failure
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind() == OutcomeKind::Cancelled
    }

    /// Borrowed view used for completion callbacks. `None` when cancelled.
    pub fn as_completed(&self) -> Option<Result<&T, &E>> {
        match self {
            Outcome::Success(value) => Some(Ok(value)),
            Outcome::Failure(err) => Some(Err(err)),
            Outcome::Cancelled => None,
        }
    }

    pub fn into_result(self) -> Result<T, Error<E>> {
        match self {
            Outcome::Success(value) => Ok(value),
            Outcome::Failure(err) => Err(Error::Rejected(err)),
            Outcome::Cancelled => Err(Error::Cancelled),
        }
    }
}

impl<T, E> From<Result<T, E>> for Outcome<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(err) => Outcome::Failure(err),
        }
    }
}

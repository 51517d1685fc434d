//! Four-way completion result for suspendable operations.

/// How a timeout-aware, abortable operation resolved.
///
/// Success, timeout, abort, and error are four distinct outcomes; the first
/// three live here and hard failures travel in the surrounding `Result`.
/// Collapsing them would lose the cooperative-cancellation semantics: an
/// aborted operation completed benignly, it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The operation ran to completion.
    Completed(T),
    /// The underlying sink operation exceeded the caller's timeout. The
    /// stream records this and fails fast on later operations.
    TimedOut,
    /// The stream was aborted; the operation did not complete and nothing
    /// more will. Not a failure.
    Aborted,
}

impl<T> Outcome<T> {
    /// The completed value, if the operation ran to completion.
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::TimedOut | Self::Aborted => None,
        }
    }

    /// True if the stream was aborted.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    /// True if the operation timed out.
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut)
    }

    /// Map the completed value, preserving timeout and abort outcomes.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Completed(value) => Outcome::Completed(f(value)),
            Self::TimedOut => Outcome::TimedOut,
            Self::Aborted => Outcome::Aborted,
        }
    }
}

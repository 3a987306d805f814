//! Errors raised while turning strings into objects.

use std::fmt;

use mdinspect_core::Class;
use thiserror::Error;

/// No input handler covers the requested class.
#[derive(Debug, Error)]
#[error("no handler is implemented for {}", .class.path())]
pub struct HandlerNotImplemented {
    /// The class a conversion was requested for.
    pub class: &'static Class,
}

/// A handler rejected the literal it was given.
#[derive(Debug, Error)]
#[error("cannot read {input:?} as {expected}: {reason}")]
pub struct ParseError {
    /// The rejected literal.
    pub input: String,
    /// Simple name of the target class.
    pub expected: &'static str,
    /// Why the literal was rejected.
    pub reason: String,
}

impl ParseError {
    /// Build a parse error for `input` against `expected`.
    pub fn new(input: &str, expected: &Class, reason: impl fmt::Display) -> Self {
        Self {
            input: input.to_string(),
            expected: expected.simple_name(),
            reason: reason.to_string(),
        }
    }
}

/// A batch conversion got a different number of literals than classes.
#[derive(Debug, Error)]
#[error("expected {expected} argument(s), got {given}")]
pub struct ArgumentCountMismatch {
    /// Number of target classes.
    pub expected: usize,
    /// Number of literals supplied.
    pub given: usize,
}

/// The single error type that leaves the conversion layer.
///
/// Holds exactly one root cause. Wrapping an error that already is (or
/// directly carries) an `InputError` yields the original cause, so nested
/// conversions never stack wrappers.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct InputError {
    cause: anyhow::Error,
}

impl InputError {
    /// Wrap `cause`, collapsing any `InputError` already wrapped inside it.
    pub fn wrap(cause: impl Into<anyhow::Error>) -> Self {
        let cause = cause.into();
        match cause.downcast::<InputError>() {
            Ok(inner) => inner,
            Err(cause) => Self { cause },
        }
    }

    /// The root cause.
    pub fn cause(&self) -> &anyhow::Error {
        &self.cause
    }

    /// Consume the wrapper and return the root cause.
    pub fn into_cause(self) -> anyhow::Error {
        self.cause
    }

    /// Whether the root cause is a missing handler.
    pub fn is_handler_not_implemented(&self) -> bool {
        self.cause.is::<HandlerNotImplemented>()
    }
}

impl From<ArgumentCountMismatch> for InputError {
    fn from(err: ArgumentCountMismatch) -> Self {
        Self::wrap(err)
    }
}

impl From<HandlerNotImplemented> for InputError {
    fn from(err: HandlerNotImplemented) -> Self {
        Self::wrap(err)
    }
}

impl From<ParseError> for InputError {
    fn from(err: ParseError) -> Self {
        Self::wrap(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdinspect_core::INT;
    use proptest::prelude::*;

    #[test]
    fn wrapping_twice_keeps_the_original_cause() {
        let once = InputError::wrap(ParseError::new("x", &INT, "not a number"));
        let twice = InputError::wrap(once);
        assert!(twice.cause().is::<ParseError>());
        assert_eq!(twice.to_string(), "cannot read \"x\" as int: not a number");
    }

    #[test]
    fn missing_handler_is_detectable() {
        let err = InputError::from(HandlerNotImplemented { class: &INT });
        assert!(err.is_handler_not_implemented());
        assert_eq!(err.to_string(), "no handler is implemented for int");
    }

    proptest! {
        /// Re-wrapping any number of times never adds depth.
        #[test]
        fn wrap_is_idempotent(depth in 1usize..16, message in "[a-z ]{1,24}") {
            let mut err = InputError::wrap(anyhow::anyhow!(message.clone()));
            for _ in 0..depth {
                err = InputError::wrap(anyhow::Error::from(err));
            }
            prop_assert!(!err.cause().is::<InputError>());
            prop_assert_eq!(err.cause().to_string(), message);
        }
    }
}

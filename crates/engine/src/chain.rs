//! Interpreter that walks a token stream as successive method calls.
//!
//! Each step resolves the current token against the [`MethodIndex`] of the
//! current value's runtime class, takes up to as many following tokens as the
//! method declares parameters, converts them through the
//! [`HandlerRegistry`], invokes the method and continues with its return
//! value. The first failure ends the run.
//!
//! Tokens carry no delimiters, so argument slicing is greedy: a method
//! declaring `P` parameters consumes the next `P` tokens (or whatever is
//! left). Under-supply is reported as [`ChainResult::ArgMismatch`].
//!
//! [`MethodIndex`]: crate::MethodIndex

use std::fmt;

use mdinspect_core::{InvokeError, Method, Object, Value};
use tracing::{debug, trace};

use crate::access::AccessPolicy;
use crate::handler::CommandSender;
use crate::input_error::InputError;
use crate::method_index::MethodIndexCache;
use crate::registry::HandlerRegistry;

/// Terminal outcome of a chain run.
#[derive(Debug)]
pub enum ChainResult {
    /// Every token was consumed; holds the last value (possibly null).
    Success(Value),
    /// A step needed a receiver but the current value is null.
    NullReference {
        /// Human-readable explanation.
        reason: String,
    },
    /// A token matched no method of the current class.
    UnknownReference {
        /// Human-readable explanation.
        reason: String,
    },
    /// An invoked method failed, or a conversion failed outside the input layer.
    UnhandledException {
        /// Human-readable explanation.
        reason: String,
        /// What was raised.
        cause: anyhow::Error,
    },
    /// An argument could not be converted.
    InputError {
        /// Human-readable explanation.
        reason: String,
        /// The conversion failure.
        cause: InputError,
    },
    /// Too few tokens remained for the resolved method.
    ArgMismatch {
        /// Human-readable explanation.
        reason: String,
    },
}

/// Discriminant of a [`ChainResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainResultKind {
    /// See [`ChainResult::Success`].
    Success,
    /// See [`ChainResult::NullReference`].
    NullReference,
    /// See [`ChainResult::UnknownReference`].
    UnknownReference,
    /// See [`ChainResult::UnhandledException`].
    UnhandledException,
    /// See [`ChainResult::InputError`].
    InputError,
    /// See [`ChainResult::ArgMismatch`].
    ArgMismatch,
}

impl fmt::Display for ChainResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "success",
            Self::NullReference => "null reference",
            Self::UnknownReference => "unknown reference",
            Self::UnhandledException => "unhandled exception",
            Self::InputError => "input error",
            Self::ArgMismatch => "argument mismatch",
        };
        f.write_str(name)
    }
}

impl ChainResult {
    /// Which variant this is.
    pub fn kind(&self) -> ChainResultKind {
        match self {
            Self::Success(_) => ChainResultKind::Success,
            Self::NullReference { .. } => ChainResultKind::NullReference,
            Self::UnknownReference { .. } => ChainResultKind::UnknownReference,
            Self::UnhandledException { .. } => ChainResultKind::UnhandledException,
            Self::InputError { .. } => ChainResultKind::InputError,
            Self::ArgMismatch { .. } => ChainResultKind::ArgMismatch,
        }
    }

    /// Whether the chain ran to completion.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Explanation for a failed run; `None` on success.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::NullReference { reason }
            | Self::UnknownReference { reason }
            | Self::UnhandledException { reason, .. }
            | Self::InputError { reason, .. }
            | Self::ArgMismatch { reason } => Some(reason),
        }
    }

    /// Underlying error for the exception-carrying variants.
    pub fn cause(&self) -> Option<&anyhow::Error> {
        match self {
            Self::UnhandledException { cause, .. } => Some(cause),
            Self::InputError { cause, .. } => Some(cause.cause()),
            _ => None,
        }
    }

    /// The final value, when the run succeeded.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    /// Consume the result, keeping the final value of a successful run.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }
}

/// Runs chains against a registry and method cache it borrows.
pub struct ChainInterpreter<'a> {
    registry: &'a HandlerRegistry,
    methods: &'a MethodIndexCache,
    access: &'a AccessPolicy,
}

impl<'a> ChainInterpreter<'a> {
    /// Interpreter using `registry` for argument conversion, `methods` for
    /// lookup and `access` to gate internal methods.
    pub fn new(registry: &'a HandlerRegistry, methods: &'a MethodIndexCache, access: &'a AccessPolicy) -> Self {
        Self {
            registry,
            methods,
            access,
        }
    }

    /// Interpret `tokens` starting from `start`.
    ///
    /// Never panics on user input and never fails: every outcome is a
    /// [`ChainResult`]. Zero tokens yields `Success(start)`.
    pub fn run<S: AsRef<str>>(&self, tokens: &[S], start: Value, sender: Option<&dyn CommandSender>) -> ChainResult {
        let mut current = start;
        let mut pos = 0;
        while pos < tokens.len() {
            let token = tokens[pos].as_ref();
            let Some(receiver) = current else {
                return ChainResult::NullReference {
                    reason: format!("cannot call {token} on null"),
                };
            };
            let class = receiver.class();
            let index = self.methods.index_for(class);
            let Some(method) = index.get(token) else {
                return ChainResult::UnknownReference {
                    reason: format!("unknown method {token} for {}", class.simple_name()),
                };
            };

            let required = method.parameter_count();
            let end = tokens.len().min(pos + 1 + required);
            let literals = &tokens[pos + 1..end];
            let args = match self
                .registry
                .instantiate_many(&method.parameter_types()[..literals.len()], literals, sender)
            {
                Ok(args) => args,
                Err(cause) => {
                    return ChainResult::InputError {
                        reason: format!("invalid argument for {token}: {cause}"),
                        cause,
                    };
                }
            };
            if args.len() != required {
                return ChainResult::ArgMismatch {
                    reason: format!(
                        "{token} requires {required} argument(s) and returns {}, got {}",
                        method.return_type_name(),
                        args.len()
                    ),
                };
            }

            trace!(method = token, class = class.path(), "invoking");
            let result = match self.invoke(method, &receiver, &args) {
                Ok(result) => result,
                Err(cause) => {
                    return ChainResult::UnhandledException {
                        reason: format!("{token} raised an exception"),
                        cause,
                    };
                }
            };
            if result.is_none() && method.return_type().is_some() {
                return ChainResult::NullReference {
                    reason: format!("{token} returned null"),
                };
            }
            current = result;
            pos = end;
        }
        debug!(steps = tokens.len(), "chain completed");
        ChainResult::Success(current)
    }

    fn invoke(&self, method: &Method, receiver: &Object, args: &[Value]) -> anyhow::Result<Value> {
        if !self.access.permits(method) {
            return Err(InvokeError::IllegalAccess {
                signature: method.signature_id(),
            }
            .into());
        }
        match method.invoke(receiver, args) {
            Ok(value) => Ok(value),
            Err(InvokeError::Target { cause, .. }) => Err(cause),
            Err(other) => Err(other.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdinspect_core::{object, Class, INT};

    static COUNTER: Class = Class::new("Counter", "test::Counter").with_methods(counter_methods);

    #[derive(Debug)]
    struct Counter;

    impl mdinspect_core::Reflect for Counter {
        fn class(&self) -> &'static Class {
            &COUNTER
        }
    }

    fn counter_methods() -> Vec<Method> {
        vec![
            Method::new(&COUNTER, "self", |recv, _| Ok(Some(recv.clone()))).returns(&COUNTER),
            Method::new(&COUNTER, "reset", |_, _| Ok(None)),
            Method::new(&COUNTER, "fail", |_, _| Err(anyhow::anyhow!("boom"))).returns(&INT),
            Method::new(&COUNTER, "secret", |_, _| Ok(Some(object(7i32))))
                .returns(&INT)
                .internal(),
            Method::new(&COUNTER, "add", |_, args| {
                let a = *mdinspect_core::arg::<i32>(args, 0, &INT)?;
                let b = *mdinspect_core::arg::<i32>(args, 1, &INT)?;
                Ok(Some(object(a + b)))
            })
            .params(&[&INT, &INT])
            .returns(&INT),
        ]
    }

    struct Env {
        registry: HandlerRegistry,
        methods: MethodIndexCache,
        access: AccessPolicy,
    }

    impl Env {
        fn new(access: AccessPolicy) -> Self {
            Self {
                registry: HandlerRegistry::with_builtins(),
                methods: MethodIndexCache::new(),
                access,
            }
        }

        fn run(&self, tokens: &[&str]) -> ChainResult {
            ChainInterpreter::new(&self.registry, &self.methods, &self.access).run(
                tokens,
                Some(object(Counter)),
                None,
            )
        }
    }

    #[test]
    fn arguments_are_sliced_and_converted() {
        let env = Env::new(AccessPolicy::default());
        let result = env.run(&["self()", "add(int,int)", "2", "3", "toString()"]);
        let value = result.into_value().flatten().expect("non-null");
        assert_eq!(value.to_text(), "5");
    }

    #[test]
    fn under_supplied_arguments_are_a_mismatch() {
        let env = Env::new(AccessPolicy::default());
        let result = env.run(&["add(int,int)", "2"]);
        assert_eq!(result.kind(), ChainResultKind::ArgMismatch);
        let reason = result.reason().unwrap_or_default();
        assert!(reason.contains("add(int,int)"));
        assert!(reason.contains('2'));
        assert!(reason.contains("int"));
    }

    #[test]
    fn conversion_failures_are_input_errors() {
        let env = Env::new(AccessPolicy::default());
        let result = env.run(&["add(int,int)", "two", "3"]);
        assert_eq!(result.kind(), ChainResultKind::InputError);
        assert!(result.cause().is_some());
    }

    #[test]
    fn void_result_ends_the_chain_only_when_followed() {
        let env = Env::new(AccessPolicy::default());
        assert!(matches!(env.run(&["reset()"]), ChainResult::Success(None)));
        let result = env.run(&["reset()", "self()"]);
        assert_eq!(result.kind(), ChainResultKind::NullReference);
    }

    #[test]
    fn target_failures_are_unwrapped_once() {
        let env = Env::new(AccessPolicy::default());
        let result = env.run(&["fail()"]);
        assert_eq!(result.kind(), ChainResultKind::UnhandledException);
        assert_eq!(result.cause().map(ToString::to_string).as_deref(), Some("boom"));
    }

    #[test]
    fn internal_methods_follow_the_access_policy() {
        let denied = Env::new(AccessPolicy::default()).run(&["secret()"]);
        assert_eq!(denied.kind(), ChainResultKind::UnhandledException);
        let cause = denied.cause().expect("cause");
        assert!(matches!(
            cause.downcast_ref::<InvokeError>(),
            Some(InvokeError::IllegalAccess { .. })
        ));

        let allowed = Env::new(AccessPolicy::Trusted).run(&["secret()"]);
        assert!(allowed.is_success());
        let listed = Env::new(AccessPolicy::allow(["test::Counter"])).run(&["secret()"]);
        assert!(listed.is_success());
    }

    #[test]
    fn method_tokens_must_match_signature_ids_exactly() {
        let env = Env::new(AccessPolicy::default());
        assert_eq!(env.run(&["self"]).kind(), ChainResultKind::UnknownReference);
        assert_eq!(env.run(&["toString( )"]).kind(), ChainResultKind::UnknownReference);
        let result = env.run(&["toString()", "length()"]);
        assert_eq!(result.into_value().flatten().map(|v| v.class()), Some(&INT));
    }
}

//! Method handles and invocation.

use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::class::Class;
use crate::object::{Object, Value};

/// Host-supplied body of a method. Errors returned here are what the method "threw".
pub type Invoker = Rc<dyn Fn(&Object, &[Value]) -> anyhow::Result<Value>>;

/// Whether a method may be called without elevated access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Callable by anyone.
    Exported,
    /// Declared on a type the host does not export; needs an access grant.
    Internal,
}

/// Failure raised by [`Method::invoke`].
#[derive(Debug, Error)]
pub enum InvokeError {
    /// Wrong number of arguments.
    #[error("{signature} expects {expected} argument(s), got {actual}")]
    ArgumentCount {
        /// Signature ID of the method.
        signature: String,
        /// Declared parameter count.
        expected: usize,
        /// Supplied argument count.
        actual: usize,
    },
    /// An argument is not an instance of the declared parameter class.
    #[error("argument {index} of {signature} must be {expected}, got {actual}")]
    ArgumentType {
        /// Signature ID of the method.
        signature: String,
        /// Zero-based argument position.
        index: usize,
        /// Declared parameter class.
        expected: &'static str,
        /// Runtime class of the supplied argument.
        actual: &'static str,
    },
    /// The receiver is not an instance of the declaring class.
    #[error("{signature} cannot be called on {actual}")]
    Receiver {
        /// Signature ID of the method.
        signature: String,
        /// Runtime class of the receiver.
        actual: &'static str,
    },
    /// The caller lacks access to an internal method.
    #[error("{signature} is not accessible")]
    IllegalAccess {
        /// Signature ID of the method.
        signature: String,
    },
    /// The method body itself failed.
    #[error("{signature} failed")]
    Target {
        /// Signature ID of the method.
        signature: String,
        /// What the method body returned as its error.
        #[source]
        cause: anyhow::Error,
    },
}

/// A callable method of a [`Class`].
#[derive(Clone)]
pub struct Method {
    name: &'static str,
    declaring: &'static Class,
    params: Vec<&'static Class>,
    returns: Option<&'static Class>,
    visibility: Visibility,
    invoker: Invoker,
}

impl Method {
    /// Declare an exported, parameterless, `void` method on `declaring`.
    pub fn new<F>(declaring: &'static Class, name: &'static str, invoker: F) -> Self
    where
        F: Fn(&Object, &[Value]) -> anyhow::Result<Value> + 'static,
    {
        Self {
            name,
            declaring,
            params: Vec::new(),
            returns: None,
            visibility: Visibility::Exported,
            invoker: Rc::new(invoker),
        }
    }

    /// Set the declared parameter classes.
    pub fn params(mut self, params: &[&'static Class]) -> Self {
        self.params = params.to_vec();
        self
    }

    /// Set the declared return class.
    pub fn returns(mut self, class: &'static Class) -> Self {
        self.returns = Some(class);
        self
    }

    /// Mark the method as internal.
    pub fn internal(mut self) -> Self {
        self.visibility = Visibility::Internal;
        self
    }

    /// Method name without parameters.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Class that declares this method.
    pub fn declaring_class(&self) -> &'static Class {
        self.declaring
    }

    /// Declared parameter classes.
    pub fn parameter_types(&self) -> &[&'static Class] {
        &self.params
    }

    /// Number of declared parameters.
    pub fn parameter_count(&self) -> usize {
        self.params.len()
    }

    /// Declared return class; `None` for `void`.
    pub fn return_type(&self) -> Option<&'static Class> {
        self.returns
    }

    /// Simple name of the return class, or `void`.
    pub fn return_type_name(&self) -> &'static str {
        self.returns.map_or("void", Class::simple_name)
    }

    /// Access level of this method.
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Canonical key `name(P1,P2,...)` from the simple names of the parameter types.
    pub fn signature_id(&self) -> String {
        signature_id(self.name, &self.params)
    }

    /// Call the method on `receiver`.
    ///
    /// Argument count, receiver class and argument classes are checked
    /// before the body runs. Errors from the body come back as
    /// [`InvokeError::Target`].
    pub fn invoke(&self, receiver: &Object, args: &[Value]) -> Result<Value, InvokeError> {
        if args.len() != self.params.len() {
            return Err(InvokeError::ArgumentCount {
                signature: self.signature_id(),
                expected: self.params.len(),
                actual: args.len(),
            });
        }
        if !receiver.class().is_a(self.declaring) {
            return Err(InvokeError::Receiver {
                signature: self.signature_id(),
                actual: receiver.class().simple_name(),
            });
        }
        for (index, (arg, param)) in args.iter().zip(&self.params).enumerate() {
            if let Some(arg) = arg {
                if !arg.class().is_a(param) {
                    return Err(InvokeError::ArgumentType {
                        signature: self.signature_id(),
                        index,
                        expected: param.simple_name(),
                        actual: arg.class().simple_name(),
                    });
                }
            }
        }
        (self.invoker)(receiver, args).map_err(|cause| InvokeError::Target {
            signature: self.signature_id(),
            cause,
        })
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("signature", &self.signature_id())
            .field("declaring", &self.declaring)
            .field("returns", &self.return_type_name())
            .field("visibility", &self.visibility)
            .finish()
    }
}

/// Build a signature ID from a method name and its parameter classes.
///
/// Only simple names are used, so two parameter types that share a simple
/// name in different modules produce the same ID.
pub fn signature_id(name: &str, params: &[&'static Class]) -> String {
    let params: Vec<&str> = params.iter().map(|p| p.simple_name()).collect();
    format!("{name}({})", params.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{object, DOUBLE, INT, OBJECT, STRING};

    fn add_method() -> Method {
        Method::new(&INT, "plus", |recv, args| {
            let base = crate::view::<i32>(recv, &INT).copied().unwrap_or_default();
            let delta = args[0]
                .as_ref()
                .and_then(|a| crate::view::<i32>(a, &INT))
                .copied()
                .ok_or_else(|| anyhow::anyhow!("delta is null"))?;
            Ok(Some(object(base + delta)))
        })
        .params(&[&INT])
        .returns(&INT)
    }

    #[test]
    fn signature_uses_simple_names_without_whitespace() {
        let method = Method::new(&OBJECT, "getLocation", |_, _| Ok(None))
            .params(&[&STRING, &DOUBLE, &DOUBLE]);
        assert_eq!(method.signature_id(), "getLocation(String,double,double)");
        assert_eq!(method.signature_id(), method.signature_id());
        assert_eq!(method.return_type_name(), "void");
    }

    #[test]
    fn invoke_runs_the_body() {
        let recv = object(40i32);
        let result = add_method().invoke(&recv, &[Some(object(2i32))]).unwrap();
        let result = result.expect("non-null");
        assert_eq!(crate::view::<i32>(&result, &INT), Some(&42));
    }

    #[test]
    fn invoke_checks_arity_and_types() {
        let recv = object(1i32);
        assert!(matches!(
            add_method().invoke(&recv, &[]),
            Err(InvokeError::ArgumentCount { expected: 1, actual: 0, .. })
        ));
        assert!(matches!(
            add_method().invoke(&recv, &[Some(object("x".to_string()))]),
            Err(InvokeError::ArgumentType { index: 0, .. })
        ));
        assert!(matches!(
            add_method().invoke(&object("s".to_string()), &[Some(object(1i32))]),
            Err(InvokeError::Receiver { .. })
        ));
    }

    #[test]
    fn body_errors_become_target_errors() {
        let recv = object(1i32);
        let err = add_method().invoke(&recv, &[None]).unwrap_err();
        match err {
            InvokeError::Target { cause, .. } => assert_eq!(cause.to_string(), "delta is null"),
            other => panic!("unexpected {other:?}"),
        }
    }
}

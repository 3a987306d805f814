#![warn(missing_docs)]
//! Type marshalling and reflective chain engine.
//!
//! - [`HandlerRegistry`] converts command tokens into typed [`Value`]s and
//!   renders values back to text.
//! - [`MethodIndexCache`] maps signature IDs such as `getBlock(int,int,int)`
//!   to the [`Method`]s of a class.
//! - [`ChainInterpreter`] walks a token stream as successive method calls and
//!   classifies the outcome as a [`ChainResult`].
//!
//! [`Value`]: mdinspect_core::Value
//! [`Method`]: mdinspect_core::Method

mod access;
mod builtin;
mod chain;
mod handler;
mod input_error;
mod method_index;
mod registry;

pub use access::AccessPolicy;
pub use builtin::{
    register_builtin_handlers, ArrayHandler, CollectionFormatter, CollectionHandler, EnumFormatter,
    EnumHandler, Literal, ScalarHandler, ELEMENT_SEPARATOR,
};
pub use chain::{ChainInterpreter, ChainResult, ChainResultKind};
pub use handler::{CommandSender, ConsoleSender, Handler, InputContext, InputHandler, OutputHandler};
pub use input_error::{ArgumentCountMismatch, HandlerNotImplemented, InputError, ParseError};
pub use method_index::{MethodIndex, MethodIndexCache};
pub use registry::{HandlerRegistry, NULL_TOKEN};

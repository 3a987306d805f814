#![warn(missing_docs)]
//! Introspection model shared across the workspace.
//!
//! Rust has no runtime reflection, so reflectable types describe themselves:
//! each one points at a `'static` [`Class`] that lists its supertypes and the
//! [`Method`]s it declares, and live values travel as type-erased [`Object`]
//! handles. [`Value`] is a nullable object reference.

mod class;
mod lang;
mod method;
mod object;

pub use class::{Class, ClassKind, ConstantTable, MethodTable};
pub use lang::{
    arg, receiver, ArrayList, ClassRef, ARRAY_LIST, BOOLEAN, BOOLEAN_ARRAY, BYTE, BYTE_ARRAY,
    CHAR, CHAR_ARRAY, CLASS, COLLECTION, DOUBLE, DOUBLE_ARRAY, ENUM, ENUM_SUPERS, FLOAT,
    FLOAT_ARRAY, INT, INT_ARRAY, LIST, LONG, LONG_ARRAY, OBJECT, SHORT, SHORT_ARRAY, STRING,
    STRING_ARRAY,
};
pub use method::{signature_id, InvokeError, Invoker, Method, Visibility};
pub use object::{object, same_object, value, view, AsAny, EnumConstant, Object, Reflect, Value};

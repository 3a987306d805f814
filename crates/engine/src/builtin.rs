//! Handlers for the classes every registry needs: primitives, strings,
//! arrays, enums and collections.

use std::fmt::Display;
use std::marker::PhantomData;
use std::str::FromStr;

use mdinspect_core::{
    object, view, ArrayList, Class, Object, Reflect, Value, ARRAY_LIST, BOOLEAN, BOOLEAN_ARRAY,
    BYTE, BYTE_ARRAY, CHAR, CHAR_ARRAY, COLLECTION, DOUBLE, DOUBLE_ARRAY, ENUM, FLOAT,
    FLOAT_ARRAY, INT, INT_ARRAY, LONG, LONG_ARRAY, SHORT, SHORT_ARRAY, STRING, STRING_ARRAY,
};

use crate::handler::{Handler, InputContext, InputHandler, OutputHandler};
use crate::input_error::ParseError;
use crate::registry::HandlerRegistry;

/// Separator between array and collection elements.
pub const ELEMENT_SEPARATOR: char = ',';

/// A scalar literal that can be read from a command token.
pub trait Literal: Sized + 'static {
    /// Parse one element, reporting failures as `ParseError`s against `class`.
    fn parse_literal(input: &str, class: &Class) -> Result<Self, ParseError>;
}

macro_rules! numeric_literal {
    ($($ty:ty),+ $(,)?) => {
        $(impl Literal for $ty {
            fn parse_literal(input: &str, class: &Class) -> Result<Self, ParseError> {
                <$ty as FromStr>::from_str(input.trim()).map_err(|err| ParseError::new(input, class, err))
            }
        })+
    };
}

numeric_literal!(i8, i16, i32, i64, f32, f64);

impl Literal for bool {
    fn parse_literal(input: &str, class: &Class) -> Result<Self, ParseError> {
        match input.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" => Ok(true),
            "false" | "no" | "off" => Ok(false),
            _ => Err(ParseError::new(input, class, "expected true or false")),
        }
    }
}

impl Literal for char {
    fn parse_literal(input: &str, class: &Class) -> Result<Self, ParseError> {
        let mut chars = input.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(ParseError::new(input, class, "expected exactly one character")),
        }
    }
}

impl Literal for String {
    fn parse_literal(input: &str, _class: &Class) -> Result<Self, ParseError> {
        Ok(input.to_string())
    }
}

/// Exact input handler for a scalar class.
pub struct ScalarHandler<T> {
    class: &'static Class,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Literal + Reflect> ScalarHandler<T> {
    /// Handler producing `T` for `class`.
    pub fn new(class: &'static Class) -> Self {
        Self {
            class,
            _marker: PhantomData,
        }
    }
}

impl<T: Literal + Reflect> InputHandler for ScalarHandler<T> {
    fn relevant_class(&self) -> &'static Class {
        self.class
    }

    fn instantiate(&self, arg: &str, _target: &'static Class, _cx: &InputContext<'_>) -> anyhow::Result<Value> {
        Ok(Some(object(T::parse_literal(arg, self.class)?)))
    }
}

/// Exact input and output handler for an array class whose elements are `T`.
pub struct ArrayHandler<T> {
    class: &'static Class,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ArrayHandler<T>
where
    T: Literal,
    Vec<T>: Reflect,
{
    /// Handler for `class`, which must be the class of `Vec<T>`.
    pub fn new(class: &'static Class) -> Self {
        Self {
            class,
            _marker: PhantomData,
        }
    }
}

impl<T> InputHandler for ArrayHandler<T>
where
    T: Literal,
    Vec<T>: Reflect,
{
    fn relevant_class(&self) -> &'static Class {
        self.class
    }

    fn instantiate(&self, arg: &str, _target: &'static Class, _cx: &InputContext<'_>) -> anyhow::Result<Value> {
        let component = self.class.component_type().unwrap_or(self.class);
        let elements = split_elements(arg)
            .map(|piece| T::parse_literal(piece, component))
            .collect::<Result<Vec<T>, _>>()?;
        Ok(Some(object(elements)))
    }
}

impl<T> OutputHandler for ArrayHandler<T>
where
    T: Literal + Display,
    Vec<T>: Reflect,
{
    fn relevant_class(&self) -> &'static Class {
        self.class
    }

    fn format(&self, value: &Object, _registry: &HandlerRegistry) -> String {
        match view::<Vec<T>>(value, self.class) {
            Some(elements) => bracketed(elements.iter().map(ToString::to_string)),
            None => value.to_text(),
        }
    }
}

/// Polymorphic input handler resolving enum constants by name.
pub struct EnumHandler;

impl InputHandler for EnumHandler {
    fn relevant_class(&self) -> &'static Class {
        &ENUM
    }

    fn is_polymorphic(&self) -> bool {
        true
    }

    fn instantiate(&self, arg: &str, target: &'static Class, _cx: &InputContext<'_>) -> anyhow::Result<Value> {
        if let Some(constant) = target.enum_constant(arg) {
            return Ok(Some(constant));
        }
        let names: Vec<&str> = target
            .enum_constants()
            .iter()
            .filter_map(|c| c.as_enum().map(|e| e.name()))
            .collect();
        Err(ParseError::new(arg, target, format!("expected one of {}", names.join(", "))).into())
    }
}

/// Output handler printing an enum constant's name.
pub struct EnumFormatter;

impl OutputHandler for EnumFormatter {
    fn relevant_class(&self) -> &'static Class {
        &ENUM
    }

    fn format(&self, value: &Object, _registry: &HandlerRegistry) -> String {
        value
            .as_enum()
            .map(|c| c.name().to_string())
            .unwrap_or_else(|| value.to_text())
    }
}

/// Polymorphic input handler building a list of strings from comma
/// separated elements. Each element goes back through the registry.
pub struct CollectionHandler;

impl InputHandler for CollectionHandler {
    fn relevant_class(&self) -> &'static Class {
        &COLLECTION
    }

    fn is_polymorphic(&self) -> bool {
        true
    }

    fn instantiate(&self, arg: &str, target: &'static Class, cx: &InputContext<'_>) -> anyhow::Result<Value> {
        if !ARRAY_LIST.is_a(target) {
            return Err(ParseError::new(arg, target, "only list collections can be built").into());
        }
        let elements = split_elements(arg)
            .map(|piece| cx.instantiate(&STRING, piece))
            .collect::<Result<Vec<Value>, _>>()?;
        Ok(Some(object(ArrayList(elements))))
    }
}

/// Output handler for collections; elements are formatted through the registry.
pub struct CollectionFormatter;

impl OutputHandler for CollectionFormatter {
    fn relevant_class(&self) -> &'static Class {
        &COLLECTION
    }

    fn format(&self, value: &Object, registry: &HandlerRegistry) -> String {
        match view::<ArrayList>(value, &COLLECTION) {
            Some(list) => bracketed(
                list.elements()
                    .iter()
                    .map(|element| registry.format(element).unwrap_or_else(|| "null".to_string())),
            ),
            None => value.to_text(),
        }
    }
}

fn split_elements(arg: &str) -> impl Iterator<Item = &str> {
    let trimmed = arg.trim();
    let trimmed = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(trimmed);
    trimmed
        .split(ELEMENT_SEPARATOR)
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
}

fn bracketed(items: impl Iterator<Item = String>) -> String {
    let items: Vec<String> = items.collect();
    format!("[{}]", items.join(", "))
}

/// Register every built-in handler into `registry`.
///
/// Scalars and arrays are exact; enums and collections are polymorphic.
pub fn register_builtin_handlers(registry: &mut HandlerRegistry) {
    let handlers = [
        Handler::input(ScalarHandler::<bool>::new(&BOOLEAN)),
        Handler::input(ScalarHandler::<i8>::new(&BYTE)),
        Handler::input(ScalarHandler::<i16>::new(&SHORT)),
        Handler::input(ScalarHandler::<i32>::new(&INT)),
        Handler::input(ScalarHandler::<i64>::new(&LONG)),
        Handler::input(ScalarHandler::<f32>::new(&FLOAT)),
        Handler::input(ScalarHandler::<f64>::new(&DOUBLE)),
        Handler::input(ScalarHandler::<char>::new(&CHAR)),
        Handler::input(ScalarHandler::<String>::new(&STRING)),
        Handler::input(ArrayHandler::<bool>::new(&BOOLEAN_ARRAY)),
        Handler::input(ArrayHandler::<i8>::new(&BYTE_ARRAY)),
        Handler::input(ArrayHandler::<i16>::new(&SHORT_ARRAY)),
        Handler::input(ArrayHandler::<i32>::new(&INT_ARRAY)),
        Handler::input(ArrayHandler::<i64>::new(&LONG_ARRAY)),
        Handler::input(ArrayHandler::<f32>::new(&FLOAT_ARRAY)),
        Handler::input(ArrayHandler::<f64>::new(&DOUBLE_ARRAY)),
        Handler::input(ArrayHandler::<char>::new(&CHAR_ARRAY)),
        Handler::input(ArrayHandler::<String>::new(&STRING_ARRAY)),
        Handler::output(ArrayHandler::<bool>::new(&BOOLEAN_ARRAY)),
        Handler::output(ArrayHandler::<i8>::new(&BYTE_ARRAY)),
        Handler::output(ArrayHandler::<i16>::new(&SHORT_ARRAY)),
        Handler::output(ArrayHandler::<i32>::new(&INT_ARRAY)),
        Handler::output(ArrayHandler::<i64>::new(&LONG_ARRAY)),
        Handler::output(ArrayHandler::<f32>::new(&FLOAT_ARRAY)),
        Handler::output(ArrayHandler::<f64>::new(&DOUBLE_ARRAY)),
        Handler::output(ArrayHandler::<char>::new(&CHAR_ARRAY)),
        Handler::output(ArrayHandler::<String>::new(&STRING_ARRAY)),
        Handler::input(EnumHandler),
        Handler::output(EnumFormatter),
        Handler::input(CollectionHandler),
        Handler::output(CollectionFormatter),
    ];
    for handler in handlers {
        registry.register(handler);
    }
}

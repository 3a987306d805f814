//! Built-in classes: the `Object` root, primitives, strings, arrays, lists,
//! enums and class objects.

use std::rc::Rc;

use anyhow::{anyhow, Context};

use crate::class::{Class, ClassKind};
use crate::method::Method;
use crate::object::{object, same_object, view, Object, Reflect, Value};

/// Root of every class hierarchy.
pub static OBJECT: Class = Class::new("Object", "lang::Object").with_methods(object_methods);
/// Supertype of every enum class.
pub static ENUM: Class = Class::interface("Enum", "lang::Enum").with_methods(enum_methods);
/// Supertype list for enum classes.
pub static ENUM_SUPERS: [&Class; 1] = [&ENUM];
/// Class of [`ClassRef`] objects.
pub static CLASS: Class = Class::new("Class", "lang::Class").with_methods(class_methods);

/// `boolean`
pub static BOOLEAN: Class = Class::primitive("boolean");
/// `byte`
pub static BYTE: Class = Class::primitive("byte");
/// `short`
pub static SHORT: Class = Class::primitive("short");
/// `int`
pub static INT: Class = Class::primitive("int");
/// `long`
pub static LONG: Class = Class::primitive("long");
/// `float`
pub static FLOAT: Class = Class::primitive("float");
/// `double`
pub static DOUBLE: Class = Class::primitive("double");
/// `char`
pub static CHAR: Class = Class::primitive("char");
/// `String`
pub static STRING: Class = Class::new("String", "lang::String").with_methods(string_methods);

/// `boolean[]`
pub static BOOLEAN_ARRAY: Class = Class::array("boolean[]", &BOOLEAN);
/// `byte[]`
pub static BYTE_ARRAY: Class = Class::array("byte[]", &BYTE);
/// `short[]`
pub static SHORT_ARRAY: Class = Class::array("short[]", &SHORT);
/// `int[]`
pub static INT_ARRAY: Class = Class::array("int[]", &INT);
/// `long[]`
pub static LONG_ARRAY: Class = Class::array("long[]", &LONG);
/// `float[]`
pub static FLOAT_ARRAY: Class = Class::array("float[]", &FLOAT);
/// `double[]`
pub static DOUBLE_ARRAY: Class = Class::array("double[]", &DOUBLE);
/// `char[]`
pub static CHAR_ARRAY: Class = Class::array("char[]", &CHAR);
/// `String[]`
pub static STRING_ARRAY: Class = Class::array("String[]", &STRING);

/// Any sized group of elements.
pub static COLLECTION: Class =
    Class::interface("Collection", "lang::Collection").with_methods(collection_methods);
static LIST_SUPERS: [&Class; 1] = [&COLLECTION];
/// Ordered, indexable collection.
pub static LIST: Class = Class::interface("List", "lang::List")
    .extends(&LIST_SUPERS)
    .with_methods(list_methods);
static ARRAY_LIST_SUPERS: [&Class; 1] = [&LIST];
/// Class of [`ArrayList`].
pub static ARRAY_LIST: Class = Class::new("ArrayList", "lang::ArrayList").extends(&ARRAY_LIST_SUPERS);

macro_rules! reflect_scalar {
    ($($ty:ty => $class:ident),+ $(,)?) => {
        $(impl Reflect for $ty {
            fn class(&self) -> &'static Class {
                &$class
            }

            fn to_text(&self) -> String {
                self.to_string()
            }
        })+
    };
}

macro_rules! reflect_array {
    ($($ty:ty => $class:ident),+ $(,)?) => {
        $(impl Reflect for Vec<$ty> {
            fn class(&self) -> &'static Class {
                &$class
            }
        })+
    };
}

reflect_scalar! {
    bool => BOOLEAN,
    i8 => BYTE,
    i16 => SHORT,
    i32 => INT,
    i64 => LONG,
    f32 => FLOAT,
    f64 => DOUBLE,
    char => CHAR,
    String => STRING,
}

reflect_array! {
    bool => BOOLEAN_ARRAY,
    i8 => BYTE_ARRAY,
    i16 => SHORT_ARRAY,
    i32 => INT_ARRAY,
    i64 => LONG_ARRAY,
    f32 => FLOAT_ARRAY,
    f64 => DOUBLE_ARRAY,
    char => CHAR_ARRAY,
    String => STRING_ARRAY,
}

/// Runtime view of a [`Class`] as an object (what `getClass()` returns).
#[derive(Debug, Clone, Copy)]
pub struct ClassRef(pub &'static Class);

impl Reflect for ClassRef {
    fn class(&self) -> &'static Class {
        &CLASS
    }

    fn to_text(&self) -> String {
        format!("class {}", self.0.path())
    }
}

/// Growable list of possibly-null elements.
#[derive(Debug, Clone, Default)]
pub struct ArrayList(pub Vec<Value>);

impl ArrayList {
    /// Build a list from non-null objects.
    pub fn of(items: impl IntoIterator<Item = Object>) -> Self {
        Self(items.into_iter().map(Some).collect())
    }

    /// Elements in order.
    pub fn elements(&self) -> &[Value] {
        &self.0
    }
}

impl Reflect for ArrayList {
    fn class(&self) -> &'static Class {
        &ARRAY_LIST
    }

    fn upcast(&self, class: &'static Class) -> Option<&dyn std::any::Any> {
        if ARRAY_LIST.is_a(class) {
            Some(self)
        } else {
            None
        }
    }
}

/// Read a non-null argument as `T`.
pub fn arg<'a, T: 'static>(args: &'a [Value], index: usize, class: &'static Class) -> anyhow::Result<&'a T> {
    let value = args
        .get(index)
        .with_context(|| format!("missing argument {index}"))?
        .as_ref()
        .ok_or_else(|| anyhow!("argument {index} is null"))?;
    view::<T>(value, class).ok_or_else(|| anyhow!("argument {index} is not {class}"))
}

/// Read the receiver as `T`.
pub fn receiver<'a, T: 'static>(recv: &'a Object, class: &'static Class) -> anyhow::Result<&'a T> {
    view::<T>(recv, class)
        .ok_or_else(|| anyhow!("{} does not expose {class}", recv.class().simple_name()))
}

fn identity_hash(obj: &Object) -> i32 {
    let addr = Rc::as_ptr(obj) as *const () as usize as u64;
    (addr ^ (addr >> 32)) as i32
}

fn object_methods() -> Vec<Method> {
    vec![
        Method::new(&OBJECT, "toString", |recv, _| Ok(Some(object(recv.to_text()))))
            .returns(&STRING),
        Method::new(&OBJECT, "hashCode", |recv, _| Ok(Some(object(identity_hash(recv)))))
            .returns(&INT),
        Method::new(&OBJECT, "getClass", |recv, _| Ok(Some(object(ClassRef(recv.class())))))
            .returns(&CLASS),
        Method::new(&OBJECT, "equals", |recv, args| {
            let equal = match &args[0] {
                None => false,
                Some(other) if same_object(recv, other) => true,
                Some(other) => {
                    let by_value = matches!(recv.class().kind(), ClassKind::Primitive | ClassKind::Enum)
                        || recv.class() == &STRING;
                    by_value && recv.class() == other.class() && recv.to_text() == other.to_text()
                }
            };
            Ok(Some(object(equal)))
        })
        .params(&[&OBJECT])
        .returns(&BOOLEAN),
    ]
}

fn enum_methods() -> Vec<Method> {
    vec![
        Method::new(&ENUM, "name", |recv, _| {
            let constant = recv.as_enum().context("receiver is not an enum constant")?;
            Ok(Some(object(constant.name().to_string())))
        })
        .returns(&STRING),
        Method::new(&ENUM, "ordinal", |recv, _| {
            let constant = recv.as_enum().context("receiver is not an enum constant")?;
            Ok(Some(object(constant.ordinal() as i32)))
        })
        .returns(&INT),
    ]
}

fn class_methods() -> Vec<Method> {
    vec![
        Method::new(&CLASS, "getSimpleName", |recv, _| {
            let class = receiver::<ClassRef>(recv, &CLASS)?.0;
            Ok(Some(object(class.simple_name().to_string())))
        })
        .returns(&STRING),
        Method::new(&CLASS, "getName", |recv, _| {
            let class = receiver::<ClassRef>(recv, &CLASS)?.0;
            Ok(Some(object(class.path().to_string())))
        })
        .returns(&STRING),
        Method::new(&CLASS, "isInterface", |recv, _| {
            let class = receiver::<ClassRef>(recv, &CLASS)?.0;
            Ok(Some(object(class.kind() == ClassKind::Interface)))
        })
        .returns(&BOOLEAN),
        Method::new(&CLASS, "isEnum", |recv, _| {
            let class = receiver::<ClassRef>(recv, &CLASS)?.0;
            Ok(Some(object(class.kind() == ClassKind::Enum)))
        })
        .returns(&BOOLEAN),
        Method::new(&CLASS, "getInterfaces", |recv, _| {
            let class = receiver::<ClassRef>(recv, &CLASS)?.0;
            let supers = class.supertypes().iter().map(|sup| object(ClassRef(sup)));
            Ok(Some(object(ArrayList::of(supers))))
        })
        .returns(&LIST),
        Method::new(&CLASS, "getEnumConstants", |recv, _| {
            let class = receiver::<ClassRef>(recv, &CLASS)?.0;
            if class.kind() != ClassKind::Enum {
                return Ok(None);
            }
            Ok(Some(object(ArrayList::of(class.enum_constants()))))
        })
        .returns(&LIST),
    ]
}

fn string_methods() -> Vec<Method> {
    vec![
        Method::new(&STRING, "length", |recv, _| {
            let s = receiver::<String>(recv, &STRING)?;
            Ok(Some(object(s.chars().count() as i32)))
        })
        .returns(&INT),
        Method::new(&STRING, "isEmpty", |recv, _| {
            let s = receiver::<String>(recv, &STRING)?;
            Ok(Some(object(s.is_empty())))
        })
        .returns(&BOOLEAN),
        Method::new(&STRING, "toUpperCase", |recv, _| {
            let s = receiver::<String>(recv, &STRING)?;
            Ok(Some(object(s.to_uppercase())))
        })
        .returns(&STRING),
        Method::new(&STRING, "toLowerCase", |recv, _| {
            let s = receiver::<String>(recv, &STRING)?;
            Ok(Some(object(s.to_lowercase())))
        })
        .returns(&STRING),
        Method::new(&STRING, "charAt", |recv, args| {
            let s = receiver::<String>(recv, &STRING)?;
            let index = *arg::<i32>(args, 0, &INT)?;
            let c = usize::try_from(index)
                .ok()
                .and_then(|i| s.chars().nth(i))
                .ok_or_else(|| anyhow!("index {index} out of bounds for length {}", s.chars().count()))?;
            Ok(Some(object(c)))
        })
        .params(&[&INT])
        .returns(&CHAR),
        Method::new(&STRING, "contains", |recv, args| {
            let s = receiver::<String>(recv, &STRING)?;
            let needle = arg::<String>(args, 0, &STRING)?;
            Ok(Some(object(s.contains(needle.as_str()))))
        })
        .params(&[&STRING])
        .returns(&BOOLEAN),
    ]
}

fn collection_methods() -> Vec<Method> {
    vec![
        Method::new(&COLLECTION, "size", |recv, _| {
            let list = receiver::<ArrayList>(recv, &COLLECTION)?;
            Ok(Some(object(list.0.len() as i32)))
        })
        .returns(&INT),
        Method::new(&COLLECTION, "isEmpty", |recv, _| {
            let list = receiver::<ArrayList>(recv, &COLLECTION)?;
            Ok(Some(object(list.0.is_empty())))
        })
        .returns(&BOOLEAN),
    ]
}

fn list_methods() -> Vec<Method> {
    vec![Method::new(&LIST, "get", |recv, args| {
        let list = receiver::<ArrayList>(recv, &LIST)?;
        let index = *arg::<i32>(args, 0, &INT)?;
        let element = usize::try_from(index)
            .ok()
            .and_then(|i| list.0.get(i))
            .ok_or_else(|| anyhow!("index {index} out of bounds for length {}", list.0.len()))?;
        Ok(element.clone())
    })
    .params(&[&INT])
    .returns(&OBJECT)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(recv: &Object, class: &'static Class, name: &str, args: &[Value]) -> Value {
        let method = recv
            .class()
            .linearization()
            .into_iter()
            .flat_map(|c| c.declared_methods())
            .find(|m| m.name() == name && m.declaring_class() == class)
            .expect("method exists");
        method.invoke(recv, args).expect("invoke succeeds")
    }

    #[test]
    fn scalars_report_their_class() {
        assert_eq!(object(3i32).class(), &INT);
        assert_eq!(object(true).class(), &BOOLEAN);
        assert_eq!(object(String::from("x")).class(), &STRING);
        assert_eq!(object(vec![1i64, 2]).class(), &LONG_ARRAY);
        assert_eq!(object(3.5f64).to_text(), "3.5");
    }

    #[test]
    fn get_class_returns_class_object() {
        let recv = object(String::from("stone"));
        let class = call(&recv, &OBJECT, "getClass", &[]).expect("non-null");
        let name = call(&class, &CLASS, "getSimpleName", &[]).expect("non-null");
        assert_eq!(name.to_text(), "String");
    }

    #[test]
    fn list_methods_see_through_interfaces() {
        let list = object(ArrayList::of([object(1i32), object(2i32)]));
        let size = call(&list, &COLLECTION, "size", &[]).expect("non-null");
        assert_eq!(size.to_text(), "2");
        let second = call(&list, &LIST, "get", &[Some(object(1i32))]).expect("non-null");
        assert_eq!(second.to_text(), "2");
    }

    #[test]
    fn equals_compares_scalars_by_value() {
        let a = object(7i32);
        let result = call(&a, &OBJECT, "equals", &[Some(object(7i32))]).expect("non-null");
        assert_eq!(result.to_text(), "true");
        let result = call(&a, &OBJECT, "equals", &[Some(object(7i64))]).expect("non-null");
        assert_eq!(result.to_text(), "false");
    }
}

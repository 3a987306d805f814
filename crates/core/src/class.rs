//! Runtime class descriptors.
//!
//! A [`Class`] is a `'static` description of a reflectable type: its simple and
//! qualified names, its direct supertypes and the methods it declares. Classes
//! are compared by address, so every class must live in a `static`.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ptr;

use crate::method::Method;
use crate::object::Object;

/// Produces the methods a class declares (not including inherited ones).
pub type MethodTable = fn() -> Vec<Method>;

/// Produces the constants of an enum class in ordinal order.
pub type ConstantTable = fn() -> Vec<Object>;

/// Broad category of a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    /// An instantiable type.
    Concrete,
    /// A supertype that only contributes methods and assignability.
    Interface,
    /// A scalar value type such as `int` or `boolean`.
    Primitive,
    /// A homogeneous array type such as `int[]`.
    Array,
    /// A closed set of named constants.
    Enum,
}

/// Static descriptor of a reflectable type.
///
/// Supertype lists are passed as references to `static` arrays:
///
/// ```
/// use mdinspect_core::Class;
///
/// static SHAPE: Class = Class::interface("Shape", "demo::Shape");
/// static SQUARE_SUPERS: [&Class; 1] = [&SHAPE];
/// static SQUARE: Class = Class::new("Square", "demo::Square").extends(&SQUARE_SUPERS);
///
/// assert!(SQUARE.is_a(&SHAPE));
/// ```
pub struct Class {
    name: &'static str,
    path: &'static str,
    kind: ClassKind,
    supers: &'static [&'static Class],
    methods: MethodTable,
    constants: Option<ConstantTable>,
    component: Option<&'static Class>,
}

fn no_methods() -> Vec<Method> {
    Vec::new()
}

impl Class {
    /// Declare a concrete class.
    pub const fn new(name: &'static str, path: &'static str) -> Self {
        Self {
            name,
            path,
            kind: ClassKind::Concrete,
            supers: &[],
            methods: no_methods,
            constants: None,
            component: None,
        }
    }

    /// Declare an interface.
    pub const fn interface(name: &'static str, path: &'static str) -> Self {
        Self {
            kind: ClassKind::Interface,
            ..Self::new(name, path)
        }
    }

    /// Declare a primitive value class.
    pub const fn primitive(name: &'static str) -> Self {
        Self {
            kind: ClassKind::Primitive,
            ..Self::new(name, name)
        }
    }

    /// Declare an array class whose elements are `component`.
    pub const fn array(name: &'static str, component: &'static Class) -> Self {
        Self {
            kind: ClassKind::Array,
            component: Some(component),
            ..Self::new(name, name)
        }
    }

    /// Declare an enum class whose constants come from `constants`.
    pub const fn enumeration(name: &'static str, path: &'static str, constants: ConstantTable) -> Self {
        Self {
            kind: ClassKind::Enum,
            constants: Some(constants),
            ..Self::new(name, path)
        }
    }

    /// Set the direct supertypes.
    pub const fn extends(self, supers: &'static [&'static Class]) -> Self {
        Self { supers, ..self }
    }

    /// Set the declared method table.
    pub const fn with_methods(self, methods: MethodTable) -> Self {
        Self { methods, ..self }
    }

    /// Simple name used in signature IDs (e.g. `World`, `int[]`).
    pub fn simple_name(&self) -> &'static str {
        self.name
    }

    /// Qualified name (e.g. `world::World`).
    pub fn path(&self) -> &'static str {
        self.path
    }

    /// Category of this class.
    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    /// Direct supertypes as declared. The implicit [`OBJECT`](crate::OBJECT) root is not listed.
    pub fn supertypes(&self) -> &'static [&'static Class] {
        self.supers
    }

    /// Element class of an array class.
    pub fn component_type(&self) -> Option<&'static Class> {
        self.component
    }

    /// Methods declared directly on this class.
    pub fn declared_methods(&self) -> Vec<Method> {
        (self.methods)()
    }

    /// Whether an instance of `self` may be used where `other` is expected.
    ///
    /// Reflexive and transitive; every class is an `Object`.
    pub fn is_a(&self, other: &Class) -> bool {
        if ptr::eq(self, other) || ptr::eq(other, &crate::OBJECT) {
            return true;
        }
        self.supers.iter().any(|sup| sup.is_a(other))
    }

    /// The class followed by every transitive supertype, each listed once,
    /// ending with the `Object` root.
    ///
    /// Every class comes before all of its supertypes, and direct supertypes
    /// keep their declaration order where the hierarchy allows it.
    pub fn linearization(&'static self) -> Vec<&'static Class> {
        fn visit(class: &'static Class, done: &mut Vec<&'static Class>) {
            if ptr::eq(class, &crate::OBJECT) || done.iter().any(|seen| ptr::eq(*seen, class)) {
                return;
            }
            for sup in class.supers.iter().rev().copied() {
                visit(sup, done);
            }
            done.push(class);
        }

        let mut order = Vec::new();
        visit(self, &mut order);
        order.reverse();
        order.push(&crate::OBJECT);
        order
    }

    /// Constants of an enum class in ordinal order; empty for other kinds.
    pub fn enum_constants(&self) -> Vec<Object> {
        self.constants.map(|table| table()).unwrap_or_default()
    }

    /// Look up an enum constant by name, ignoring ASCII case.
    pub fn enum_constant(&self, name: &str) -> Option<Object> {
        let name = name.trim();
        self.enum_constants().into_iter().find(|constant| {
            constant
                .as_enum()
                .is_some_and(|c| c.name().eq_ignore_ascii_case(name))
        })
    }
}

impl PartialEq for Class {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self, other)
    }
}

impl Eq for Class {}

impl Hash for Class {
    fn hash<H: Hasher>(&self, state: &mut H) {
        ptr::hash(self, state);
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Class({})", self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{COLLECTION, INT, LIST, OBJECT, STRING};

    static ANIMAL: Class = Class::interface("Animal", "test::Animal");
    static PET: Class = Class::interface("Pet", "test::Pet").extends(&PET_SUPERS);
    static PET_SUPERS: [&Class; 1] = [&ANIMAL];
    static DOG: Class = Class::new("Dog", "test::Dog").extends(&DOG_SUPERS);
    static DOG_SUPERS: [&Class; 2] = [&PET, &ANIMAL];

    #[test]
    fn is_a_is_reflexive_and_transitive() {
        assert!(DOG.is_a(&DOG));
        assert!(DOG.is_a(&PET));
        assert!(DOG.is_a(&ANIMAL));
        assert!(!ANIMAL.is_a(&DOG));
        assert!(!INT.is_a(&STRING));
    }

    #[test]
    fn everything_is_an_object() {
        assert!(DOG.is_a(&OBJECT));
        assert!(INT.is_a(&OBJECT));
        assert!(LIST.is_a(&COLLECTION));
    }

    #[test]
    fn linearization_lists_each_class_once() {
        let order: Vec<&str> = DOG.linearization().iter().map(|c| c.simple_name()).collect();
        assert_eq!(order, vec!["Dog", "Pet", "Animal", "Object"]);
    }

    static SHARED: Class = Class::interface("Shared", "test::Shared");
    static SHARED_SUPERS: [&Class; 1] = [&SHARED];
    static LEFT: Class = Class::interface("Left", "test::Left").extends(&SHARED_SUPERS);
    static RIGHT: Class = Class::interface("Right", "test::Right").extends(&SHARED_SUPERS);
    static JOIN_SUPERS: [&Class; 2] = [&LEFT, &RIGHT];
    static JOIN: Class = Class::new("Join", "test::Join").extends(&JOIN_SUPERS);

    #[test]
    fn shared_supertype_follows_every_subtype() {
        let order: Vec<&str> = JOIN.linearization().iter().map(|c| c.simple_name()).collect();
        assert_eq!(order, vec!["Join", "Left", "Right", "Shared", "Object"]);
    }

    #[test]
    fn identity_is_by_address() {
        static TWIN: Class = Class::new("Dog", "test::Dog");
        assert_ne!(&DOG, &TWIN);
        assert_eq!(&DOG, &DOG);
    }
}

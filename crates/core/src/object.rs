//! Type-erased object handles.

use std::any::Any;
use std::fmt;
use std::ptr;
use std::rc::Rc;

use crate::class::Class;

/// Shared handle to a live reflectable object.
pub type Object = Rc<dyn Reflect>;

/// A possibly-null object reference. `None` is null.
pub type Value = Option<Object>;

/// Access to `self` as [`Any`], implemented for every `'static` type.
pub trait AsAny {
    /// Borrow as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Named constant of an enum class.
pub trait EnumConstant {
    /// Declared constant name (e.g. `STONE`).
    fn name(&self) -> &'static str;
    /// Zero-based declaration index.
    fn ordinal(&self) -> usize;
}

/// A value whose runtime class is known and whose methods can be invoked
/// through its [`Class`].
pub trait Reflect: AsAny + fmt::Debug {
    /// Runtime class of this object.
    fn class(&self) -> &'static Class;

    /// View of the part of `self` that implements `class`.
    ///
    /// Types that embed a supertype's state (composition in place of
    /// inheritance) return that embedded part for the supertype's class.
    fn upcast(&self, class: &'static Class) -> Option<&dyn Any> {
        if ptr::eq(self.class(), class) {
            Some(self.as_any())
        } else {
            None
        }
    }

    /// Enum view, for constants of enum classes.
    fn as_enum(&self) -> Option<&dyn EnumConstant> {
        None
    }

    /// Default textual representation used when no output handler applies.
    fn to_text(&self) -> String {
        format!("{self:?}")
    }
}

/// Wrap a value into an [`Object`].
pub fn object<T: Reflect + 'static>(value: T) -> Object {
    Rc::new(value)
}

/// Wrap a value into a non-null [`Value`].
pub fn value<T: Reflect + 'static>(value: T) -> Value {
    Some(object(value))
}

/// Borrow the `T` that `obj` exposes for `class`.
pub fn view<'a, T: Any>(obj: &'a Object, class: &'static Class) -> Option<&'a T> {
    obj.upcast(class)?.downcast_ref::<T>()
}

/// Whether two handles point at the same object.
pub fn same_object(a: &Object, b: &Object) -> bool {
    ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// Declare the class, constant table and [`Reflect`] impl for a fieldless enum.
///
/// ```
/// use mdinspect_core::{reflect_enum, Reflect};
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// pub enum Weather {
///     Clear,
///     Rain,
/// }
///
/// reflect_enum!(Weather, WEATHER, "Weather", "demo::Weather", {
///     Clear => "CLEAR",
///     Rain => "RAIN",
/// });
///
/// assert_eq!(WEATHER.enum_constants().len(), 2);
/// assert!(WEATHER.enum_constant("rain").is_some());
/// ```
#[macro_export]
macro_rules! reflect_enum {
    ($ty:ident, $class:ident, $name:literal, $path:literal, { $($variant:ident => $constant:literal),+ $(,)? }) => {
        #[doc = concat!("Runtime class of [`", stringify!($ty), "`].")]
        pub static $class: $crate::Class =
            $crate::Class::enumeration($name, $path, {
                fn constants() -> Vec<$crate::Object> {
                    vec![$($crate::object($ty::$variant)),+]
                }
                constants
            })
            .extends(&$crate::ENUM_SUPERS);

        impl $ty {
            /// Every constant in declaration order.
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];
        }

        impl $crate::EnumConstant for $ty {
            fn name(&self) -> &'static str {
                match self {
                    $($ty::$variant => $constant),+
                }
            }

            fn ordinal(&self) -> usize {
                $ty::ALL.iter().position(|c| c == self).unwrap_or_default()
            }
        }

        impl $crate::Reflect for $ty {
            fn class(&self) -> &'static $crate::Class {
                &$class
            }

            fn upcast(&self, class: &'static $crate::Class) -> Option<&dyn ::std::any::Any> {
                if ::std::ptr::eq(class, &$class) || ::std::ptr::eq(class, &$crate::ENUM) {
                    Some(self)
                } else {
                    None
                }
            }

            fn as_enum(&self) -> Option<&dyn $crate::EnumConstant> {
                Some(self)
            }

            fn to_text(&self) -> String {
                $crate::EnumConstant::name(self).to_string()
            }
        }
    };
}

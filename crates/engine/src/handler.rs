//! Converter traits plugged into the [`HandlerRegistry`](crate::HandlerRegistry).

use std::fmt;
use std::rc::Rc;

use mdinspect_core::{Class, Object, Value};

use crate::registry::HandlerRegistry;

/// Whoever issued the command a conversion or chain runs for.
pub trait CommandSender {
    /// Display name of the sender.
    fn name(&self) -> &str;

    /// The in-world object that stands for the sender, if any.
    fn subject(&self) -> Value {
        None
    }
}

/// Everything an input handler may consult besides the literal itself.
#[derive(Clone, Copy)]
pub struct InputContext<'a> {
    /// Registry the conversion started from; nested conversions go back through it.
    pub registry: &'a HandlerRegistry,
    /// Sender of the command, when known.
    pub sender: Option<&'a dyn CommandSender>,
}

impl<'a> InputContext<'a> {
    /// Convert a nested literal through the same registry and sender.
    pub fn instantiate(&self, class: &'static Class, arg: &str) -> Result<Value, crate::InputError> {
        self.registry.instantiate(class, arg, self.sender)
    }
}

/// Turns a string into an instance of its relevant class.
pub trait InputHandler {
    /// The class this handler produces.
    fn relevant_class(&self) -> &'static Class;

    /// Polymorphic handlers also serve every subtype of their relevant class.
    fn is_polymorphic(&self) -> bool {
        false
    }

    /// Parse `arg` into an instance of `target`.
    ///
    /// `target` is the requested class, which for a polymorphic handler may be
    /// a subtype of [`relevant_class`](Self::relevant_class).
    fn instantiate(&self, arg: &str, target: &'static Class, cx: &InputContext<'_>) -> anyhow::Result<Value>;
}

/// Renders instances of its relevant class (and its subtypes) as text.
pub trait OutputHandler {
    /// The class this handler renders.
    fn relevant_class(&self) -> &'static Class;

    /// Text for `value`; nested values may be formatted through `registry`.
    fn format(&self, value: &Object, registry: &HandlerRegistry) -> String;
}

/// A registrable converter: one capability, one relevant class.
#[derive(Clone)]
pub enum Handler {
    /// String to object.
    Input(Rc<dyn InputHandler>),
    /// Object to string.
    Output(Rc<dyn OutputHandler>),
}

impl Handler {
    /// Wrap an input handler.
    pub fn input(handler: impl InputHandler + 'static) -> Self {
        Self::Input(Rc::new(handler))
    }

    /// Wrap an output handler.
    pub fn output(handler: impl OutputHandler + 'static) -> Self {
        Self::Output(Rc::new(handler))
    }

    /// The class the handler is registered under.
    pub fn relevant_class(&self) -> &'static Class {
        match self {
            Self::Input(h) => h.relevant_class(),
            Self::Output(h) => h.relevant_class(),
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input(h) => f
                .debug_struct("Input")
                .field("class", h.relevant_class())
                .field("polymorphic", &h.is_polymorphic())
                .finish(),
            Self::Output(h) => f.debug_struct("Output").field("class", h.relevant_class()).finish(),
        }
    }
}

/// Sender used when a command originates from the console.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSender;

impl CommandSender for ConsoleSender {
    fn name(&self) -> &str {
        "console"
    }
}

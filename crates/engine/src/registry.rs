//! Bidirectional registry of type converters.
//!
//! Input resolution tries the exact class first, then the polymorphic
//! handlers in registration order; the first polymorphic handler whose
//! relevant class the target is-a wins. Output resolution scans output
//! handlers in registration order the same way. Reordering registration
//! therefore changes which handler applies.

use std::collections::HashMap;
use std::ptr;
use std::rc::Rc;

use mdinspect_core::{Class, Object, Value};
use tracing::{debug, warn};

use crate::handler::{CommandSender, Handler, InputContext, InputHandler, OutputHandler};
use crate::input_error::{ArgumentCountMismatch, HandlerNotImplemented, InputError};

/// Literal that always converts to null, whatever the target class.
pub const NULL_TOKEN: &str = "\\null\\";

/// Explicitly constructed converter registry. Pass it to whatever needs it.
#[derive(Default)]
pub struct HandlerRegistry {
    exact: HashMap<&'static Class, Rc<dyn InputHandler>>,
    polymorphic: Vec<Rc<dyn InputHandler>>,
    output: Vec<Rc<dyn OutputHandler>>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in primitive, array, enum and
    /// collection handlers.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::builtin::register_builtin_handlers(&mut registry);
        registry
    }

    /// Add a handler.
    ///
    /// Returns false, leaving the registry untouched, when an exact input
    /// handler (or any output handler) is already registered for the same
    /// class. A polymorphic input handler registered for exactly that class is
    /// replaced instead.
    pub fn register(&mut self, handler: Handler) -> bool {
        let class = handler.relevant_class();
        match handler {
            Handler::Input(handler) => {
                if let Some(existing) = self.exact.get(class) {
                    if !existing.is_polymorphic() {
                        warn!(class = class.path(), "input handler already registered");
                        return false;
                    }
                    let existing = Rc::clone(existing);
                    self.forget_polymorphic(&existing);
                }
                if handler.is_polymorphic() {
                    self.polymorphic.push(Rc::clone(&handler));
                }
                debug!(class = class.path(), polymorphic = handler.is_polymorphic(), "registered input handler");
                self.exact.insert(class, handler);
                true
            }
            Handler::Output(handler) => {
                if self.output.iter().any(|h| h.relevant_class() == class) {
                    warn!(class = class.path(), "output handler already registered");
                    return false;
                }
                debug!(class = class.path(), "registered output handler");
                self.output.push(handler);
                true
            }
        }
    }

    /// Remove this exact handler instance. Returns whether it was registered.
    pub fn remove(&mut self, handler: &Handler) -> bool {
        let class = handler.relevant_class();
        match handler {
            Handler::Input(target) => {
                let registered = self
                    .exact
                    .get(class)
                    .is_some_and(|h| ptr::addr_eq(Rc::as_ptr(h), Rc::as_ptr(target)));
                if !registered {
                    return false;
                }
                self.exact.remove(class);
                self.forget_polymorphic(target);
                debug!(class = class.path(), "removed input handler");
                true
            }
            Handler::Output(target) => {
                let before = self.output.len();
                self.output
                    .retain(|h| !ptr::addr_eq(Rc::as_ptr(h), Rc::as_ptr(target)));
                before != self.output.len()
            }
        }
    }

    /// Remove the input and output handlers registered for `class`.
    pub fn remove_for(&mut self, class: &'static Class) -> bool {
        let mut removed = false;
        if let Some(handler) = self.exact.remove(class) {
            self.forget_polymorphic(&handler);
            removed = true;
        }
        let before = self.output.len();
        self.output.retain(|h| h.relevant_class() != class);
        removed |= before != self.output.len();
        if removed {
            debug!(class = class.path(), "removed handlers");
        }
        removed
    }

    fn forget_polymorphic(&mut self, handler: &Rc<dyn InputHandler>) {
        self.polymorphic
            .retain(|h| !ptr::addr_eq(Rc::as_ptr(h), Rc::as_ptr(handler)));
    }

    /// Input handler that would serve `class`.
    pub fn input_handler_for(&self, class: &'static Class) -> Option<Rc<dyn InputHandler>> {
        if let Some(handler) = self.exact.get(class) {
            return Some(Rc::clone(handler));
        }
        self.polymorphic
            .iter()
            .find(|h| class.is_a(h.relevant_class()))
            .cloned()
    }

    /// Output handler that would render an instance of `class`.
    pub fn output_handler_for(&self, class: &'static Class) -> Option<Rc<dyn OutputHandler>> {
        self.output.iter().find(|h| class.is_a(h.relevant_class())).cloned()
    }

    /// Whether some input handler serves `class`.
    pub fn can_instantiate(&self, class: &'static Class) -> bool {
        self.input_handler_for(class).is_some()
    }

    /// Convert `arg` into an instance of `class`.
    ///
    /// [`NULL_TOKEN`] yields null for any class. Every failure, including a
    /// missing handler, comes back as an [`InputError`].
    pub fn instantiate(
        &self,
        class: &'static Class,
        arg: &str,
        sender: Option<&dyn CommandSender>,
    ) -> Result<Value, InputError> {
        if arg == NULL_TOKEN {
            return Ok(None);
        }
        let handler = self
            .input_handler_for(class)
            .ok_or(HandlerNotImplemented { class })?;
        let cx = InputContext {
            registry: self,
            sender,
        };
        handler.instantiate(arg, class, &cx).map_err(InputError::wrap)
    }

    /// Convert `args[i]` into an instance of `classes[i]` for every position.
    ///
    /// Both slices must have the same length. Stops at the first failure;
    /// there are no partial results.
    pub fn instantiate_many<S: AsRef<str>>(
        &self,
        classes: &[&'static Class],
        args: &[S],
        sender: Option<&dyn CommandSender>,
    ) -> Result<Vec<Value>, InputError> {
        if classes.len() != args.len() {
            return Err(ArgumentCountMismatch {
                expected: classes.len(),
                given: args.len(),
            }
            .into());
        }
        classes
            .iter()
            .zip(args)
            .map(|(class, arg)| self.instantiate(class, arg.as_ref(), sender))
            .collect()
    }

    /// Render `value` for display. Null renders as `None`, meaning "print nothing".
    pub fn format(&self, value: &Value) -> Option<String> {
        let value = value.as_ref()?;
        Some(self.format_object(value))
    }

    /// Render a non-null object, falling back to its default representation.
    pub fn format_object(&self, value: &Object) -> String {
        match self.output_handler_for(value.class()) {
            Some(handler) => handler.format(value, self),
            None => value.to_text(),
        }
    }

    /// Number of registered input handlers (exact and polymorphic).
    pub fn input_count(&self) -> usize {
        self.exact.len()
    }

    /// Number of registered polymorphic input handlers.
    pub fn polymorphic_count(&self) -> usize {
        self.polymorphic.len()
    }

    /// Number of registered output handlers.
    pub fn output_count(&self) -> usize {
        self.output.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdinspect_core::{object, view, Reflect, INT, OBJECT, STRING};

    static ANIMAL: Class = Class::interface("Animal", "test::Animal");
    static DOG_SUPERS: [&Class; 1] = [&ANIMAL];
    static DOG: Class = Class::new("Dog", "test::Dog").extends(&DOG_SUPERS);

    #[derive(Debug)]
    struct Dog(&'static str);

    impl Reflect for Dog {
        fn class(&self) -> &'static Class {
            &DOG
        }
    }

    struct Tagged {
        class: &'static Class,
        polymorphic: bool,
        tag: &'static str,
    }

    impl InputHandler for Tagged {
        fn relevant_class(&self) -> &'static Class {
            self.class
        }

        fn is_polymorphic(&self) -> bool {
            self.polymorphic
        }

        fn instantiate(&self, _arg: &str, _target: &'static Class, _cx: &InputContext<'_>) -> anyhow::Result<Value> {
            Ok(Some(object(Dog(self.tag))))
        }
    }

    struct Label(&'static Class, &'static str);

    impl OutputHandler for Label {
        fn relevant_class(&self) -> &'static Class {
            self.0
        }

        fn format(&self, _value: &Object, _registry: &HandlerRegistry) -> String {
            self.1.to_string()
        }
    }

    fn exact(class: &'static Class, tag: &'static str) -> Handler {
        Handler::input(Tagged {
            class,
            polymorphic: false,
            tag,
        })
    }

    fn poly(class: &'static Class, tag: &'static str) -> Handler {
        Handler::input(Tagged {
            class,
            polymorphic: true,
            tag,
        })
    }

    fn tag_of(registry: &HandlerRegistry, class: &'static Class) -> &'static str {
        let value = registry.instantiate(class, "rex", None).unwrap().expect("non-null");
        view::<Dog>(&value, &DOG).expect("dog").0
    }

    #[test]
    fn exact_beats_polymorphic() {
        let mut registry = HandlerRegistry::new();
        assert!(registry.register(poly(&ANIMAL, "poly")));
        assert!(registry.register(exact(&DOG, "exact")));
        assert_eq!(tag_of(&registry, &DOG), "exact");
        assert_eq!(tag_of(&registry, &ANIMAL), "poly");
    }

    #[test]
    fn first_registered_polymorphic_match_wins() {
        let mut registry = HandlerRegistry::new();
        assert!(registry.register(poly(&OBJECT, "object")));
        assert!(registry.register(poly(&ANIMAL, "animal")));
        assert_eq!(tag_of(&registry, &DOG), "object");
    }

    #[test]
    fn duplicate_exact_registration_is_rejected() {
        let mut registry = HandlerRegistry::new();
        assert!(registry.register(exact(&DOG, "first")));
        assert!(!registry.register(exact(&DOG, "second")));
        assert!(!registry.register(poly(&DOG, "third")));
        assert_eq!(tag_of(&registry, &DOG), "first");
        assert_eq!(registry.input_count(), 1);
        assert_eq!(registry.polymorphic_count(), 0);
    }

    #[test]
    fn polymorphic_handler_is_overridable_for_its_own_class() {
        let mut registry = HandlerRegistry::new();
        assert!(registry.register(poly(&DOG, "poly")));
        assert!(registry.register(exact(&DOG, "exact")));
        assert_eq!(tag_of(&registry, &DOG), "exact");
        assert_eq!(registry.polymorphic_count(), 0);
    }

    #[test]
    fn removal_keeps_indices_in_sync() {
        let mut registry = HandlerRegistry::new();
        let handler = poly(&ANIMAL, "poly");
        assert!(registry.register(handler.clone()));
        assert!(!registry.remove(&poly(&ANIMAL, "other")));
        assert!(registry.remove(&handler));
        assert_eq!(registry.polymorphic_count(), 0);
        assert!(!registry.can_instantiate(&DOG));
        assert!(!registry.remove(&handler));

        assert!(registry.register(poly(&ANIMAL, "again")));
        assert!(registry.remove_for(&ANIMAL));
        assert_eq!(registry.polymorphic_count(), 0);
        assert_eq!(registry.input_count(), 0);
        assert!(!registry.remove_for(&ANIMAL));
    }

    #[test]
    fn missing_handler_is_an_input_error() {
        let registry = HandlerRegistry::new();
        let err = registry.instantiate(&DOG, "rex", None).unwrap_err();
        assert!(err.is_handler_not_implemented());
    }

    #[test]
    fn null_token_short_circuits() {
        let registry = HandlerRegistry::new();
        assert!(registry.instantiate(&DOG, NULL_TOKEN, None).unwrap().is_none());
        assert!(registry.instantiate(&INT, NULL_TOKEN, None).unwrap().is_none());
    }

    #[test]
    fn instantiate_many_is_positional_and_all_or_nothing() {
        let mut registry = HandlerRegistry::new();
        registry.register(exact(&DOG, "dog"));
        let values = registry
            .instantiate_many(&[&DOG, &DOG], &["a", NULL_TOKEN], None)
            .unwrap();
        assert_eq!(values.len(), 2);
        assert!(values[0].is_some());
        assert!(values[1].is_none());
        assert!(registry.instantiate_many(&[&DOG, &STRING], &["a", "b"], None).is_err());
    }

    #[test]
    fn instantiate_many_rejects_length_mismatch() {
        let mut registry = HandlerRegistry::new();
        registry.register(exact(&DOG, "dog"));
        let short = registry
            .instantiate_many(&[&DOG, &DOG], &["a"], None)
            .unwrap_err();
        assert!(short.cause().is::<ArgumentCountMismatch>());
        assert_eq!(short.to_string(), "expected 2 argument(s), got 1");

        let long = registry
            .instantiate_many(&[&DOG], &["a", "b"], None)
            .unwrap_err();
        assert!(long.cause().is::<ArgumentCountMismatch>());
        let none: [&str; 0] = [];
        assert!(registry.instantiate_many(&[], &none, None).unwrap().is_empty());
    }

    #[test]
    fn format_uses_first_assignable_output_handler() {
        let mut registry = HandlerRegistry::new();
        assert!(registry.format(&None).is_none());
        let rex = Some(object(Dog("rex")));
        assert_eq!(registry.format(&rex).as_deref(), Some("Dog(\"rex\")"));

        assert!(registry.register(Handler::output(Label(&ANIMAL, "animal"))));
        assert!(registry.register(Handler::output(Label(&DOG, "dog"))));
        assert!(!registry.register(Handler::output(Label(&DOG, "again"))));
        assert_eq!(registry.format(&rex).as_deref(), Some("animal"));
        assert!(registry.format(&None).is_none());

        assert!(registry.remove_for(&ANIMAL));
        assert_eq!(registry.format(&rex).as_deref(), Some("dog"));
    }
}

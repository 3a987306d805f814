//! Per-class method lookup by signature ID.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use mdinspect_core::{Class, Method};
use tracing::debug;

/// Every method callable on one class, keyed by signature ID.
///
/// Built from the class linearization, most general type first, so a
/// redeclaration in a subtype replaces the inherited entry with the same ID.
#[derive(Debug)]
pub struct MethodIndex {
    class: &'static Class,
    methods: HashMap<String, Rc<Method>>,
}

impl MethodIndex {
    /// Index `class` and all of its supertypes.
    pub fn build(class: &'static Class) -> Self {
        let mut methods = HashMap::new();
        for owner in class.linearization().into_iter().rev() {
            for method in owner.declared_methods() {
                methods.insert(method.signature_id(), Rc::new(method));
            }
        }
        Self { class, methods }
    }

    /// Class this index was built for.
    pub fn class(&self) -> &'static Class {
        self.class
    }

    /// Method registered under `signature`.
    pub fn get(&self, signature: &str) -> Option<&Rc<Method>> {
        self.methods.get(signature)
    }

    /// Whether `signature` names a method of the class.
    pub fn contains(&self, signature: &str) -> bool {
        self.methods.contains_key(signature)
    }

    /// Number of distinct signatures.
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// True when the class has no callable methods.
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// All signature IDs in sorted order.
    pub fn signatures(&self) -> Vec<&str> {
        let mut sorted: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        sorted.sort_unstable();
        sorted
    }

    /// Sorted signature IDs starting with `prefix`, ignoring ASCII case.
    pub fn matching_prefix(&self, prefix: &str) -> Vec<&str> {
        let prefix = prefix.to_ascii_lowercase();
        self.signatures()
            .into_iter()
            .filter(|sig| sig.to_ascii_lowercase().starts_with(&prefix))
            .collect()
    }
}

/// Lazily built [`MethodIndex`] per class.
///
/// Indices are kept until [`clear`](Self::clear) is called, which the owning
/// plugin does when it is disabled.
#[derive(Debug, Default)]
pub struct MethodIndexCache {
    indices: RefCell<HashMap<&'static Class, Rc<MethodIndex>>>,
}

impl MethodIndexCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index for `class`, building it on first request.
    pub fn index_for(&self, class: &'static Class) -> Rc<MethodIndex> {
        if let Some(index) = self.indices.borrow().get(class) {
            return Rc::clone(index);
        }
        let index = Rc::new(MethodIndex::build(class));
        debug!(class = class.path(), methods = index.len(), "built method index");
        self.indices.borrow_mut().insert(class, Rc::clone(&index));
        index
    }

    /// Number of cached indices.
    pub fn len(&self) -> usize {
        self.indices.borrow().len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.indices.borrow().is_empty()
    }

    /// Drop every cached index.
    pub fn clear(&self) {
        let dropped = self.indices.borrow().len();
        self.indices.borrow_mut().clear();
        debug!(dropped, "cleared method index cache");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdinspect_core::{object, view, Value, INT, OBJECT, STRING};

    static SHAPE: Class = Class::interface("Shape", "test::Shape").with_methods(shape_methods);
    static SQUARE_SUPERS: [&Class; 1] = [&SHAPE];
    static SQUARE: Class = Class::new("Square", "test::Square")
        .extends(&SQUARE_SUPERS)
        .with_methods(square_methods);

    #[derive(Debug)]
    struct Square(i32);

    impl mdinspect_core::Reflect for Square {
        fn class(&self) -> &'static Class {
            &SQUARE
        }

        fn upcast(&self, class: &'static Class) -> Option<&dyn std::any::Any> {
            SQUARE.is_a(class).then_some(self as &dyn std::any::Any)
        }
    }

    fn shape_methods() -> Vec<Method> {
        vec![
            Method::new(&SHAPE, "describe", |_, _| Ok(Some(object("shape".to_string()))))
                .returns(&STRING),
            Method::new(&SHAPE, "sides", |_, _| Ok(Some(object(0i32)))).returns(&INT),
        ]
    }

    fn square_methods() -> Vec<Method> {
        vec![
            Method::new(&SQUARE, "describe", |_, _| Ok(Some(object("square".to_string()))))
                .returns(&STRING),
            Method::new(&SQUARE, "scaled", |recv, args| {
                let side = view::<Square>(recv, &SQUARE).map(|s| s.0).unwrap_or_default();
                let factor = mdinspect_core::arg::<i32>(args, 0, &INT)?;
                Ok(Some(object(side * factor)))
            })
            .params(&[&INT])
            .returns(&INT),
        ]
    }

    fn call(index: &MethodIndex, sig: &str, args: &[Value]) -> String {
        let recv = object(Square(3));
        let result = index.get(sig).expect("indexed").invoke(&recv, args).expect("invoked");
        result.expect("non-null").to_text()
    }

    #[test]
    fn includes_inherited_and_root_methods() {
        let index = MethodIndex::build(&SQUARE);
        assert!(index.contains("sides()"));
        assert!(index.contains("toString()"));
        assert!(index.contains("equals(Object)"));
        assert!(index.contains("scaled(int)"));
        assert!(!index.contains("scaled(long)"));
        assert!(!index.contains("scaled( int)"));
        assert_eq!(call(&index, "scaled(int)", &[Some(object(4i32))]), "12");
    }

    #[test]
    fn subtype_declaration_replaces_inherited_entry() {
        let index = MethodIndex::build(&SQUARE);
        assert_eq!(call(&index, "describe()", &[]), "square");
        assert_eq!(
            index.get("describe()").map(|m| m.declaring_class()),
            Some(&SQUARE)
        );
    }

    static BASE: Class = Class::interface("Base", "test::Base").with_methods(base_methods);
    static BASE_SUPERS: [&Class; 1] = [&BASE];
    static PLAIN: Class = Class::interface("Plain", "test::Plain").extends(&BASE_SUPERS);
    static TUNED: Class = Class::interface("Tuned", "test::Tuned")
        .extends(&BASE_SUPERS)
        .with_methods(tuned_methods);
    static BOTH_SUPERS: [&Class; 2] = [&PLAIN, &TUNED];
    static BOTH: Class = Class::new("Both", "test::Both").extends(&BOTH_SUPERS);

    fn base_methods() -> Vec<Method> {
        vec![Method::new(&BASE, "mode", |_, _| Ok(Some(object("base".to_string())))).returns(&STRING)]
    }

    fn tuned_methods() -> Vec<Method> {
        vec![Method::new(&TUNED, "mode", |_, _| Ok(Some(object("tuned".to_string())))).returns(&STRING)]
    }

    #[test]
    fn override_survives_a_shared_supertype() {
        let index = MethodIndex::build(&BOTH);
        assert_eq!(
            index.get("mode()").map(|m| m.declaring_class()),
            Some(&TUNED)
        );
        assert_eq!(
            MethodIndex::build(&PLAIN).get("mode()").map(|m| m.declaring_class()),
            Some(&BASE)
        );
    }

    #[test]
    fn signatures_are_sorted_and_filterable() {
        let index = MethodIndex::build(&SQUARE);
        let sigs = index.signatures();
        let mut sorted = sigs.clone();
        sorted.sort_unstable();
        assert_eq!(sigs, sorted);
        assert_eq!(index.matching_prefix("SC"), vec!["scaled(int)"]);
        assert_eq!(index.len(), sigs.len());
        assert_eq!(MethodIndex::build(&OBJECT).class(), &OBJECT);
    }

    #[test]
    fn cache_is_idempotent_until_cleared() {
        let cache = MethodIndexCache::new();
        let first = cache.index_for(&SQUARE);
        let second = cache.index_for(&SQUARE);
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        let rebuilt = cache.index_for(&SQUARE);
        assert!(!Rc::ptr_eq(&first, &rebuilt));
    }
}

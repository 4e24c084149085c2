//! Per-object method enumeration.
//!
//! A [`MethodSupplier`] answers "which methods does this object expose"
//! for one binding family. The answer is the union of:
//!
//! 1. bindings declared by the object's class
//! 2. dynamic methods, if the object has the family's dynamic capability
//! 3. class-declared bindings of each extra object, targeting that object
//! 4. generic methods whose target type the object is assignable to
//!
//! Self-enumeration stops after (2). Class bindings are cached per concrete
//! type. Generic bindings are cached per concrete type and set of matched
//! target types, since upcasts may differ between instances of one type.
//! Dynamic names are read fresh on every enumeration.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::debug;

use luabind_core::{
    Arguments, LuaObject, LuaResult, MethodFlags, MethodResult, PeripheralType, ReturnKind,
};

use crate::family::MethodFamily;
use crate::generator::{Binding, Generator};
use crate::generic::GenericMethods;
use crate::int_cache::IntCache;

/// A binding under one of its exposed names.
pub struct NamedMethod<C> {
    name: &'static str,
    method: Binding<C>,
    non_yielding: bool,
    generic_type: Option<PeripheralType>,
    source: Option<Arc<str>>,
}

impl<C> NamedMethod<C> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn method(&self) -> &Binding<C> {
        &self.method
    }

    /// Whether the method always returns without suspending the caller.
    pub fn non_yielding(&self) -> bool {
        self.non_yielding
    }

    /// Peripheral type of the generic source providing this method.
    pub fn generic_type(&self) -> Option<&PeripheralType> {
        self.generic_type.as_ref()
    }

    /// Id of the generic source providing this method.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

impl<C> Clone for NamedMethod<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            method: self.method.clone(),
            non_yielding: self.non_yielding,
            generic_type: self.generic_type.clone(),
            source: self.source.clone(),
        }
    }
}

impl<C> fmt::Debug for NamedMethod<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedMethod")
            .field("name", &self.name)
            .field("non_yielding", &self.non_yielding)
            .field("generic_type", &self.generic_type)
            .field("source", &self.source)
            .finish()
    }
}

/// A method resolved against the object it runs on.
pub struct BoundMethod<C> {
    pub target: Arc<dyn LuaObject>,
    pub method: Binding<C>,
    pub non_yielding: bool,
}

impl<C> BoundMethod<C> {
    pub fn call(&self, context: &C, arguments: &dyn Arguments) -> LuaResult<MethodResult> {
        self.method.apply(&self.target, context, arguments)
    }
}

impl<C> Clone for BoundMethod<C> {
    fn clone(&self) -> Self {
        Self {
            target: Arc::clone(&self.target),
            method: self.method.clone(),
            non_yielding: self.non_yielding,
        }
    }
}

impl<C> fmt::Debug for BoundMethod<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundMethod")
            .field("target", &self.target)
            .field("non_yielding", &self.non_yielding)
            .finish()
    }
}

type MethodList<C> = Arc<[NamedMethod<C>]>;

/// A concrete type together with the generic target types an instance of
/// it matched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct GenericKey {
    class: TypeId,
    targets: Vec<usize>,
}

/// Enumerates the methods of objects for binding family `F`.
pub struct MethodSupplier<F: MethodFamily> {
    generator: Generator<F::Context>,
    generics: Arc<GenericMethods>,
    dynamic: IntCache<Binding<F::Context>>,
    classes: RwLock<FxHashMap<TypeId, MethodList<F::Context>>>,
    generic_classes: RwLock<FxHashMap<GenericKey, MethodList<F::Context>>>,
}

impl<F: MethodFamily> MethodSupplier<F> {
    pub fn new(generics: Arc<GenericMethods>) -> Self {
        Self {
            generator: Generator::new(),
            generics,
            dynamic: IntCache::new(F::dynamic_method),
            classes: RwLock::new(FxHashMap::default()),
            generic_classes: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn generator(&self) -> &Generator<F::Context> {
        &self.generator
    }

    /// Bindings declared by the class of `object`.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn get_methods(&self, object: &dyn LuaObject) -> MethodList<F::Context> {
        let id = object.class_id();
        if let Some(methods) = self.classes.read().get(&id) {
            return Arc::clone(methods);
        }

        let class = object.class();
        let mut methods = Vec::new();
        for decl in class.methods() {
            let Some(binding) = self.generator.get_method(&class, decl) else {
                continue;
            };
            let non_yielding = is_non_yielding(decl.return_kind(), decl.flags());
            methods.extend(decl.exposed_names().iter().map(|&name| NamedMethod {
                name,
                method: binding.clone(),
                non_yielding,
                generic_type: None,
                source: None,
            }));
        }
        debug!(
            target: "luabind::supplier",
            family = F::NAME,
            class = class.ty().short_name(),
            methods = methods.len(),
            "collected class methods"
        );

        let methods: MethodList<F::Context> = methods.into();
        Arc::clone(self.classes.write().entry(id).or_insert(methods))
    }

    /// Generic methods applicable to `object`.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn generic_methods(&self, object: &dyn LuaObject) -> MethodList<F::Context> {
        let key = GenericKey {
            class: object.class_id(),
            targets: self.generics.matching_targets(object),
        };
        if let Some(methods) = self.generic_classes.read().get(&key) {
            return Arc::clone(methods);
        }

        let mut methods = Vec::new();
        for generic in self.generics.methods_for(&key.targets) {
            let decl = generic.decl();
            let Some(binding) =
                self.generator
                    .get_generic_method(generic.source(), generic.class(), decl)
            else {
                continue;
            };
            let non_yielding = is_non_yielding(decl.return_kind(), decl.flags());
            let source: Arc<str> = generic.source_id().into();
            methods.extend(decl.exposed_names().iter().map(|&name| NamedMethod {
                name,
                method: binding.clone(),
                non_yielding,
                generic_type: generic.tag().cloned(),
                source: Some(Arc::clone(&source)),
            }));
        }

        let methods: MethodList<F::Context> = methods.into();
        Arc::clone(self.generic_classes.write().entry(key).or_insert(methods))
    }

    /// Visit the object's own methods: class-declared and dynamic.
    ///
    /// Returns whether the object has any.
    pub fn for_each_self_method(
        &self,
        object: &dyn LuaObject,
        mut consumer: impl FnMut(&str, &Binding<F::Context>, Option<&NamedMethod<F::Context>>),
    ) -> bool {
        let methods = self.get_methods(object);
        for method in methods.iter() {
            consumer(method.name, &method.method, Some(method));
        }

        let dynamic = F::dynamic_names(object);
        if let Some(names) = &dynamic {
            for (index, name) in names.iter().enumerate() {
                consumer(name, &self.dynamic.get(index), None);
            }
        }

        !methods.is_empty() || dynamic.is_some()
    }

    /// Visit every method callable on `object`, with the object each one
    /// runs on.
    ///
    /// Returns whether any were found.
    pub fn for_each_method(
        &self,
        object: &Arc<dyn LuaObject>,
        mut consumer: impl FnMut(
            &Arc<dyn LuaObject>,
            &str,
            &Binding<F::Context>,
            Option<&NamedMethod<F::Context>>,
        ),
    ) -> bool {
        let mut found = self.for_each_self_method(&**object, |name, binding, named| {
            consumer(object, name, binding, named)
        });

        if let Some(source) = object.as_object_source() {
            for extra in source.extra() {
                let methods = self.get_methods(&*extra);
                found |= !methods.is_empty();
                for method in methods.iter() {
                    consumer(&extra, method.name, &method.method, Some(method));
                }
            }
        }

        let generics = self.generic_methods(&**object);
        found |= !generics.is_empty();
        for method in generics.iter() {
            consumer(object, method.name, &method.method, Some(method));
        }

        found
    }

    /// Names of every method callable on `object`, in dispatch order.
    pub fn method_names(&self, object: &Arc<dyn LuaObject>) -> Vec<String> {
        let mut names = Vec::new();
        self.for_each_method(object, |_, name, _, _| names.push(name.to_owned()));
        names
    }

    /// Every method callable on `object`, keyed by name.
    ///
    /// When several methods share a name the one visited last wins.
    pub fn collect_methods(
        &self,
        object: &Arc<dyn LuaObject>,
    ) -> FxHashMap<String, BoundMethod<F::Context>> {
        let mut methods = FxHashMap::default();
        self.for_each_method(object, |target, name, binding, named| {
            methods.insert(
                name.to_owned(),
                BoundMethod {
                    target: Arc::clone(target),
                    method: binding.clone(),
                    non_yielding: named.is_some_and(NamedMethod::non_yielding),
                },
            );
        });
        methods
    }
}

impl<F: MethodFamily> fmt::Debug for MethodSupplier<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodSupplier")
            .field("family", &F::NAME)
            .field("classes", &self.classes.read().len())
            .field("generated", &self.generator.generated())
            .finish()
    }
}

fn is_non_yielding(return_kind: ReturnKind, flags: MethodFlags) -> bool {
    return_kind != ReturnKind::Envelope && !flags.contains(MethodFlags::MAIN_THREAD)
}

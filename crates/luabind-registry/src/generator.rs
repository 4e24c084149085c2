//! Binding generation and the binding cache.
//!
//! [`Generator`] turns a [`MethodDecl`] into a [`Binding`]: a uniform
//! `(target, context, arguments) -> LuaResult<MethodResult>` callable. The
//! steps are:
//!
//! 1. validate the declaration into a [`MethodDescriptor`]
//! 2. build one argument extractor per parameter
//! 3. compose the extractors with the type-erased host function
//! 4. wrap main-thread methods in the deferral wrapper
//!
//! Results are cached per `(owner type, method)`. Lookups of cached entries
//! take a shared read lock; a miss creates a once-cell slot and builds
//! outside the map lock, so concurrent first lookups of one key produce a
//! single binding. Rejected declarations are cached too.

use std::any::TypeId;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, error};

use luabind_core::{
    Arg, Arguments, ClassDecl, ConversionError, GenericSource, Invoker, LuaError, LuaObject,
    LuaResult, MethodDecl, MethodFlags, MethodResult, Outcome, Thrown, TypeRef,
};

use crate::descriptor::{self, MethodDescriptor, Receiver};
use crate::family::ContextValues;
use crate::main_thread;
use crate::marshal::{self, Extractor};

// ============================================================================
// Binding
// ============================================================================

type BindingFn<C> =
    dyn Fn(&Arc<dyn LuaObject>, &C, &dyn Arguments) -> LuaResult<MethodResult> + Send + Sync;

/// A callable method binding for context `C`.
///
/// Bindings are immutable and shared; clones refer to the same callable.
pub struct Binding<C> {
    call: Arc<BindingFn<C>>,
}

impl<C> Binding<C> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Arc<dyn LuaObject>, &C, &dyn Arguments) -> LuaResult<MethodResult>
            + Send
            + Sync
            + 'static,
    {
        Self { call: Arc::new(f) }
    }

    /// Call the bound method on `target`.
    pub fn apply(
        &self,
        target: &Arc<dyn LuaObject>,
        context: &C,
        arguments: &dyn Arguments,
    ) -> LuaResult<MethodResult> {
        (self.call)(target, context, arguments)
    }

    /// Whether two bindings are the same callable.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.call, &b.call)
    }
}

impl<C> Clone for Binding<C> {
    fn clone(&self) -> Self {
        Self {
            call: Arc::clone(&self.call),
        }
    }
}

impl<C> fmt::Debug for Binding<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Binding({:p})", Arc::as_ptr(&self.call) as *const ())
    }
}

// ============================================================================
// Generator
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    owner: TypeId,
    /// Address of the generic source a binding is tied to, or zero.
    source: usize,
    method: &'static str,
}

type Slot<C> = Arc<OnceCell<Option<Binding<C>>>>;

/// Builds and caches bindings for one family's context type.
pub struct Generator<C> {
    context: Vec<TypeRef>,
    cache: RwLock<FxHashMap<CacheKey, Slot<C>>>,
    generated: AtomicUsize,
}

impl<C: ContextValues> Generator<C> {
    pub fn new() -> Self {
        Self {
            context: C::types(),
            cache: RwLock::new(FxHashMap::default()),
            generated: AtomicUsize::new(0),
        }
    }

    /// The context types host methods of this family may declare.
    pub fn context_types(&self) -> &[TypeRef] {
        &self.context
    }

    /// Number of bindings built so far. Cache hits do not count.
    pub fn generated(&self) -> usize {
        self.generated.load(Ordering::Relaxed)
    }

    /// The binding for instance method `decl` of `class`, or `None` if the
    /// declaration is invalid.
    pub fn get_method(&self, class: &ClassDecl, decl: &MethodDecl) -> Option<Binding<C>> {
        let key = CacheKey {
            owner: class.ty().id,
            source: 0,
            method: decl.name(),
        };
        self.lookup(key, || self.build(class, decl, None))
    }

    /// The binding for generic method `decl` provided by `source`.
    pub fn get_generic_method(
        &self,
        source: &Arc<dyn GenericSource>,
        class: &ClassDecl,
        decl: &MethodDecl,
    ) -> Option<Binding<C>> {
        let key = CacheKey {
            owner: class.ty().id,
            source: Arc::as_ptr(source) as *const () as usize,
            method: decl.name(),
        };
        self.lookup(key, || self.build(class, decl, Some(Arc::clone(source))))
    }

    fn lookup(
        &self,
        key: CacheKey,
        build: impl FnOnce() -> Option<Binding<C>>,
    ) -> Option<Binding<C>> {
        let existing = self.cache.read().get(&key).cloned();
        let slot = match existing {
            Some(slot) => slot,
            None => Arc::clone(self.cache.write().entry(key).or_default()),
        };
        slot.get_or_init(build).clone()
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    fn build(
        &self,
        class: &ClassDecl,
        decl: &MethodDecl,
        source: Option<Arc<dyn GenericSource>>,
    ) -> Option<Binding<C>> {
        let receiver = match source {
            Some(_) => Receiver::Generic,
            None => Receiver::Instance,
        };
        let descriptor = match descriptor::extract(class, decl, receiver, &self.context) {
            Ok(descriptor) => descriptor,
            Err(rejection) => {
                descriptor::report(&rejection);
                return None;
            }
        };

        let name: Arc<str> = descriptor.qualified_name().into();
        debug!(
            target: "luabind::generator",
            method = %name,
            parameters = descriptor.parameters.len(),
            "generated binding"
        );
        self.generated.fetch_add(1, Ordering::Relaxed);

        let binding = compose(&descriptor, decl.invoker().clone(), source, Arc::clone(&name));
        if descriptor.flags.contains(MethodFlags::MAIN_THREAD) {
            Some(main_thread::wrap(binding, name))
        } else {
            Some(binding)
        }
    }
}

impl<C: ContextValues> Default for Generator<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Chain the parameter extractors with the host function.
fn compose<C: ContextValues>(
    descriptor: &MethodDescriptor,
    invoker: Invoker,
    source: Option<Arc<dyn GenericSource>>,
    name: Arc<str>,
) -> Binding<C> {
    let extractors: Vec<Extractor<C>> = marshal::extractors(&descriptor.parameters);

    Binding::<C>::new(move |target, context, arguments| {
        let mut values = Vec::with_capacity(extractors.len());
        for extract in &extractors {
            values.push(extract(context, arguments)?);
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            invoke(&invoker, source.as_deref(), &**target, values)
        }));
        settle(&name, outcome)
    })
}

fn invoke(
    invoker: &Invoker,
    source: Option<&dyn GenericSource>,
    target: &dyn LuaObject,
    values: Vec<Arg>,
) -> Outcome {
    match invoker {
        Invoker::Instance(call) => call(target.as_any(), values),
        Invoker::Generic { target: ty, call } => {
            let (Some(source), Some(view)) = (source, target.assignable_to(ty.id)) else {
                return Err(ConversionError::Receiver { expected: ty.name }.into());
            };
            call(source.as_any(), view, values)
        }
    }
}

/// Map a host outcome onto what the script sees.
fn settle(name: &str, outcome: std::thread::Result<Outcome>) -> LuaResult<MethodResult> {
    match outcome {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(Thrown::Lua(error))) => Err(error),
        Ok(Err(Thrown::Host(error))) => {
            error!(
                target: "luabind::generator",
                method = name,
                error = %error,
                "unexpected error calling host method"
            );
            Err(LuaError::internal(format!("Internal error in {name}")))
        }
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
                .unwrap_or("<non-string panic>");
            error!(
                target: "luabind::generator",
                method = name,
                panic = message,
                "host method panicked"
            );
            Err(LuaError::internal(format!("Internal error in {name}")))
        }
    }
}

//! Binding families.
//!
//! A family fixes the context values every binding receives and how
//! runtime-named methods are dispatched. Two families exist:
//!
//! - [`LuaMethods`]: computer APIs and plain objects, context `(LuaContext,)`
//! - [`PeripheralMethods`]: peripherals, context `(LuaContext, ComputerAccess)`

use std::any::Any;
use std::sync::Arc;

use luabind_core::{ComputerAccess, LuaContext, LuaError, LuaObject, TypeRef};
use tracing::error;

use crate::generator::Binding;

/// The context tuple passed to every binding of a family.
pub trait ContextValues: Clone + Send + Sync + 'static {
    /// Types a host method may declare to receive a context value.
    fn types() -> Vec<TypeRef>;

    /// The context value at `index` of [`ContextValues::types`].
    fn value(&self, index: usize) -> Option<Box<dyn Any + Send>>;

    fn lua_context(&self) -> &dyn LuaContext;
}

/// Context of [`LuaMethods`].
pub type LuaCtx = (Arc<dyn LuaContext>,);

/// Context of [`PeripheralMethods`].
pub type PeripheralCtx = (Arc<dyn LuaContext>, Arc<dyn ComputerAccess>);

impl ContextValues for LuaCtx {
    fn types() -> Vec<TypeRef> {
        vec![TypeRef::of::<Arc<dyn LuaContext>>()]
    }

    fn value(&self, index: usize) -> Option<Box<dyn Any + Send>> {
        match index {
            0 => Some(Box::new(Arc::clone(&self.0))),
            _ => None,
        }
    }

    fn lua_context(&self) -> &dyn LuaContext {
        &*self.0
    }
}

impl ContextValues for PeripheralCtx {
    fn types() -> Vec<TypeRef> {
        vec![
            TypeRef::of::<Arc<dyn LuaContext>>(),
            TypeRef::of::<Arc<dyn ComputerAccess>>(),
        ]
    }

    fn value(&self, index: usize) -> Option<Box<dyn Any + Send>> {
        match index {
            0 => Some(Box::new(Arc::clone(&self.0))),
            1 => Some(Box::new(Arc::clone(&self.1))),
            _ => None,
        }
    }

    fn lua_context(&self) -> &dyn LuaContext {
        &*self.0
    }
}

/// A set of bindings sharing one context shape.
pub trait MethodFamily: Send + Sync + 'static {
    type Context: ContextValues;

    const NAME: &'static str;

    /// Runtime method names of `object`, if it has the family's dynamic capability.
    fn dynamic_names(object: &dyn LuaObject) -> Option<Vec<String>>;

    /// The binding calling dynamic method `index`.
    fn dynamic_method(index: usize) -> Binding<Self::Context>;
}

/// Bindings for computer APIs and plain objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct LuaMethods;

/// Bindings for peripherals.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeripheralMethods;

/// A bound method of the [`LuaMethods`] family.
pub type LuaMethod = Binding<LuaCtx>;

/// A bound method of the [`PeripheralMethods`] family.
pub type PeripheralMethod = Binding<PeripheralCtx>;

fn lost_capability(target: &dyn LuaObject, capability: &str) -> LuaError {
    let type_name = luabind_core::AsAny::type_name(target);
    error!(
        target: "luabind::supplier",
        object = type_name,
        capability,
        "dynamic method called on an object without its capability"
    );
    LuaError::internal(format!("{type_name} is no longer a {capability}"))
}

impl MethodFamily for LuaMethods {
    type Context = LuaCtx;

    const NAME: &'static str = "lua";

    fn dynamic_names(object: &dyn LuaObject) -> Option<Vec<String>> {
        object.as_dynamic_lua().map(|d| d.method_names())
    }

    fn dynamic_method(index: usize) -> Binding<LuaCtx> {
        Binding::new(move |target, context: &LuaCtx, arguments| {
            match target.as_dynamic_lua() {
                Some(dynamic) => dynamic.call_method(&*context.0, index, arguments),
                None => Err(lost_capability(&**target, "DynamicLuaObject")),
            }
        })
    }
}

impl MethodFamily for PeripheralMethods {
    type Context = PeripheralCtx;

    const NAME: &'static str = "peripheral";

    fn dynamic_names(object: &dyn LuaObject) -> Option<Vec<String>> {
        object.as_dynamic_peripheral().map(|d| d.method_names())
    }

    fn dynamic_method(index: usize) -> Binding<PeripheralCtx> {
        Binding::new(move |target, context: &PeripheralCtx, arguments| {
            match target.as_dynamic_peripheral() {
                Some(dynamic) => dynamic.call_method(&*context.1, &*context.0, index, arguments),
                None => Err(lost_capability(&**target, "DynamicPeripheral")),
            }
        })
    }
}

//! Expose host objects to Lua scripts.
//!
//! Host types declare their script-callable methods with `#[lua_function]`
//! (or the [`MethodDecl`](core::MethodDecl) builder). A
//! [`BindingRegistry`](registry::BindingRegistry) validates the
//! declarations, generates one binding per method and enumerates the
//! methods of any object, including runtime-named methods, methods of
//! delegate objects and methods contributed by generic sources.
//!
//! ```ignore
//! use luabind::prelude::*;
//!
//! struct Counter(AtomicI32);
//!
//! impl Counter {
//!     #[lua_function]
//!     pub fn add(&self, by: Option<i32>) -> i32 { ... }
//! }
//!
//! impl LuaObject for Counter {
//!     fn class(&self) -> ClassDecl {
//!         ClassDecl::of::<Counter>().method(Counter::add__lua)
//!     }
//! }
//!
//! let registry = BindingRegistry::new();
//! let methods = registry.lua_methods().collect_methods(&counter);
//! methods["add"].call(&context, &ObjectArguments::new(vec![Value::from(2)]))?;
//! ```

pub use luabind_core as core;
pub use luabind_macros::{LuaEnum, lua_function};
pub use luabind_registry as registry;

pub mod prelude {
    pub use luabind_core::{
        Arguments, ArgumentsExt, ClassDecl, Coerced, ComputerAccess, DynamicLuaObject,
        DynamicPeripheral, GenericSource, IntoLua, LuaBytes, LuaContext, LuaEnum, LuaError,
        LuaObject, LuaResult, LuaTable, MethodDecl, MethodResult, ObjectArguments, ObjectSource,
        PeripheralType, Table, TableKey, Value,
    };
    pub use luabind_macros::{LuaEnum, lua_function};
    pub use luabind_registry::{
        Binding, BindingConfig, BindingRegistry, LuaCtx, MainThread, MainThreadContext,
        MethodSupplier, NamedMethod, PeripheralCtx,
    };
}

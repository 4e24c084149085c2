//! Core vocabulary shared by host objects and the binding registry.
//!
//! This crate defines what host code writes against:
//!
//! - [`Value`], [`Table`] and [`LuaBytes`]: script values
//! - [`Arguments`]: the positional argument reader handed to every call
//! - [`MethodResult`] and [`Pending`]: immediate and deferred results
//! - [`LuaError`]: errors shown to scripts
//! - [`LuaObject`] and its capabilities: what can be exposed
//! - [`ClassDecl`] and [`MethodDecl`]: what an object exposes
//!
//! The registry crate turns declarations into callable bindings.

pub mod arguments;
pub mod context;
pub mod convert;
pub mod decl;
pub mod enums;
pub mod error;
pub mod object;
pub mod result;
pub mod table;
pub mod value;

pub use arguments::{Arguments, ArgumentsExt, Coerced, ObjectArguments};
pub use context::{ComputerAccess, ComputerRef, LuaContext, LuaContextRef, LuaTask};
pub use convert::{
    Arg, GenericFn, HostFn, HostParam, HostReturn, context_from_arg, enum_from_arg,
    is_script_error,
};
pub use decl::{
    ClassDecl, GenericCall, HostType, InstanceCall, Invoker, MethodDecl, MethodFlags, Modifiers,
    Outcome, Primitive, ReturnKind, TypeRef,
};
pub use enums::{EnumInfo, LuaEnum};
pub use error::{
    ConversionError, ErrorKind, LuaError, LuaResult, Thrown, bad_argument, bad_argument_of,
    bad_field, bad_table_item, check_finite, numeric_type, unknown_option,
};
pub use object::{
    AsAny, DynamicLuaObject, DynamicPeripheral, GenericSource, LuaObject, ObjectSource,
    PeripheralType,
};
pub use result::{Completer, MethodResult, Pending};
pub use table::LuaTable;
pub use value::{IntoLua, LuaBytes, Table, TableKey, Value};

//! luabind proc macros.
//!
//! - `#[lua_function]`: declare a method callable from scripts
//! - `#[derive(LuaEnum)]`: pass an enum by member name
//!
//! # Example
//!
//! ```ignore
//! use luabind_macros::{lua_function, LuaEnum};
//!
//! #[derive(Clone, Copy, LuaEnum)]
//! pub enum Side {
//!     #[lua(name = "top")]
//!     Top,
//!     Bottom,
//! }
//!
//! impl Turtle {
//!     #[lua_function(main_thread)]
//!     pub fn dig(&self, side: Option<Side>) -> LuaResult<bool> { ... }
//! }
//!
//! let class = ClassDecl::of::<Turtle>().method(Turtle::dig__lua);
//! ```

use proc_macro::TokenStream;

mod attrs;
mod derive_enum;
mod function;

/// Declare a method callable from scripts.
///
/// Emits the method unchanged plus a hidden `<name>__lua()` function
/// returning its [`MethodDecl`]. Add it to a class with
/// `ClassDecl::method(Type::name__lua)`.
///
/// # Attributes
///
/// - `name = "..."`: expose under another name
/// - `names = ["...", ...]`: expose under several names
/// - `main_thread`: run on the main thread, suspending the caller
/// - `unsafe_tables`: receive tables as shared `LuaTable` views
/// - `generic`: a method of a generic source; the parameter after `&self`
///   is the target object
///
/// The method must take `&self`. A `pub` method is public; anything else is
/// rejected when the class is bound. Associated functions are declared as
/// static and skipped with a warning.
///
/// [`MethodDecl`]: ../luabind_core/decl/struct.MethodDecl.html
#[proc_macro_attribute]
pub fn lua_function(attr: TokenStream, item: TokenStream) -> TokenStream {
    function::lua_function_impl(attr, item)
}

/// Derive `LuaEnum` and `HostParam` for a field-less enum.
///
/// Members are matched case-insensitively against their variant names, or
/// against `#[lua(name = "...")]` when given. The enum must also be `Copy`.
#[proc_macro_derive(LuaEnum, attributes(lua))]
pub fn derive_lua_enum(input: TokenStream) -> TokenStream {
    derive_enum::derive_lua_enum_impl(input)
}

//! Method and class declarations.
//!
//! A [`ClassDecl`] describes the methods a host type exposes. Each
//! [`MethodDecl`] carries the metadata the registry validates (visibility,
//! flags, parameter shapes, return kind, declared error) together with a
//! type-erased invoker built from the host function itself.
//!
//! Declarations are usually generated by `#[lua_function]`, which emits a
//! `name__lua()` companion for each annotated method:
//!
//! ```ignore
//! impl Turtle {
//!     #[lua_function]
//!     pub fn forward(&self) -> LuaResult<bool> { ... }
//! }
//!
//! let class = ClassDecl::of::<Turtle>().method(Turtle::forward__lua);
//! ```
//!
//! The builder form is equivalent:
//!
//! ```
//! use luabind_core::{ClassDecl, MethodDecl, MethodFlags};
//!
//! struct Turtle;
//!
//! impl Turtle {
//!     fn refuel(&self, count: Option<i32>) -> i32 {
//!         count.unwrap_or(64)
//!     }
//! }
//!
//! let class = ClassDecl::of::<Turtle>()
//!     .declare(MethodDecl::method("refuel", Turtle::refuel).main_thread());
//! assert!(class.methods()[0].flags().contains(MethodFlags::MAIN_THREAD));
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use bitflags::bitflags;

use crate::convert::{Arg, GenericFn, HostFn};
use crate::enums::EnumInfo;
use crate::error::{ConversionError, Thrown};
use crate::result::MethodResult;

// ============================================================================
// Type references
// ============================================================================

/// A host type's identity and display name.
#[derive(Clone, Copy)]
pub struct TypeRef {
    pub id: TypeId,
    pub name: &'static str,
}

impl TypeRef {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The name without its module path.
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        match base.rfind("::") {
            Some(i) => &self.name[i + 2..],
            None => self.name,
        }
    }

    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeRef {}

impl Hash for TypeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

// ============================================================================
// Flags
// ============================================================================

bitflags! {
    /// Declaration modifiers of a host method.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        /// Visible outside its module.
        const PUBLIC = 1 << 0;
        /// Has no receiver.
        const STATIC = 1 << 1;
        /// Cannot be overridden.
        const FINAL = 1 << 2;
    }
}

bitflags! {
    /// Binding behaviour requested by a declaration.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MethodFlags: u8 {
        /// Run on the main thread; callers are suspended until it completes.
        const MAIN_THREAD = 1 << 0;
        /// Receive table arguments as shared [`crate::LuaTable`] views.
        const UNSAFE = 1 << 1;
    }
}

// ============================================================================
// Parameter and return shapes
// ============================================================================

/// Primitive parameter kinds read directly from an argument position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Int,
    Long,
    Double,
    Boolean,
    String,
    Bytes,
    Table,
    /// Only accepted on `unsafe_tables` methods.
    UnsafeTable,
}

impl Primitive {
    /// The script type name this primitive is read from.
    pub fn lua_name(self) -> &'static str {
        match self {
            Primitive::Int | Primitive::Long | Primitive::Double => "number",
            Primitive::Boolean => "boolean",
            Primitive::String | Primitive::Bytes => "string",
            Primitive::Table | Primitive::UnsafeTable => "table",
        }
    }

    pub fn rust_name(self) -> &'static str {
        match self {
            Primitive::Int => "i32",
            Primitive::Long => "i64",
            Primitive::Double => "f64",
            Primitive::Boolean => "bool",
            Primitive::String => "String",
            Primitive::Bytes => "LuaBytes",
            Primitive::Table => "Table",
            Primitive::UnsafeTable => "LuaTable",
        }
    }
}

/// The declared shape of one host method parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum HostType {
    /// The whole argument list.
    Arguments,
    /// Any script value.
    Any,
    Primitive(Primitive),
    Enum(EnumInfo),
    Optional(Box<HostType>),
    Coerced(Box<HostType>),
    /// Any other type; only valid if it names a context value.
    Opaque(TypeRef),
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostType::Arguments => f.write_str("ObjectArguments"),
            HostType::Any => f.write_str("Value"),
            HostType::Primitive(p) => f.write_str(p.rust_name()),
            HostType::Enum(info) => f.write_str(info.name),
            HostType::Optional(inner) => write!(f, "Option<{inner}>"),
            HostType::Coerced(inner) => write!(f, "Coerced<{inner}>"),
            HostType::Opaque(ty) => f.write_str(ty.name),
        }
    }
}

/// How a host function's return value maps onto a [`MethodResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnKind {
    /// `()`: no values.
    Void,
    /// One value.
    Single,
    /// `Vec<Value>`: passed through as multiple values.
    Many,
    /// `MethodResult`: passed through unchanged.
    Envelope,
}

// ============================================================================
// Invokers
// ============================================================================

/// What a host method produced.
pub type Outcome = Result<MethodResult, Thrown>;

/// Calls an instance method on a receiver with marshalled arguments.
pub type InstanceCall = Arc<dyn Fn(&dyn Any, Vec<Arg>) -> Outcome + Send + Sync>;

/// Calls a generic method on `(source, target)` with marshalled arguments.
pub type GenericCall = Arc<dyn Fn(&dyn Any, &dyn Any, Vec<Arg>) -> Outcome + Send + Sync>;

/// The type-erased host function behind a declaration.
#[derive(Clone)]
pub enum Invoker {
    Instance(InstanceCall),
    Generic { target: TypeRef, call: GenericCall },
}

impl fmt::Debug for Invoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invoker::Instance(_) => f.write_str("Instance"),
            Invoker::Generic { target, .. } => {
                f.debug_struct("Generic").field("target", target).finish()
            }
        }
    }
}

// ============================================================================
// MethodDecl
// ============================================================================

/// A host method and its binding metadata.
#[derive(Clone)]
pub struct MethodDecl {
    name: &'static str,
    aliases: Vec<&'static str>,
    modifiers: Modifiers,
    flags: MethodFlags,
    params: Vec<HostType>,
    return_kind: ReturnKind,
    declared_error: Option<TypeRef>,
    invoker: Invoker,
}

impl MethodDecl {
    /// Declare an instance method of `T`.
    pub fn method<T, Args, F>(name: &'static str, f: F) -> Self
    where
        T: Any,
        Args: 'static,
        F: HostFn<T, Args>,
    {
        let params = F::params();
        let return_kind = F::return_kind();
        let declared_error = F::declared_error();
        let call = move |this: &dyn Any, args: Vec<Arg>| -> Outcome {
            let this = this
                .downcast_ref::<T>()
                .ok_or(ConversionError::Receiver {
                    expected: std::any::type_name::<T>(),
                })?;
            f.call(this, args)?
        };

        Self::from_parts(
            name,
            params,
            return_kind,
            declared_error,
            Invoker::Instance(Arc::new(call)),
        )
    }

    /// Declare a generic method provided by source `S` for targets of type `X`.
    pub fn generic<S, X, Args, F>(name: &'static str, f: F) -> Self
    where
        S: Any,
        X: Any,
        Args: 'static,
        F: GenericFn<S, X, Args>,
    {
        let params = F::params();
        let return_kind = F::return_kind();
        let declared_error = F::declared_error();
        let call = move |source: &dyn Any, target: &dyn Any, args: Vec<Arg>| -> Outcome {
            let source = source
                .downcast_ref::<S>()
                .ok_or(ConversionError::Receiver {
                    expected: std::any::type_name::<S>(),
                })?;
            let target = target
                .downcast_ref::<X>()
                .ok_or(ConversionError::Receiver {
                    expected: std::any::type_name::<X>(),
                })?;
            f.call(source, target, args)?
        };

        Self::from_parts(
            name,
            params,
            return_kind,
            declared_error,
            Invoker::Generic {
                target: TypeRef::of::<X>(),
                call: Arc::new(call),
            },
        )
    }

    /// Assemble a declaration from already type-erased parts.
    pub fn from_parts(
        name: &'static str,
        params: Vec<HostType>,
        return_kind: ReturnKind,
        declared_error: Option<TypeRef>,
        invoker: Invoker,
    ) -> Self {
        Self {
            name,
            aliases: Vec::new(),
            modifiers: Modifiers::PUBLIC | Modifiers::FINAL,
            flags: MethodFlags::empty(),
            params,
            return_kind,
            declared_error,
            invoker,
        }
    }

    /// Expose the method under `names` instead of its own name.
    pub fn names(mut self, names: &[&'static str]) -> Self {
        self.aliases = names.to_vec();
        self
    }

    pub fn main_thread(mut self) -> Self {
        self.flags |= MethodFlags::MAIN_THREAD;
        self
    }

    pub fn unsafe_tables(mut self) -> Self {
        self.flags |= MethodFlags::UNSAFE;
        self
    }

    pub fn with_flags(mut self, flags: MethodFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The script-facing names: the aliases if any, otherwise the name.
    pub fn exposed_names(&self) -> &[&'static str] {
        if self.aliases.is_empty() {
            std::slice::from_ref(&self.name)
        } else {
            &self.aliases
        }
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn flags(&self) -> MethodFlags {
        self.flags
    }

    pub fn params(&self) -> &[HostType] {
        &self.params
    }

    pub fn return_kind(&self) -> ReturnKind {
        self.return_kind
    }

    pub fn declared_error(&self) -> Option<TypeRef> {
        self.declared_error
    }

    pub fn invoker(&self) -> &Invoker {
        &self.invoker
    }

    /// The target type of a generic method.
    pub fn generic_target(&self) -> Option<TypeRef> {
        match &self.invoker {
            Invoker::Generic { target, .. } => Some(*target),
            Invoker::Instance(_) => None,
        }
    }
}

impl fmt::Debug for MethodDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDecl")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("modifiers", &self.modifiers)
            .field("flags", &self.flags)
            .field("params", &self.params)
            .field("return_kind", &self.return_kind)
            .field("declared_error", &self.declared_error)
            .field("invoker", &self.invoker)
            .finish()
    }
}

// ============================================================================
// ClassDecl
// ============================================================================

/// The methods a host type declares.
#[derive(Debug, Clone)]
pub struct ClassDecl {
    ty: TypeRef,
    public: bool,
    methods: Vec<MethodDecl>,
}

impl ClassDecl {
    pub fn new(ty: TypeRef) -> Self {
        Self {
            ty,
            public: true,
            methods: Vec::new(),
        }
    }

    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(TypeRef::of::<T>())
    }

    /// Mark the class as not visible to the binding layer.
    pub fn private(mut self) -> Self {
        self.public = false;
        self
    }

    /// Add a method from its generated declaration function.
    pub fn method(mut self, decl: impl FnOnce() -> MethodDecl) -> Self {
        self.methods.push(decl());
        self
    }

    pub fn declare(mut self, decl: MethodDecl) -> Self {
        self.methods.push(decl);
        self
    }

    pub fn ty(&self) -> TypeRef {
        self.ty
    }

    pub fn name(&self) -> &'static str {
        self.ty.name
    }

    pub fn is_public(&self) -> bool {
        self.public
    }

    pub fn methods(&self) -> &[MethodDecl] {
        &self.methods
    }
}

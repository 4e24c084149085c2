//! Host objects exposed to scripts.
//!
//! Every exposed object implements [`LuaObject`]. Its [`ClassDecl`] lists the
//! methods bound statically; the optional capabilities add runtime-named
//! methods ([`DynamicLuaObject`], [`DynamicPeripheral`]), delegate objects
//! ([`ObjectSource`]) and assignability to generic target types
//! ([`LuaObject::upcast`]).
//!
//! # Example
//!
//! ```ignore
//! struct Counter;
//!
//! impl LuaObject for Counter {
//!     fn class(&self) -> ClassDecl {
//!         ClassDecl::of::<Counter>().method(Counter::increment__lua)
//!     }
//! }
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::arguments::Arguments;
use crate::context::{ComputerAccess, LuaContext};
use crate::decl::{ClassDecl, TypeRef};
use crate::error::LuaResult;
use crate::result::MethodResult;

/// Access to a value as [`Any`].
///
/// Implemented for every `'static` type. Call it on `&dyn LuaObject`, not on
/// an `Arc` or `Box` holding one, or the container itself is returned.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;

    fn type_name(&self) -> &'static str;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

// ============================================================================
// LuaObject
// ============================================================================

/// An object whose methods can be called from scripts.
pub trait LuaObject: AsAny + Send + Sync {
    /// The statically declared methods of this object's type.
    fn class(&self) -> ClassDecl {
        ClassDecl::new(TypeRef::of::<Self>())
    }

    fn as_dynamic_lua(&self) -> Option<&dyn DynamicLuaObject> {
        None
    }

    fn as_dynamic_peripheral(&self) -> Option<&dyn DynamicPeripheral> {
        None
    }

    fn as_object_source(&self) -> Option<&dyn ObjectSource> {
        None
    }

    /// View this object as another type it is assignable to.
    ///
    /// Generic methods targeting `target` apply to this object when this
    /// returns `Some`. The object's own type always matches. The answer may
    /// differ between instances of one type, but must not change over the
    /// life of one instance.
    fn upcast(&self, target: TypeId) -> Option<&dyn Any> {
        let _ = target;
        None
    }
}

impl dyn LuaObject {
    /// The concrete type of this object.
    pub fn class_id(&self) -> TypeId {
        Any::type_id(self.as_any())
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    /// This object viewed as `target`, if it is assignable to it.
    pub fn assignable_to(&self, target: TypeId) -> Option<&dyn Any> {
        if self.class_id() == target {
            Some(self.as_any())
        } else {
            self.upcast(target)
        }
    }
}

impl fmt::Debug for dyn LuaObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LuaObject({})", AsAny::type_name(self))
    }
}

/// An object with methods named at runtime, callable from computer APIs.
pub trait DynamicLuaObject {
    /// Current method names. Read once per enumeration and never cached.
    fn method_names(&self) -> Vec<String>;

    /// Call the method at position `method` in [`DynamicLuaObject::method_names`].
    fn call_method(
        &self,
        context: &dyn LuaContext,
        method: usize,
        arguments: &dyn Arguments,
    ) -> LuaResult<MethodResult>;
}

/// A peripheral with methods named at runtime.
pub trait DynamicPeripheral {
    fn method_names(&self) -> Vec<String>;

    fn call_method(
        &self,
        computer: &dyn ComputerAccess,
        context: &dyn LuaContext,
        method: usize,
        arguments: &dyn Arguments,
    ) -> LuaResult<MethodResult>;
}

/// An object that exposes further objects' methods as its own.
pub trait ObjectSource {
    fn extra(&self) -> Vec<Arc<dyn LuaObject>>;
}

// ============================================================================
// Generic sources
// ============================================================================

/// Peripheral type names a generic source contributes to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PeripheralType {
    primary: Option<String>,
    additional: Vec<String>,
}

impl PeripheralType {
    /// No type names.
    pub fn untyped() -> Self {
        Self::default()
    }

    pub fn of_type(name: impl Into<String>) -> Self {
        Self {
            primary: Some(name.into()),
            additional: Vec::new(),
        }
    }

    /// A secondary type, such as `inventory`.
    pub fn of_additional(name: impl Into<String>) -> Self {
        Self {
            primary: None,
            additional: vec![name.into()],
        }
    }

    pub fn with_additional(mut self, name: impl Into<String>) -> Self {
        self.additional.push(name.into());
        self
    }

    pub fn primary(&self) -> Option<&str> {
        self.primary.as_deref()
    }

    pub fn additional(&self) -> &[String] {
        &self.additional
    }
}

/// A stand-alone object providing methods for other types.
///
/// Each method is declared with [`crate::MethodDecl::generic`]: its first
/// parameter after the source is the target object.
pub trait GenericSource: AsAny + Send + Sync {
    /// Stable identifier, used to disable the source through configuration.
    fn id(&self) -> &str;

    fn peripheral_type(&self) -> Option<PeripheralType> {
        None
    }

    fn class(&self) -> ClassDecl;
}

impl fmt::Debug for dyn GenericSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GenericSource({})", self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Chest {
        name: String,
    }

    impl LuaObject for Chest {
        fn upcast(&self, target: TypeId) -> Option<&dyn Any> {
            (target == TypeId::of::<String>()).then_some(&self.name as &dyn Any)
        }
    }

    #[test]
    fn class_id_sees_through_arc() {
        let chest: Arc<dyn LuaObject> = Arc::new(Chest { name: "c".into() });
        assert_eq!(chest.class_id(), TypeId::of::<Chest>());
        assert!(chest.downcast_ref::<Chest>().is_some());
    }

    #[test]
    fn assignability_uses_exact_type_or_upcast() {
        let chest: Arc<dyn LuaObject> = Arc::new(Chest { name: "c".into() });
        assert!(chest.assignable_to(TypeId::of::<Chest>()).is_some());
        let view = chest.assignable_to(TypeId::of::<String>());
        assert_eq!(
            view.and_then(|v| v.downcast_ref::<String>()).map(String::as_str),
            Some("c")
        );
        assert!(chest.assignable_to(TypeId::of::<u8>()).is_none());
    }

    #[test]
    fn default_class_is_empty() {
        let chest = Chest { name: "c".into() };
        let class = LuaObject::class(&chest);
        assert!(class.methods().is_empty());
        assert_eq!(class.ty().id, TypeId::of::<Chest>());
    }
}

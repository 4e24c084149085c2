//! Declaration validation.
//!
//! [`extract`] checks a [`MethodDecl`] against the rules a binding relies on
//! and produces a [`MethodDescriptor`]. A declaration that fails is skipped;
//! the reason is logged by [`report`] and never reaches scripts.

use luabind_core::{
    ClassDecl, HostType, MethodDecl, MethodFlags, Modifiers, ReturnKind, TypeRef,
    is_script_error,
};
use thiserror::Error;
use tracing::{error, warn};

use crate::marshal::{self, ParamSpec};

/// Why a declaration was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DescriptorError {
    #[error("Lua method {method} should be a member of a public class")]
    PrivateClass { method: String },

    #[error("Lua method {method} should be public")]
    NotPublic { method: String },

    #[error("Lua method {method} should be an instance method")]
    NotInstance { method: String },

    #[error("Generic Lua method {method} should take its target as first parameter")]
    NotGeneric { method: String },

    #[error("Lua method {method} is generic but was declared on an object class")]
    UnexpectedGeneric { method: String },

    #[error("Lua method {method} should be final")]
    NotFinal { method: String },

    #[error("Lua method {method} cannot raise {error}")]
    IllegalThrows { method: String, error: TypeRef },

    #[error("Lua method {method} cannot use unsafe tables and run on the main thread")]
    UnsafeMainThread { method: String },

    #[error("Unknown parameter type {ty} for method {method}")]
    UnknownParameter { method: String, ty: String },
}

impl DescriptorError {
    /// Rejections that are expected in well-formed hosts.
    pub fn is_warning(&self) -> bool {
        matches!(self, DescriptorError::NotInstance { .. })
    }
}

/// How the binding reaches its receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receiver {
    /// The target object itself.
    Instance,
    /// A generic source, with the target as first argument.
    Generic,
}

/// A validated declaration.
#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    pub owner: TypeRef,
    pub name: &'static str,
    pub parameters: Vec<ParamSpec>,
    pub return_kind: ReturnKind,
    pub flags: MethodFlags,
    pub declared_error: Option<TypeRef>,
}

impl MethodDescriptor {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.owner.short_name(), self.name)
    }

    /// Number of script arguments the method reads by position.
    pub fn arity(&self) -> usize {
        self.parameters
            .iter()
            .filter(|p| p.consumes_argument())
            .count()
    }
}

/// Validate `decl` as a method of `class`.
///
/// `context` lists the types the calling family supplies as context values.
pub fn extract(
    class: &ClassDecl,
    decl: &MethodDecl,
    receiver: Receiver,
    context: &[TypeRef],
) -> Result<MethodDescriptor, DescriptorError> {
    let method = format!("{}.{}", class.ty().short_name(), decl.name());
    let modifiers = decl.modifiers();

    if !class.is_public() {
        return Err(DescriptorError::PrivateClass { method });
    }
    if !modifiers.contains(Modifiers::PUBLIC) {
        return Err(DescriptorError::NotPublic { method });
    }

    match (receiver, decl.generic_target()) {
        (Receiver::Instance, Some(_)) => {
            return Err(DescriptorError::UnexpectedGeneric { method });
        }
        (Receiver::Generic, None) => return Err(DescriptorError::NotGeneric { method }),
        _ => {}
    }
    if receiver == Receiver::Instance && modifiers.contains(Modifiers::STATIC) {
        return Err(DescriptorError::NotInstance { method });
    }
    if !modifiers.contains(Modifiers::FINAL) {
        return Err(DescriptorError::NotFinal { method });
    }

    if let Some(ty) = decl.declared_error() {
        if !is_script_error(&ty) {
            return Err(DescriptorError::IllegalThrows { method, error: ty });
        }
    }

    let flags = decl.flags();
    if flags.contains(MethodFlags::MAIN_THREAD | MethodFlags::UNSAFE) {
        return Err(DescriptorError::UnsafeMainThread { method });
    }

    let unsafe_tables = flags.contains(MethodFlags::UNSAFE);
    let parameters = decl
        .params()
        .iter()
        .map(|ty| {
            marshal::select(ty, context, unsafe_tables).ok_or_else(|| unknown(&method, ty))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(MethodDescriptor {
        owner: class.ty(),
        name: decl.name(),
        parameters,
        return_kind: decl.return_kind(),
        flags,
        declared_error: decl.declared_error(),
    })
}

fn unknown(method: &str, ty: &HostType) -> DescriptorError {
    DescriptorError::UnknownParameter {
        method: method.to_owned(),
        ty: ty.to_string(),
    }
}

/// Log a rejection.
pub fn report(rejection: &DescriptorError) {
    if rejection.is_warning() {
        warn!(target: "luabind::descriptor", "{rejection}. Skipping.");
    } else {
        error!(target: "luabind::descriptor", "{rejection}. Skipping.");
    }
}

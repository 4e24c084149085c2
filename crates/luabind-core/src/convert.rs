//! Conversions between marshalled arguments and typed host functions.
//!
//! The registry reads each parameter into an [`Arg`]; the typed host function
//! receives them through [`HostParam::from_arg`]. Return values go the other
//! way through [`HostReturn`]. [`HostFn`] and [`GenericFn`] tie the two
//! together for plain Rust functions of up to eight parameters.

use std::any::Any;
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::arguments::{Coerced, ObjectArguments};
use crate::context::{ComputerAccess, LuaContext};
use crate::decl::{HostType, Outcome, Primitive, ReturnKind, TypeRef};
use crate::enums::LuaEnum;
use crate::error::{ConversionError, LuaError, Thrown};
use crate::result::MethodResult;
use crate::table::LuaTable;
use crate::value::{IntoLua, LuaBytes, Table, TableKey, Value};

// ============================================================================
// Arg
// ============================================================================

/// One marshalled parameter value.
pub enum Arg {
    Arguments(ObjectArguments),
    Context(Box<dyn Any + Send>),
    Value(Value),
    Int(i32),
    Long(i64),
    Double(f64),
    Boolean(bool),
    String(String),
    Bytes(LuaBytes),
    Table(Arc<Table>),
    UnsafeTable(LuaTable),
    /// A member index of the parameter's enum.
    Enum(usize),
    /// An optional parameter that was not supplied.
    Absent,
}

impl Arg {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Arg::Arguments(_) => "arguments",
            Arg::Context(_) => "context",
            Arg::Value(_) => "value",
            Arg::Int(_) => "i32",
            Arg::Long(_) => "i64",
            Arg::Double(_) => "f64",
            Arg::Boolean(_) => "bool",
            Arg::String(_) => "String",
            Arg::Bytes(_) => "LuaBytes",
            Arg::Table(_) => "Table",
            Arg::UnsafeTable(_) => "LuaTable",
            Arg::Enum(_) => "enum",
            Arg::Absent => "absent",
        }
    }

    fn mismatch(self, expected: &'static str) -> ConversionError {
        ConversionError::Mismatch {
            expected,
            actual: self.kind_name(),
        }
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Arguments(a) => f.debug_tuple("Arguments").field(a).finish(),
            Arg::Context(_) => f.write_str("Context(..)"),
            Arg::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Arg::Int(v) => f.debug_tuple("Int").field(v).finish(),
            Arg::Long(v) => f.debug_tuple("Long").field(v).finish(),
            Arg::Double(v) => f.debug_tuple("Double").field(v).finish(),
            Arg::Boolean(v) => f.debug_tuple("Boolean").field(v).finish(),
            Arg::String(v) => f.debug_tuple("String").field(v).finish(),
            Arg::Bytes(v) => f.debug_tuple("Bytes").field(v).finish(),
            Arg::Table(v) => f.debug_tuple("Table").field(v).finish(),
            Arg::UnsafeTable(v) => f.debug_tuple("UnsafeTable").field(v).finish(),
            Arg::Enum(v) => f.debug_tuple("Enum").field(v).finish(),
            Arg::Absent => f.write_str("Absent"),
        }
    }
}

// ============================================================================
// Parameters
// ============================================================================

/// A type usable as a host method parameter.
pub trait HostParam: Sized + 'static {
    fn host_type() -> HostType;

    fn from_arg(arg: Arg) -> Result<Self, ConversionError>;
}

macro_rules! primitive_param {
    ($($ty:ty => $prim:ident),* $(,)?) => {
        $(
            impl HostParam for $ty {
                fn host_type() -> HostType {
                    HostType::Primitive(Primitive::$prim)
                }

                fn from_arg(arg: Arg) -> Result<Self, ConversionError> {
                    match arg {
                        Arg::$prim(v) => Ok(v),
                        other => Err(other.mismatch(Primitive::$prim.rust_name())),
                    }
                }
            }
        )*
    };
}

primitive_param! {
    i32 => Int,
    i64 => Long,
    f64 => Double,
    bool => Boolean,
    String => String,
    LuaBytes => Bytes,
    Arc<Table> => Table,
    LuaTable => UnsafeTable,
}

impl HostParam for Table {
    fn host_type() -> HostType {
        HostType::Primitive(Primitive::Table)
    }

    fn from_arg(arg: Arg) -> Result<Self, ConversionError> {
        Arc::<Table>::from_arg(arg).map(Arc::unwrap_or_clone)
    }
}

impl HostParam for Value {
    fn host_type() -> HostType {
        HostType::Any
    }

    fn from_arg(arg: Arg) -> Result<Self, ConversionError> {
        match arg {
            Arg::Value(v) => Ok(v),
            other => Err(other.mismatch("value")),
        }
    }
}

impl HostParam for ObjectArguments {
    fn host_type() -> HostType {
        HostType::Arguments
    }

    fn from_arg(arg: Arg) -> Result<Self, ConversionError> {
        match arg {
            Arg::Arguments(a) => Ok(a),
            other => Err(other.mismatch("arguments")),
        }
    }
}

impl<T: HostParam> HostParam for Option<T> {
    fn host_type() -> HostType {
        HostType::Optional(Box::new(T::host_type()))
    }

    fn from_arg(arg: Arg) -> Result<Self, ConversionError> {
        match arg {
            Arg::Absent => Ok(None),
            other => T::from_arg(other).map(Some),
        }
    }
}

impl<T: HostParam> HostParam for Coerced<T> {
    fn host_type() -> HostType {
        HostType::Coerced(Box::new(T::host_type()))
    }

    fn from_arg(arg: Arg) -> Result<Self, ConversionError> {
        T::from_arg(arg).map(Coerced)
    }
}

/// Read an enum parameter from its member index.
pub fn enum_from_arg<E: LuaEnum>(arg: Arg) -> Result<E, ConversionError> {
    match arg {
        Arg::Enum(i) => E::VARIANTS.get(i).copied().ok_or(ConversionError::Mismatch {
            expected: std::any::type_name::<E>(),
            actual: "out-of-range enum index",
        }),
        other => Err(other.mismatch(std::any::type_name::<E>())),
    }
}

/// Read a context parameter supplied by the calling family.
pub fn context_from_arg<T: Any>(arg: Arg) -> Result<T, ConversionError> {
    match arg {
        Arg::Context(value) => value
            .downcast::<T>()
            .map(|v| *v)
            .map_err(|_| ConversionError::Mismatch {
                expected: std::any::type_name::<T>(),
                actual: "context of another type",
            }),
        other => Err(other.mismatch(std::any::type_name::<T>())),
    }
}

/// Declare types as context parameters, supplied by the binding family
/// rather than read from script arguments.
#[macro_export]
macro_rules! context_param {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::HostParam for $ty {
                fn host_type() -> $crate::HostType {
                    $crate::HostType::Opaque($crate::TypeRef::of::<$ty>())
                }

                fn from_arg(arg: $crate::Arg) -> ::core::result::Result<Self, $crate::ConversionError> {
                    $crate::context_from_arg::<$ty>(arg)
                }
            }
        )*
    };
}

context_param!(Arc<dyn LuaContext>, Arc<dyn ComputerAccess>);

// ============================================================================
// Returns
// ============================================================================

/// A type usable as a host method return.
pub trait HostReturn: 'static {
    const KIND: ReturnKind;

    /// The error type a `Result` return declares.
    fn declared_error() -> Option<TypeRef> {
        None
    }

    fn into_outcome(self) -> Outcome;
}

impl HostReturn for () {
    const KIND: ReturnKind = ReturnKind::Void;

    fn into_outcome(self) -> Outcome {
        Ok(MethodResult::Empty)
    }
}

impl HostReturn for MethodResult {
    const KIND: ReturnKind = ReturnKind::Envelope;

    fn into_outcome(self) -> Outcome {
        Ok(self)
    }
}

impl HostReturn for Vec<Value> {
    const KIND: ReturnKind = ReturnKind::Many;

    fn into_outcome(self) -> Outcome {
        Ok(MethodResult::Many(self))
    }
}

macro_rules! single_return {
    ($($ty:ty),* $(,)?) => {
        $(
            impl HostReturn for $ty {
                const KIND: ReturnKind = ReturnKind::Single;

                fn into_outcome(self) -> Outcome {
                    Ok(MethodResult::Single(self.into_lua()))
                }
            }
        )*
    };
}

single_return!(
    bool,
    i32,
    i64,
    u32,
    usize,
    f32,
    f64,
    String,
    &'static str,
    LuaBytes,
    Value,
    Arc<Table>,
);

impl<T: IntoLua + 'static> HostReturn for Option<T> {
    const KIND: ReturnKind = ReturnKind::Single;

    fn into_outcome(self) -> Outcome {
        Ok(MethodResult::Single(self.into_lua()))
    }
}

impl<K, V> HostReturn for FxHashMap<K, V>
where
    K: Into<TableKey> + 'static,
    V: IntoLua + 'static,
{
    const KIND: ReturnKind = ReturnKind::Single;

    fn into_outcome(self) -> Outcome {
        Ok(MethodResult::Single(self.into_lua()))
    }
}

fn settle<T, E>(result: Result<T, E>) -> Outcome
where
    T: HostReturn,
    E: std::error::Error + Send + Sync + 'static,
{
    match result {
        Ok(value) => value.into_outcome(),
        Err(error) => Err(Thrown::classify(error)),
    }
}

macro_rules! result_return {
    ($([$($gen:tt)*] $ty:ty),* $(,)?) => {
        $(
            impl<$($gen)* E> HostReturn for Result<$ty, E>
            where
                E: std::error::Error + Send + Sync + 'static,
                $ty: HostReturn,
            {
                const KIND: ReturnKind = <$ty as HostReturn>::KIND;

                fn declared_error() -> Option<TypeRef> {
                    Some(TypeRef::of::<E>())
                }

                fn into_outcome(self) -> Outcome {
                    settle(self)
                }
            }
        )*
    };
}

result_return!(
    [] (),
    [] MethodResult,
    [] Vec<Value>,
    [] bool,
    [] i32,
    [] i64,
    [] u32,
    [] usize,
    [] f32,
    [] f64,
    [] String,
    [] &'static str,
    [] LuaBytes,
    [] Value,
    [] Arc<Table>,
    [T: IntoLua + 'static,] Option<T>,
    [K: Into<TableKey> + 'static, V: IntoLua + 'static,] FxHashMap<K, V>,
);

/// Whether a declared error type may be raised by a host method.
pub fn is_script_error(ty: &TypeRef) -> bool {
    ty.is::<LuaError>() || ty.is::<Infallible>()
}

// ============================================================================
// Host functions
// ============================================================================

/// An instance method of `T` taking parameters `Args`.
///
/// Implemented for `Fn(&T, A1, .., An) -> R` where every `Ai` is a
/// [`HostParam`] and `R` is a [`HostReturn`].
pub trait HostFn<T, Args>: Send + Sync + 'static {
    fn params() -> Vec<HostType>;

    fn return_kind() -> ReturnKind;

    fn declared_error() -> Option<TypeRef>;

    fn call(&self, this: &T, args: Vec<Arg>) -> Result<Outcome, ConversionError>;
}

/// A generic method of source `S` applied to targets of type `X`.
///
/// Implemented for `Fn(&S, &X, A1, .., An) -> R`.
pub trait GenericFn<S, X, Args>: Send + Sync + 'static {
    fn params() -> Vec<HostType>;

    fn return_kind() -> ReturnKind;

    fn declared_error() -> Option<TypeRef>;

    fn call(&self, source: &S, target: &X, args: Vec<Arg>) -> Result<Outcome, ConversionError>;
}

fn next_arg(
    args: &mut std::vec::IntoIter<Arg>,
    index: &mut usize,
) -> Result<Arg, ConversionError> {
    let arg = args.next().ok_or(ConversionError::Missing { index: *index })?;
    *index += 1;
    Ok(arg)
}

macro_rules! impl_host_fn {
    ($($ty:ident $var:ident),*) => {
        impl<T, F, R, $($ty,)*> HostFn<T, ($($ty,)*)> for F
        where
            F: Fn(&T, $($ty),*) -> R + Send + Sync + 'static,
            R: HostReturn,
            $($ty: HostParam,)*
        {
            fn params() -> Vec<HostType> {
                vec![$($ty::host_type()),*]
            }

            fn return_kind() -> ReturnKind {
                R::KIND
            }

            fn declared_error() -> Option<TypeRef> {
                R::declared_error()
            }

            #[allow(unused_mut, unused_variables)]
            fn call(&self, this: &T, args: Vec<Arg>) -> Result<Outcome, ConversionError> {
                let mut args = args.into_iter();
                let mut index = 0;
                $(let $var = $ty::from_arg(next_arg(&mut args, &mut index)?)?;)*
                Ok((self)(this, $($var),*).into_outcome())
            }
        }

        impl<S, X, F, R, $($ty,)*> GenericFn<S, X, ($($ty,)*)> for F
        where
            F: Fn(&S, &X, $($ty),*) -> R + Send + Sync + 'static,
            R: HostReturn,
            $($ty: HostParam,)*
        {
            fn params() -> Vec<HostType> {
                vec![$($ty::host_type()),*]
            }

            fn return_kind() -> ReturnKind {
                R::KIND
            }

            fn declared_error() -> Option<TypeRef> {
                R::declared_error()
            }

            #[allow(unused_mut, unused_variables)]
            fn call(&self, source: &S, target: &X, args: Vec<Arg>) -> Result<Outcome, ConversionError> {
                let mut args = args.into_iter();
                let mut index = 0;
                $(let $var = $ty::from_arg(next_arg(&mut args, &mut index)?)?;)*
                Ok((self)(source, target, $($var),*).into_outcome())
            }
        }
    };
}

impl_host_fn!();
impl_host_fn!(A1 a1);
impl_host_fn!(A1 a1, A2 a2);
impl_host_fn!(A1 a1, A2 a2, A3 a3);
impl_host_fn!(A1 a1, A2 a2, A3 a3, A4 a4);
impl_host_fn!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5);
impl_host_fn!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6);
impl_host_fn!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7);
impl_host_fn!(A1 a1, A2 a2, A3 a3, A4 a4, A5 a5, A6 a6, A7 a7, A8 a8);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LuaResult;

    struct Probe;

    #[test]
    fn option_parameters_accept_absence() {
        assert_eq!(Option::<String>::from_arg(Arg::Absent), Ok(None));
        assert_eq!(
            Option::<i32>::from_arg(Arg::Int(4)),
            Ok(Some(4))
        );
        assert_eq!(
            Option::<i32>::host_type(),
            HostType::Optional(Box::new(HostType::Primitive(Primitive::Int)))
        );
    }

    #[test]
    fn mismatched_arg_is_a_conversion_error() {
        assert_eq!(
            i32::from_arg(Arg::String("x".into())),
            Err(ConversionError::Mismatch {
                expected: "i32",
                actual: "String"
            })
        );
    }

    #[test]
    fn context_parameters_are_opaque() {
        assert_eq!(
            <Arc<dyn LuaContext>>::host_type(),
            HostType::Opaque(TypeRef::of::<Arc<dyn LuaContext>>())
        );
    }

    #[test]
    fn result_returns_keep_inner_kind() {
        assert_eq!(<LuaResult<()>>::KIND, ReturnKind::Void);
        assert_eq!(<LuaResult<Vec<Value>>>::KIND, ReturnKind::Many);
        assert_eq!(<LuaResult<MethodResult>>::KIND, ReturnKind::Envelope);
        assert_eq!(<Option<String>>::KIND, ReturnKind::Single);
        assert!(is_script_error(&<LuaResult<i32>>::declared_error().unwrap()));
        assert!(!is_script_error(&TypeRef::of::<std::io::Error>()));
    }

    #[test]
    fn host_fn_reports_missing_arguments() {
        let f = |_: &Probe, a: i32, b: i32| a + b;
        assert_eq!(
            HostFn::<Probe, (i32, i32)>::call(&f, &Probe, vec![Arg::Int(1)]).err(),
            Some(ConversionError::Missing { index: 1 })
        );
    }

    #[test]
    fn host_errors_are_classified() {
        let outcome = settle::<i32, _>(Err(std::io::Error::other("boom")));
        assert!(matches!(outcome, Err(Thrown::Host(_))));
        let outcome = settle::<i32, _>(Err(LuaError::new("!")));
        assert!(matches!(outcome, Err(Thrown::Lua(e)) if e.message() == "!"));
    }
}

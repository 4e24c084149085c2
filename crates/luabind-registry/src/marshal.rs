//! Argument marshalling.
//!
//! Each host parameter is matched to one [`ParamSpec`], the strategy used
//! to produce its value at call time. Strategies are tried in a fixed
//! priority order; the first match wins:
//!
//! 1. the raw argument list
//! 2. a context value supplied by the family
//! 3. a coerced string or byte string
//! 4. an optional enum or primitive
//! 5. an enum
//! 6. any value
//! 7. a primitive (`LuaTable` only on `unsafe_tables` methods)
//!
//! Only strategies that read a script value advance the argument position.

use luabind_core::{
    Arg, Arguments, EnumInfo, HostType, LuaError, LuaResult, Primitive, TypeRef,
};

use crate::family::ContextValues;

/// Conversion applied by a coerced parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coerce {
    String,
    Bytes,
}

/// How one parameter gets its value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamSpec {
    /// The whole argument list.
    RawArgumentList,
    /// Context value `n` of the calling family.
    Context(usize),
    Coerced(Coerce),
    /// An optional enum or primitive.
    Optional(Box<ParamSpec>),
    Enum(EnumInfo),
    Primitive(Primitive),
    /// The script value unchanged.
    RawObject,
}

impl ParamSpec {
    /// Whether the parameter reads a script argument by position.
    pub fn consumes_argument(&self) -> bool {
        !matches!(self, ParamSpec::RawArgumentList | ParamSpec::Context(_))
    }
}

/// Choose the strategy for a parameter of type `ty`.
pub fn select(ty: &HostType, context: &[TypeRef], unsafe_tables: bool) -> Option<ParamSpec> {
    match ty {
        HostType::Arguments => Some(ParamSpec::RawArgumentList),
        HostType::Opaque(ty) => context
            .iter()
            .position(|c| c == ty)
            .map(ParamSpec::Context),
        HostType::Coerced(inner) => match **inner {
            HostType::Primitive(Primitive::String) => Some(ParamSpec::Coerced(Coerce::String)),
            HostType::Primitive(Primitive::Bytes) => Some(ParamSpec::Coerced(Coerce::Bytes)),
            _ => None,
        },
        HostType::Optional(inner) => match &**inner {
            HostType::Enum(info) => Some(ParamSpec::Optional(Box::new(ParamSpec::Enum(*info)))),
            HostType::Primitive(kind) => primitive(*kind, unsafe_tables)
                .map(|spec| ParamSpec::Optional(Box::new(spec))),
            _ => None,
        },
        HostType::Enum(info) => Some(ParamSpec::Enum(*info)),
        HostType::Any => Some(ParamSpec::RawObject),
        HostType::Primitive(kind) => primitive(*kind, unsafe_tables),
    }
}

fn primitive(kind: Primitive, unsafe_tables: bool) -> Option<ParamSpec> {
    match kind {
        Primitive::UnsafeTable if !unsafe_tables => None,
        kind => Some(ParamSpec::Primitive(kind)),
    }
}

// ============================================================================
// Extraction
// ============================================================================

/// Produces one parameter value from the context and script arguments.
pub type Extractor<C> = Box<dyn Fn(&C, &dyn Arguments) -> LuaResult<Arg> + Send + Sync>;

fn extractor<C, F>(f: F) -> Extractor<C>
where
    F: Fn(&C, &dyn Arguments) -> LuaResult<Arg> + Send + Sync + 'static,
{
    Box::new(f)
}

/// Build the extractors for `specs`, assigning script positions in order.
pub fn extractors<C: ContextValues>(specs: &[ParamSpec]) -> Vec<Extractor<C>> {
    let mut position = 0;
    specs
        .iter()
        .map(|spec| {
            let index = position;
            if spec.consumes_argument() {
                position += 1;
            }
            let spec = spec.clone();
            extractor(move |context: &C, arguments| read(&spec, index, context, arguments))
        })
        .collect()
}

fn read<C: ContextValues>(
    spec: &ParamSpec,
    index: usize,
    context: &C,
    arguments: &dyn Arguments,
) -> LuaResult<Arg> {
    match spec {
        ParamSpec::RawArgumentList => Ok(Arg::Arguments(arguments.skip(0))),
        ParamSpec::Context(slot) => context
            .value(*slot)
            .map(Arg::Context)
            .ok_or_else(|| LuaError::internal(format!("no context value in slot {slot}"))),
        ParamSpec::Coerced(Coerce::String) => arguments.get_string_coerced(index).map(Arg::String),
        ParamSpec::Coerced(Coerce::Bytes) => arguments.get_bytes_coerced(index).map(Arg::Bytes),
        ParamSpec::Optional(inner) => {
            Ok(read_optional(inner, index, arguments)?.unwrap_or(Arg::Absent))
        }
        ParamSpec::Enum(info) => {
            let name = arguments.get_string(index)?;
            info.check(index, &name).map(Arg::Enum)
        }
        ParamSpec::RawObject => arguments.get(index).map(Arg::Value),
        ParamSpec::Primitive(kind) => read_primitive(*kind, index, arguments),
    }
}

fn read_primitive(kind: Primitive, index: usize, arguments: &dyn Arguments) -> LuaResult<Arg> {
    Ok(match kind {
        Primitive::Int => Arg::Int(arguments.get_int(index)?),
        Primitive::Long => Arg::Long(arguments.get_long(index)?),
        Primitive::Double => Arg::Double(arguments.get_double(index)?),
        Primitive::Boolean => Arg::Boolean(arguments.get_boolean(index)?),
        Primitive::String => Arg::String(arguments.get_string(index)?),
        Primitive::Bytes => Arg::Bytes(arguments.get_bytes(index)?),
        Primitive::Table => Arg::Table(arguments.get_table(index)?),
        Primitive::UnsafeTable => Arg::UnsafeTable(arguments.get_table_unsafe(index)?),
    })
}

fn read_optional(
    spec: &ParamSpec,
    index: usize,
    arguments: &dyn Arguments,
) -> LuaResult<Option<Arg>> {
    match spec {
        ParamSpec::Enum(info) => match arguments.opt_string(index)? {
            Some(name) => info.check(index, &name).map(|i| Some(Arg::Enum(i))),
            None => Ok(None),
        },
        ParamSpec::Primitive(kind) => Ok(match kind {
            Primitive::Int => arguments.opt_int(index)?.map(Arg::Int),
            Primitive::Long => arguments.opt_long(index)?.map(Arg::Long),
            Primitive::Double => arguments.opt_double(index)?.map(Arg::Double),
            Primitive::Boolean => arguments.opt_boolean(index)?.map(Arg::Boolean),
            Primitive::String => arguments.opt_string(index)?.map(Arg::String),
            Primitive::Bytes => arguments.opt_bytes(index)?.map(Arg::Bytes),
            Primitive::Table => arguments.opt_table(index)?.map(Arg::Table),
            Primitive::UnsafeTable => arguments.opt_table_unsafe(index)?.map(Arg::UnsafeTable),
        }),
        other => Err(LuaError::internal(format!(
            "{other:?} cannot be read as an optional parameter"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use luabind_core::{
        ComputerAccess, LuaContext, LuaEnum, LuaTask, ObjectArguments, Pending, Value,
    };

    use crate::family::{LuaCtx, PeripheralCtx};

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Side {
        Left,
        Right,
    }

    impl LuaEnum for Side {
        const VARIANTS: &'static [Self] = &[Side::Left, Side::Right];
        const NAMES: &'static [&'static str] = &["LEFT", "RIGHT"];

        fn ordinal(self) -> usize {
            self as usize
        }
    }

    struct Inert;

    impl LuaContext for Inert {
        fn issue_main_thread_task(&self, _task: LuaTask) -> LuaResult<Pending> {
            Err(LuaError::new("unsupported"))
        }
    }

    fn run(specs: &[ParamSpec], values: Vec<Value>) -> LuaResult<Vec<Arg>> {
        let context: LuaCtx = (Arc::new(Inert),);
        let arguments = ObjectArguments::new(values);
        extractors::<LuaCtx>(specs)
            .iter()
            .map(|extract| extract(&context, &arguments))
            .collect()
    }

    #[test]
    fn priority_prefers_context_over_opaque_failure() {
        let context = <PeripheralCtx as ContextValues>::types();
        let computer = HostType::Opaque(TypeRef::of::<Arc<dyn ComputerAccess>>());
        assert_eq!(select(&computer, &context, false), Some(ParamSpec::Context(1)));
        assert_eq!(
            select(&computer, &<LuaCtx as ContextValues>::types(), false),
            None
        );
    }

    #[test]
    fn unsafe_tables_need_the_flag() {
        let ty = HostType::Primitive(Primitive::UnsafeTable);
        assert_eq!(select(&ty, &[], false), None);
        assert_eq!(
            select(&ty, &[], true),
            Some(ParamSpec::Primitive(Primitive::UnsafeTable))
        );
        let optional = HostType::Optional(Box::new(ty));
        assert_eq!(select(&optional, &[], false), None);
    }

    #[test]
    fn only_strings_and_bytes_coerce() {
        let bytes = HostType::Coerced(Box::new(HostType::Primitive(Primitive::Bytes)));
        assert_eq!(select(&bytes, &[], false), Some(ParamSpec::Coerced(Coerce::Bytes)));
        let int = HostType::Coerced(Box::new(HostType::Primitive(Primitive::Int)));
        assert_eq!(select(&int, &[], false), None);
    }

    #[test]
    fn optional_values_must_be_enums_or_primitives() {
        let any = HostType::Optional(Box::new(HostType::Any));
        assert_eq!(select(&any, &[], false), None);
    }

    #[test]
    fn context_slots_keep_positions() {
        let specs = [
            ParamSpec::RawArgumentList,
            ParamSpec::Primitive(Primitive::Int),
            ParamSpec::Context(0),
            ParamSpec::Primitive(Primitive::String),
        ];
        let values = run(&specs, vec![Value::from(5), Value::from("x")]).unwrap();
        assert!(matches!(&values[0], Arg::Arguments(a) if a.count() == 2));
        assert!(matches!(values[1], Arg::Int(5)));
        assert!(matches!(values[2], Arg::Context(_)));
        assert!(matches!(&values[3], Arg::String(s) if s == "x"));
    }

    #[test]
    fn absent_optionals_read_as_absent() {
        let specs = [
            ParamSpec::Optional(Box::new(ParamSpec::Primitive(Primitive::String))),
            ParamSpec::Optional(Box::new(ParamSpec::Enum(Side::info()))),
        ];
        let values = run(&specs, vec![]).unwrap();
        assert!(matches!(values[0], Arg::Absent));
        assert!(matches!(values[1], Arg::Absent));
    }

    #[test]
    fn enums_match_ignoring_case() {
        let specs = [ParamSpec::Enum(Side::info())];
        let values = run(&specs, vec![Value::from("right")]).unwrap();
        assert!(matches!(values[0], Arg::Enum(1)));

        let err = run(&specs, vec![Value::from("up")]).unwrap_err();
        assert_eq!(err.message(), "bad argument #1 (unknown option up)");
    }

    #[test]
    fn raw_objects_pass_through() {
        let values = run(&[ParamSpec::RawObject], vec![]).unwrap();
        assert!(matches!(values[0], Arg::Value(Value::Nil)));
    }

    #[test]
    fn failures_name_the_position() {
        let specs = [
            ParamSpec::Primitive(Primitive::Int),
            ParamSpec::Primitive(Primitive::Double),
        ];
        let err = run(&specs, vec![Value::from(1), Value::from(true)]).unwrap_err();
        assert_eq!(err.message(), "bad argument #2 (number expected, got boolean)");
    }
}

//! Positional argument readers.
//!
//! [`Arguments`] is the interface the interpreter hands to every binding.
//! Only [`Arguments::count`], [`Arguments::get`] and [`Arguments::skip`] are
//! required; the typed getters are provided and produce the standard
//! `bad argument #N (X expected, got Y)` errors. Indices are zero-based and
//! reported one-based.
//!
//! # Example
//!
//! ```
//! use luabind_core::{Arguments, ObjectArguments, Value};
//!
//! let args = ObjectArguments::new(vec![Value::from(3), Value::from("x")]);
//! assert_eq!(args.get_int(0), Ok(3));
//! assert_eq!(
//!     args.get_int(1).unwrap_err().message(),
//!     "bad argument #2 (number expected, got string)"
//! );
//! assert_eq!(args.opt_string(2), Ok(None));
//! ```

use std::sync::Arc;

use crate::enums::LuaEnum;
use crate::error::{LuaResult, bad_argument_of, check_finite};
use crate::table::LuaTable;
use crate::value::{LuaBytes, Table, Value};

/// A positional list of script arguments.
pub trait Arguments {
    /// Number of arguments passed.
    fn count(&self) -> usize;

    /// The argument at `index`, or [`Value::Nil`] past the end.
    fn get(&self, index: usize) -> LuaResult<Value>;

    /// The arguments after the first `count`.
    fn skip(&self, count: usize) -> ObjectArguments;

    /// Type name of the argument at `index`.
    fn type_name(&self, index: usize) -> &'static str {
        self.get(index).map_or("nil", |v| v.type_name())
    }

    fn get_all(&self) -> LuaResult<Vec<Value>> {
        (0..self.count()).map(|i| self.get(i)).collect()
    }

    /// Copy the arguments so they may outlive the current call.
    fn escapes(&self) -> LuaResult<ObjectArguments> {
        self.get_all().map(ObjectArguments::new)
    }

    fn get_double(&self, index: usize) -> LuaResult<f64> {
        match self.get(index)? {
            Value::Number(n) => Ok(n),
            other => Err(bad_argument_of(index, "number", &other)),
        }
    }

    fn get_finite_double(&self, index: usize) -> LuaResult<f64> {
        check_finite(index, self.get_double(index)?)
    }

    /// An integer, truncated toward zero. Non-finite numbers are rejected.
    fn get_long(&self, index: usize) -> LuaResult<i64> {
        Ok(check_finite(index, self.get_double(index)?)? as i64)
    }

    /// [`Arguments::get_long`] narrowed to 32 bits.
    fn get_int(&self, index: usize) -> LuaResult<i32> {
        Ok(self.get_long(index)? as i32)
    }

    fn get_boolean(&self, index: usize) -> LuaResult<bool> {
        match self.get(index)? {
            Value::Boolean(b) => Ok(b),
            other => Err(bad_argument_of(index, "boolean", &other)),
        }
    }

    fn get_string(&self, index: usize) -> LuaResult<String> {
        match self.get(index)? {
            Value::String(s) => Ok(s),
            other => Err(bad_argument_of(index, "string", &other)),
        }
    }

    /// Any argument converted to a string, as `tostring` would.
    fn get_string_coerced(&self, index: usize) -> LuaResult<String> {
        Ok(match self.get(index)? {
            Value::Nil => "nil".to_owned(),
            Value::Boolean(b) => b.to_string(),
            Value::String(s) => s,
            Value::Number(n) => format_number(n),
            Value::Table(t) => format!("table: {:08x}", Arc::as_ptr(&t) as usize),
        })
    }

    fn get_bytes(&self, index: usize) -> LuaResult<LuaBytes> {
        Ok(LuaBytes::encode(&self.get_string(index)?))
    }

    fn get_bytes_coerced(&self, index: usize) -> LuaResult<LuaBytes> {
        Ok(LuaBytes::encode(&self.get_string_coerced(index)?))
    }

    fn get_table(&self, index: usize) -> LuaResult<Arc<Table>> {
        match self.get(index)? {
            Value::Table(t) => Ok(t),
            other => Err(bad_argument_of(index, "table", &other)),
        }
    }

    fn get_table_unsafe(&self, index: usize) -> LuaResult<LuaTable> {
        self.get_table(index).map(LuaTable::new)
    }

    fn opt_double(&self, index: usize) -> LuaResult<Option<f64>> {
        match self.get(index)? {
            Value::Nil => Ok(None),
            Value::Number(n) => Ok(Some(n)),
            other => Err(bad_argument_of(index, "number", &other)),
        }
    }

    fn opt_finite_double(&self, index: usize) -> LuaResult<Option<f64>> {
        self.opt_double(index)?
            .map(|n| check_finite(index, n))
            .transpose()
    }

    fn opt_long(&self, index: usize) -> LuaResult<Option<i64>> {
        Ok(self.opt_finite_double(index)?.map(|n| n as i64))
    }

    fn opt_int(&self, index: usize) -> LuaResult<Option<i32>> {
        Ok(self.opt_long(index)?.map(|n| n as i32))
    }

    fn opt_boolean(&self, index: usize) -> LuaResult<Option<bool>> {
        match self.get(index)? {
            Value::Nil => Ok(None),
            Value::Boolean(b) => Ok(Some(b)),
            other => Err(bad_argument_of(index, "boolean", &other)),
        }
    }

    fn opt_string(&self, index: usize) -> LuaResult<Option<String>> {
        match self.get(index)? {
            Value::Nil => Ok(None),
            Value::String(s) => Ok(Some(s)),
            other => Err(bad_argument_of(index, "string", &other)),
        }
    }

    fn opt_bytes(&self, index: usize) -> LuaResult<Option<LuaBytes>> {
        Ok(self.opt_string(index)?.map(|s| LuaBytes::encode(&s)))
    }

    fn opt_table(&self, index: usize) -> LuaResult<Option<Arc<Table>>> {
        match self.get(index)? {
            Value::Nil => Ok(None),
            Value::Table(t) => Ok(Some(t)),
            other => Err(bad_argument_of(index, "table", &other)),
        }
    }

    fn opt_table_unsafe(&self, index: usize) -> LuaResult<Option<LuaTable>> {
        Ok(self.opt_table(index)?.map(LuaTable::new))
    }

    fn opt_double_or(&self, index: usize, default: f64) -> LuaResult<f64> {
        Ok(self.opt_double(index)?.unwrap_or(default))
    }

    fn opt_finite_double_or(&self, index: usize, default: f64) -> LuaResult<f64> {
        Ok(self.opt_finite_double(index)?.unwrap_or(default))
    }

    fn opt_long_or(&self, index: usize, default: i64) -> LuaResult<i64> {
        Ok(self.opt_long(index)?.unwrap_or(default))
    }

    fn opt_int_or(&self, index: usize, default: i32) -> LuaResult<i32> {
        Ok(self.opt_int(index)?.unwrap_or(default))
    }

    fn opt_boolean_or(&self, index: usize, default: bool) -> LuaResult<bool> {
        Ok(self.opt_boolean(index)?.unwrap_or(default))
    }

    fn opt_string_or(&self, index: usize, default: &str) -> LuaResult<String> {
        Ok(self
            .opt_string(index)?
            .unwrap_or_else(|| default.to_owned()))
    }
}

/// Enum getters, usable on concrete readers and `dyn Arguments` alike.
pub trait ArgumentsExt: Arguments {
    fn get_enum<E: LuaEnum>(&self, index: usize) -> LuaResult<E> {
        let name = self.get_string(index)?;
        E::info().check(index, &name).map(|i| E::VARIANTS[i])
    }

    fn opt_enum<E: LuaEnum>(&self, index: usize) -> LuaResult<Option<E>> {
        match self.opt_string(index)? {
            Some(name) => E::info().check(index, &name).map(|i| Some(E::VARIANTS[i])),
            None => Ok(None),
        }
    }
}

impl<T: Arguments + ?Sized> ArgumentsExt for T {}

/// Format a number as `tostring` does: `%.14g`.
fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "nan".to_owned();
    }
    if n.is_infinite() {
        return (if n > 0.0 { "inf" } else { "-inf" }).to_owned();
    }
    let truncated = n as i32;
    if truncated as f64 == n {
        return truncated.to_string();
    }

    // Rounded to 14 significant digits first, so the exponent is the one
    // `%g` decides with.
    let scientific = format!("{n:.13e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or_default();
    if (-4..14).contains(&exponent) {
        let precision = (13 - exponent) as usize;
        trim_fraction(&format!("{n:.precision$}")).to_owned()
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_fraction(mantissa), exponent.abs())
    }
}

fn trim_fraction(digits: &str) -> &str {
    if digits.contains('.') {
        digits.trim_end_matches('0').trim_end_matches('.')
    } else {
        digits
    }
}

// ============================================================================
// ObjectArguments
// ============================================================================

/// An owned argument list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectArguments {
    values: Arc<[Value]>,
    offset: usize,
}

impl ObjectArguments {
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            values: values.into(),
            offset: 0,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.as_slice().iter()
    }

    pub fn as_slice(&self) -> &[Value] {
        self.values.get(self.offset..).unwrap_or(&[])
    }
}

impl From<Vec<Value>> for ObjectArguments {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

impl FromIterator<Value> for ObjectArguments {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Arguments for ObjectArguments {
    fn count(&self) -> usize {
        self.as_slice().len()
    }

    fn get(&self, index: usize) -> LuaResult<Value> {
        Ok(self.as_slice().get(index).cloned().unwrap_or_default())
    }

    fn skip(&self, count: usize) -> ObjectArguments {
        Self {
            values: Arc::clone(&self.values),
            offset: (self.offset + count).min(self.values.len()),
        }
    }

    fn escapes(&self) -> LuaResult<ObjectArguments> {
        Ok(self.clone())
    }
}

// ============================================================================
// Coerced
// ============================================================================

/// A parameter read with `tostring` semantics instead of a strict type check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Coerced<T>(pub T);

impl<T> Coerced<T> {
    pub fn value(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

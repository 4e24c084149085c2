//! Script values as seen by host methods.
//!
//! [`Value`] is the host-side mirror of what the interpreter passes across
//! the binding boundary: nil, booleans, numbers, strings and tables. Tables
//! are shared behind an [`Arc`] so that argument lists can be escaped and
//! re-read cheaply, and so that two reads of the same table compare by
//! identity.
//!
//! # Example
//!
//! ```
//! use luabind_core::{IntoLua, TableKey, Value};
//!
//! let table = Value::table([(TableKey::from("x"), Value::from(1))]);
//! assert_eq!(table.type_name(), "table");
//! assert_eq!(vec![1, 2, 3].into_lua().type_name(), "table");
//! ```

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use ordered_float::OrderedFloat;
use rustc_hash::FxHashMap;

/// Table contents, keyed by [`TableKey`].
pub type Table = FxHashMap<TableKey, Value>;

// ============================================================================
// Value
// ============================================================================

/// A script value.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Nil,
    Boolean(bool),
    Number(f64),
    String(String),
    Table(Arc<Table>),
}

impl Value {
    /// Build a table value from key/value pairs.
    pub fn table<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (TableKey, Value)>,
    {
        Value::Table(Arc::new(entries.into_iter().collect()))
    }

    /// Build a table value in array form (`1..=n` keys).
    pub fn array<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Value::table(
            items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (TableKey::from((i + 1) as i64), v)),
        )
    }

    /// The script-facing name of this value's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Table(_) => "table",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Arc<Table>> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(value as f64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Table> for Value {
    fn from(value: Table) -> Self {
        Value::Table(Arc::new(value))
    }
}

impl From<Arc<Table>> for Value {
    fn from(value: Arc<Table>) -> Self {
        Value::Table(value)
    }
}

// ============================================================================
// Table keys
// ============================================================================

/// A hashable table key.
///
/// Tables cannot be used as keys on the host side; the interpreter is
/// expected to drop such entries when converting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableKey {
    Boolean(bool),
    Number(OrderedFloat<f64>),
    String(String),
}

impl TableKey {
    /// Convert a value into a key, if it can be one.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Boolean(b) => Some(TableKey::Boolean(*b)),
            Value::Number(n) => Some(TableKey::Number(OrderedFloat(*n))),
            Value::String(s) => Some(TableKey::String(s.clone())),
            Value::Nil | Value::Table(_) => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            TableKey::Boolean(b) => Value::Boolean(*b),
            TableKey::Number(n) => Value::Number(n.into_inner()),
            TableKey::String(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKey::Boolean(b) => write!(f, "{b}"),
            TableKey::Number(n) => write!(f, "{n}"),
            TableKey::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for TableKey {
    fn from(value: bool) -> Self {
        TableKey::Boolean(value)
    }
}

impl From<i32> for TableKey {
    fn from(value: i32) -> Self {
        TableKey::Number(OrderedFloat(value as f64))
    }
}

impl From<i64> for TableKey {
    fn from(value: i64) -> Self {
        TableKey::Number(OrderedFloat(value as f64))
    }
}

impl From<f64> for TableKey {
    fn from(value: f64) -> Self {
        TableKey::Number(OrderedFloat(value))
    }
}

impl From<&str> for TableKey {
    fn from(value: &str) -> Self {
        TableKey::String(value.to_owned())
    }
}

impl From<String> for TableKey {
    fn from(value: String) -> Self {
        TableKey::String(value)
    }
}

// ============================================================================
// Byte strings
// ============================================================================

/// A read-only byte string.
///
/// Script strings are byte strings; host strings are encoded one byte per
/// character, with characters outside `0..256` replaced by `?`.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct LuaBytes(Arc<[u8]>);

impl LuaBytes {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self(bytes.into())
    }

    /// Encode a host string.
    pub fn encode(string: &str) -> Self {
        let bytes: Vec<u8> = string
            .chars()
            .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
            .collect();
        Self(bytes.into())
    }

    /// Decode back into a host string, one character per byte.
    pub fn decode(&self) -> String {
        self.0.iter().map(|&b| char::from(b)).collect()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl Deref for LuaBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for LuaBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LuaBytes({:?})", self.decode())
    }
}

// ============================================================================
// Conversion into script values
// ============================================================================

/// Conversion of host values into script values.
pub trait IntoLua {
    fn into_lua(self) -> Value;
}

impl IntoLua for Value {
    fn into_lua(self) -> Value {
        self
    }
}

impl IntoLua for () {
    fn into_lua(self) -> Value {
        Value::Nil
    }
}

macro_rules! into_lua_via_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoLua for $ty {
                fn into_lua(self) -> Value {
                    Value::from(self)
                }
            }
        )*
    };
}

into_lua_via_from!(bool, i32, i64, f64, &str, String, Arc<Table>);

impl IntoLua for u32 {
    fn into_lua(self) -> Value {
        Value::Number(self as f64)
    }
}

impl IntoLua for usize {
    fn into_lua(self) -> Value {
        Value::Number(self as f64)
    }
}

impl IntoLua for f32 {
    fn into_lua(self) -> Value {
        Value::Number(self as f64)
    }
}

impl IntoLua for LuaBytes {
    fn into_lua(self) -> Value {
        Value::String(self.decode())
    }
}

impl<T: IntoLua> IntoLua for Option<T> {
    fn into_lua(self) -> Value {
        self.map_or(Value::Nil, IntoLua::into_lua)
    }
}

impl<T: IntoLua> IntoLua for Vec<T> {
    fn into_lua(self) -> Value {
        Value::array(self.into_iter().map(IntoLua::into_lua))
    }
}

impl<K, V> IntoLua for FxHashMap<K, V>
where
    K: Into<TableKey>,
    V: IntoLua,
{
    fn into_lua(self) -> Value {
        Value::table(self.into_iter().map(|(k, v)| (k.into(), v.into_lua())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names_match_script_names() {
        assert_eq!(Value::Nil.type_name(), "nil");
        assert_eq!(Value::from(true).type_name(), "boolean");
        assert_eq!(Value::from(1.5).type_name(), "number");
        assert_eq!(Value::from("x").type_name(), "string");
        assert_eq!(Value::table([]).type_name(), "table");
    }

    #[test]
    fn bytes_replace_wide_characters() {
        let bytes = LuaBytes::encode("a\u{e9}\u{263a}");
        assert_eq!(bytes.as_slice(), &[b'a', 0xe9, b'?']);
        assert_eq!(bytes.decode(), "a\u{e9}?");
    }

    #[test]
    fn vec_becomes_one_based_array() {
        let value = vec!["a", "b"].into_lua();
        let table = value.as_table().cloned().unwrap_or_default();
        assert_eq!(table.get(&TableKey::from(1)), Some(&Value::from("a")));
        assert_eq!(table.get(&TableKey::from(2)), Some(&Value::from("b")));
        assert_eq!(table.get(&TableKey::from(0)), None);
    }

    #[test]
    fn integer_and_float_keys_coincide() {
        assert_eq!(TableKey::from(3), TableKey::from(3.0));
        assert_eq!(TableKey::from_value(&Value::Nil), None);
    }
}

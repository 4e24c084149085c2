//! Typed views over script tables.

use std::sync::Arc;

use crate::error::{LuaResult, bad_field, bad_table_item, numeric_type};
use crate::value::{Table, TableKey, Value};

/// A table argument read without copying, with typed accessors.
///
/// Only methods declared with `unsafe_tables` receive these, as the view
/// shares storage with the caller's table.
#[derive(Debug, Clone, PartialEq)]
pub struct LuaTable {
    table: Arc<Table>,
}

impl LuaTable {
    pub fn new(table: Arc<Table>) -> Self {
        Self { table }
    }

    /// Length of the array part: the number of consecutive keys from 1.
    pub fn len(&self) -> usize {
        (1..)
            .take_while(|i: &i64| self.table.contains_key(&TableKey::from(*i)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn raw(&self) -> &Table {
        &self.table
    }

    pub fn into_inner(self) -> Arc<Table> {
        self.table
    }

    /// The value at `key`, or [`Value::Nil`].
    pub fn get(&self, key: impl Into<TableKey>) -> Value {
        self.table.get(&key.into()).cloned().unwrap_or_default()
    }

    // ------------------------------------------------------------------------
    // By position
    // ------------------------------------------------------------------------

    pub fn get_double(&self, index: i64) -> LuaResult<f64> {
        match self.get(index) {
            Value::Number(n) => Ok(n),
            other => Err(bad_table_item(index, "number", other.type_name())),
        }
    }

    pub fn get_long(&self, index: i64) -> LuaResult<i64> {
        let n = self.get_double(index)?;
        if n.is_finite() {
            Ok(n as i64)
        } else {
            Err(bad_table_item(index, "number", numeric_type(n)))
        }
    }

    pub fn get_int(&self, index: i64) -> LuaResult<i32> {
        Ok(self.get_long(index)? as i32)
    }

    pub fn get_boolean(&self, index: i64) -> LuaResult<bool> {
        match self.get(index) {
            Value::Boolean(b) => Ok(b),
            other => Err(bad_table_item(index, "boolean", other.type_name())),
        }
    }

    pub fn get_string(&self, index: i64) -> LuaResult<String> {
        match self.get(index) {
            Value::String(s) => Ok(s),
            other => Err(bad_table_item(index, "string", other.type_name())),
        }
    }

    pub fn get_table(&self, index: i64) -> LuaResult<LuaTable> {
        match self.get(index) {
            Value::Table(t) => Ok(LuaTable::new(t)),
            other => Err(bad_table_item(index, "table", other.type_name())),
        }
    }

    // ------------------------------------------------------------------------
    // By field name
    // ------------------------------------------------------------------------

    pub fn field_double(&self, key: &str) -> LuaResult<f64> {
        match self.get(key) {
            Value::Number(n) => Ok(n),
            other => Err(bad_field(key, "number", other.type_name())),
        }
    }

    pub fn field_long(&self, key: &str) -> LuaResult<i64> {
        let n = self.field_double(key)?;
        if n.is_finite() {
            Ok(n as i64)
        } else {
            Err(bad_field(key, "number", numeric_type(n)))
        }
    }

    pub fn field_int(&self, key: &str) -> LuaResult<i32> {
        Ok(self.field_long(key)? as i32)
    }

    pub fn field_boolean(&self, key: &str) -> LuaResult<bool> {
        match self.get(key) {
            Value::Boolean(b) => Ok(b),
            other => Err(bad_field(key, "boolean", other.type_name())),
        }
    }

    pub fn field_string(&self, key: &str) -> LuaResult<String> {
        match self.get(key) {
            Value::String(s) => Ok(s),
            other => Err(bad_field(key, "string", other.type_name())),
        }
    }

    pub fn field_table(&self, key: &str) -> LuaResult<LuaTable> {
        match self.get(key) {
            Value::Table(t) => Ok(LuaTable::new(t)),
            other => Err(bad_field(key, "table", other.type_name())),
        }
    }
}

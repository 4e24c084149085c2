//! Enumerations passed by name.
//!
//! Scripts pass enum members as strings; the host matches them
//! case-insensitively against the member names. Implement [`LuaEnum`] with
//! `#[derive(LuaEnum)]`.

use std::any::TypeId;
use std::fmt;

use crate::error::{LuaResult, unknown_option};

/// A host enumeration addressable by member name.
pub trait LuaEnum: Copy + Send + Sync + 'static {
    /// All members, in declaration order.
    const VARIANTS: &'static [Self];
    /// Script-facing member names, parallel to [`LuaEnum::VARIANTS`].
    const NAMES: &'static [&'static str];

    /// Position of this member in [`LuaEnum::VARIANTS`].
    fn ordinal(self) -> usize;

    fn lua_name(self) -> &'static str {
        Self::NAMES[self.ordinal()]
    }

    fn info() -> EnumInfo {
        EnumInfo {
            id: TypeId::of::<Self>(),
            name: std::any::type_name::<Self>(),
            names: Self::NAMES,
        }
    }

    /// Look up a member by name, ignoring case.
    fn from_lua_name(name: &str) -> Option<Self> {
        Self::info().position(name).map(|i| Self::VARIANTS[i])
    }
}

/// Type-erased description of a [`LuaEnum`].
#[derive(Clone, Copy)]
pub struct EnumInfo {
    pub id: TypeId,
    pub name: &'static str,
    pub names: &'static [&'static str],
}

impl EnumInfo {
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n.eq_ignore_ascii_case(name))
    }

    /// Resolve `value` for argument `index`, or fail with `unknown option`.
    pub fn check(&self, index: usize, value: &str) -> LuaResult<usize> {
        self.position(value)
            .ok_or_else(|| unknown_option(index, value))
    }
}

impl PartialEq for EnumInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for EnumInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnumInfo")
            .field("name", &self.name)
            .field("names", &self.names)
            .finish()
    }
}

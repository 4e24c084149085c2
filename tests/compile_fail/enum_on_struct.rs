//! LuaEnum on a struct.
#![allow(dead_code)]

use luabind::LuaEnum;

#[derive(LuaEnum)]
struct Side;

fn main() {}

//! LuaEnum variants carrying data.
#![allow(dead_code)]

use luabind::LuaEnum;

#[derive(LuaEnum)]
enum Side {
    Top,
    Left(u8),
}

fn main() {}

//! `generic` on a function without `&self`.
#![allow(dead_code)]

use luabind::lua_function;

struct Inventory;

impl Inventory {
    #[lua_function(generic)]
    pub fn size() -> i32 {
        0
    }
}

fn main() {}

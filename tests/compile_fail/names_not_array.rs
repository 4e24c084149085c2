//! `names` given a single string instead of an array.
#![allow(dead_code)]

use luabind::lua_function;

struct Turtle;

impl Turtle {
    #[lua_function(names = "dig")]
    pub fn dig(&self) -> bool {
        true
    }
}

fn main() {}

//! Unknown lua_function attribute.
#![allow(dead_code)]

use luabind::lua_function;

struct Turtle;

impl Turtle {
    #[lua_function(frobnicate)]
    pub fn forward(&self) -> bool {
        true
    }
}

fn main() {}

//! Methods with type parameters are rejected.
#![allow(dead_code)]

use luabind::lua_function;

struct Turtle;

impl Turtle {
    #[lua_function]
    pub fn store<T>(&self, _item: T) {}
}

fn main() {}

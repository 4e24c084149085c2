//! Methods must take `&self`.
#![allow(dead_code)]

use luabind::lua_function;

struct Turtle;

impl Turtle {
    #[lua_function]
    pub fn refuel(&mut self) {}
}

fn main() {}

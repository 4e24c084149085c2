//! Async methods are rejected.
#![allow(dead_code)]

use luabind::lua_function;

struct Turtle;

impl Turtle {
    #[lua_function]
    pub async fn forward(&self) -> bool {
        true
    }
}

fn main() {}

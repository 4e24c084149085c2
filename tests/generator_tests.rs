//! Integration tests for binding generation: which declarations bind, under
//! which names, and how their parameters are read.


use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use luabind::core::{Arg, HostType, Invoker, Outcome, ReturnKind, TypeRef};
use luabind::prelude::*;
use test_harness::{args, call, lua_context, method_names};

// ============================================================================
// Fixtures
// ============================================================================

struct Basic;

impl Basic {
    #[lua_function]
    pub fn go(&self) -> i32 {
        123
    }
}

impl LuaObject for Basic {
    fn class(&self) -> ClassDecl {
        ClassDecl::of::<Basic>().method(Basic::go__lua)
    }
}

struct Empty;

impl LuaObject for Empty {}

struct NonPublic;

impl NonPublic {
    #[lua_function]
    pub fn go(&self) {}
}

impl LuaObject for NonPublic {
    fn class(&self) -> ClassDecl {
        ClassDecl::of::<NonPublic>().private().method(NonPublic::go__lua)
    }
}

struct PrivateMethod;

impl PrivateMethod {
    #[lua_function]
    fn go(&self) {}
}

impl LuaObject for PrivateMethod {
    fn class(&self) -> ClassDecl {
        ClassDecl::of::<PrivateMethod>().method(PrivateMethod::go__lua)
    }
}

struct NonInstance;

impl NonInstance {
    #[lua_function]
    pub fn go() -> i32 {
        1
    }
}

impl LuaObject for NonInstance {
    fn class(&self) -> ClassDecl {
        ClassDecl::of::<NonInstance>().method(NonInstance::go__lua)
    }
}

struct IllegalThrows;

impl IllegalThrows {
    #[lua_function]
    pub fn go(&self) -> Result<(), std::io::Error> {
        Err(std::io::Error::other("disk"))
    }
}

impl LuaObject for IllegalThrows {
    fn class(&self) -> ClassDecl {
        ClassDecl::of::<IllegalThrows>().method(IllegalThrows::go__lua)
    }
}

struct CustomNames;

impl CustomNames {
    #[lua_function(names = ["go1", "go2"])]
    pub fn go(&self) -> &'static str {
        "went"
    }
}

impl LuaObject for CustomNames {
    fn class(&self) -> ClassDecl {
        ClassDecl::of::<CustomNames>().method(CustomNames::go__lua)
    }
}

struct ArgKinds;

impl ArgKinds {
    #[lua_function(name = "objectArg")]
    pub fn object_arg(&self, value: Value) -> Value {
        value
    }

    #[lua_function(name = "intArg")]
    pub fn int_arg(&self, value: i32) -> i32 {
        value * 2
    }

    #[lua_function(name = "optIntArg")]
    pub fn opt_int_arg(&self, value: Option<i32>) -> i32 {
        value.unwrap_or(-1)
    }

    #[lua_function]
    pub fn context(&self, context: Arc<dyn LuaContext>) -> bool {
        context.issue_main_thread_task(Box::new(|| Ok(MethodResult::empty()))).is_err()
    }

    #[lua_function]
    pub fn arguments(&self, arguments: ObjectArguments) -> i32 {
        arguments.count() as i32
    }

    #[lua_function]
    pub fn unknown(&self, _computer: Arc<dyn ComputerAccess>) {}
}

fn no_op() -> Invoker {
    Invoker::Instance(Arc::new(|_: &dyn Any, _: Vec<Arg>| -> Outcome {
        Ok(MethodResult::empty())
    }))
}

impl LuaObject for ArgKinds {
    fn class(&self) -> ClassDecl {
        let map = HostType::Opaque(TypeRef::of::<HashMap<String, i32>>());
        ClassDecl::of::<ArgKinds>()
            .method(ArgKinds::object_arg__lua)
            .method(ArgKinds::int_arg__lua)
            .method(ArgKinds::opt_int_arg__lua)
            .method(ArgKinds::context__lua)
            .method(ArgKinds::arguments__lua)
            .method(ArgKinds::unknown__lua)
            .declare(MethodDecl::from_parts(
                "illegalMap",
                vec![map.clone()],
                ReturnKind::Void,
                None,
                no_op(),
            ))
            .declare(MethodDecl::from_parts(
                "optIllegalMap",
                vec![HostType::Optional(Box::new(map))],
                ReturnKind::Void,
                None,
                no_op(),
            ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, LuaEnum)]
pub enum Facing {
    #[lua(name = "front")]
    Front,
    Back,
}

struct EnumMethods;

impl EnumMethods {
    #[lua_function(name = "getEnum")]
    pub fn get_enum(&self, facing: Facing) -> &'static str {
        facing.lua_name()
    }

    #[lua_function(name = "optEnum")]
    pub fn opt_enum(&self, facing: Option<Facing>) -> &'static str {
        facing.map_or("?", LuaEnum::lua_name)
    }
}

impl LuaObject for EnumMethods {
    fn class(&self) -> ClassDecl {
        ClassDecl::of::<EnumMethods>()
            .method(EnumMethods::get_enum__lua)
            .method(EnumMethods::opt_enum__lua)
    }
}

struct OnMainThread;

impl OnMainThread {
    #[lua_function(main_thread)]
    pub fn go(&self) -> i32 {
        321
    }
}

impl LuaObject for OnMainThread {
    fn class(&self) -> ClassDecl {
        ClassDecl::of::<OnMainThread>().method(OnMainThread::go__lua)
    }
}

struct Unsafe;

impl Unsafe {
    #[lua_function(name = "withUnsafe", unsafe_tables)]
    pub fn with_unsafe(&self, table: LuaTable) -> i32 {
        table.len() as i32
    }

    #[lua_function(name = "withoutUnsafe")]
    pub fn without_unsafe(&self, table: LuaTable) -> i32 {
        table.len() as i32
    }

    #[lua_function(main_thread, unsafe_tables)]
    pub fn invalid(&self, table: LuaTable) -> i32 {
        table.len() as i32
    }
}

impl LuaObject for Unsafe {
    fn class(&self) -> ClassDecl {
        ClassDecl::of::<Unsafe>()
            .method(Unsafe::with_unsafe__lua)
            .method(Unsafe::without_unsafe__lua)
            .method(Unsafe::invalid__lua)
    }
}

struct Explodes;

impl Explodes {
    #[lua_function]
    pub fn go(&self) -> i32 {
        panic!("secret detail")
    }
}

impl LuaObject for Explodes {
    fn class(&self) -> ClassDecl {
        ClassDecl::of::<Explodes>().method(Explodes::go__lua)
    }
}

// ============================================================================
// Tests
// ============================================================================

/// A public instance method binds under its own name and does not yield.
#[test]
fn test_basic() {
    let registry = BindingRegistry::new();
    let methods = registry.lua_methods().get_methods(&Basic);
    assert_eq!(methods.len(), 1);
    assert_eq!(methods[0].name(), "go");
    assert!(methods[0].non_yielding());

    let result = call(registry.lua_methods(), Arc::new(Basic), "go", &args([])).unwrap();
    assert_eq!(result.into_values(), vec![Value::from(123)]);
}

/// Two lookups of one class return the same list.
#[test]
fn test_identical() {
    let registry = BindingRegistry::new();
    let first = registry.lua_methods().get_methods(&Basic);
    let second = registry.lua_methods().get_methods(&Basic);
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_empty() {
    assert!(method_names(&Empty).is_empty());
}

#[test]
fn test_non_public_class() {
    assert!(method_names(&NonPublic).is_empty());
}

#[test]
fn test_non_public_method() {
    assert!(method_names(&PrivateMethod).is_empty());
}

/// Associated functions are skipped rather than bound.
#[test]
fn test_non_instance() {
    assert!(method_names(&NonInstance).is_empty());
}

/// Methods that may raise errors scripts cannot see are rejected.
#[test]
fn test_illegal_throws() {
    test_harness::init_tracing();
    assert!(method_names(&IllegalThrows).is_empty());
}

#[test]
fn test_custom_names() {
    assert_eq!(method_names(&CustomNames), ["go1", "go2"]);

    let registry = BindingRegistry::new();
    let methods = registry.lua_methods().get_methods(&CustomNames);
    assert!(Binding::ptr_eq(methods[0].method(), methods[1].method()));
}

/// Only parameters the family can supply bind.
#[test]
fn test_arg_kinds() {
    assert_eq!(
        method_names(&ArgKinds),
        ["objectArg", "intArg", "optIntArg", "context", "arguments"]
    );
}

#[test]
fn test_arg_kinds_read_arguments() {
    let registry = BindingRegistry::new();
    let supplier = registry.lua_methods();
    let object: Arc<dyn LuaObject> = Arc::new(ArgKinds);
    let call = |name: &str, values: Vec<Value>| {
        test_harness::call(supplier, Arc::clone(&object), name, &args(values))
            .map(MethodResult::into_values)
    };

    assert_eq!(
        call("objectArg", vec![Value::from("x")]).unwrap(),
        vec![Value::from("x")]
    );
    assert_eq!(call("intArg", vec![Value::from(4)]).unwrap(), vec![Value::from(8)]);
    assert_eq!(call("optIntArg", vec![]).unwrap(), vec![Value::from(-1)]);
    assert_eq!(
        call("optIntArg", vec![Value::from(3)]).unwrap(),
        vec![Value::from(3)]
    );
    assert_eq!(call("context", vec![]).unwrap(), vec![Value::from(true)]);
    assert_eq!(
        call("arguments", vec![Value::Nil, Value::from(1)]).unwrap(),
        vec![Value::from(2)]
    );

    let err = call("intArg", vec![Value::from("four")]).unwrap_err();
    assert_eq!(err.message(), "bad argument #1 (number expected, got string)");
}

#[test]
fn test_enum() {
    let registry = BindingRegistry::new();
    let supplier = registry.lua_methods();
    let object: Arc<dyn LuaObject> = Arc::new(EnumMethods);
    let call = |name: &str, values: Vec<Value>| {
        test_harness::call(supplier, Arc::clone(&object), name, &args(values))
            .map(MethodResult::into_values)
    };

    assert_eq!(
        call("getEnum", vec![Value::from("front")]).unwrap(),
        vec![Value::from("front")]
    );
    assert_eq!(
        call("getEnum", vec![Value::from("BACK")]).unwrap(),
        vec![Value::from("Back")]
    );
    assert_eq!(call("optEnum", vec![]).unwrap(), vec![Value::from("?")]);
    assert_eq!(
        call("optEnum", vec![Value::from("wibble")])
            .unwrap_err()
            .message(),
        "bad argument #1 (unknown option wibble)"
    );
}

/// Main thread methods may yield and defer their work.
#[test]
fn test_main_thread() {
    let registry = BindingRegistry::new();
    let methods = registry.lua_methods().get_methods(&OnMainThread);
    assert_eq!(methods.len(), 1);
    assert!(!methods[0].non_yielding());

    let object: Arc<dyn LuaObject> = Arc::new(OnMainThread);
    let err = methods[0]
        .method()
        .apply(&object, &lua_context(), &args([]))
        .unwrap_err();
    assert_eq!(err.message(), "No main thread");

    let executor = MainThread::new();
    let context: LuaCtx = (Arc::new(MainThreadContext::new(Arc::clone(&executor))),);
    let result = methods[0]
        .method()
        .apply(&object, &context, &args([]))
        .unwrap();
    let MethodResult::Yield(pending) = result else {
        panic!("expected the call to yield");
    };
    assert_eq!(executor.run_pending(16), 1);
    let values = pending.wait().unwrap().into_values();
    assert_eq!(values, vec![Value::from(321)]);
}

/// Shared table views need the flag, and never on the main thread.
#[test]
fn test_unsafe() {
    assert_eq!(method_names(&Unsafe), ["withUnsafe"]);

    let registry = BindingRegistry::new();
    let table = Value::array([Value::from(1), Value::from(2)]);
    let result = call(
        registry.lua_methods(),
        Arc::new(Unsafe),
        "withUnsafe",
        &args([table]),
    )
    .unwrap();
    assert_eq!(result.into_values(), vec![Value::from(2)]);
}

/// Host panics reach scripts as an opaque internal error.
#[test]
fn test_panic_is_hidden() {
    let registry = BindingRegistry::new();
    let err = call(registry.lua_methods(), Arc::new(Explodes), "go", &args([])).unwrap_err();
    assert!(err.is_internal());
    assert!(err.message().starts_with("Internal error in"));
    assert!(!err.message().contains("secret"));
}

/// Bindings are generated once per method, however many objects use them.
#[test]
fn test_bindings_are_shared_between_instances() {
    let registry = BindingRegistry::new();
    let supplier = registry.lua_methods();
    supplier.get_methods(&Basic);
    supplier.get_methods(&Basic);
    let a = supplier.collect_methods(&(Arc::new(Basic) as Arc<dyn LuaObject>));
    let b = supplier.collect_methods(&(Arc::new(Basic) as Arc<dyn LuaObject>));
    assert!(Binding::ptr_eq(&a["go"].method, &b["go"].method));
    assert_eq!(supplier.generator().generated(), 1);
}

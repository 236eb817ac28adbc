//! Integration coverage for §4.9 (function/method/code) and §4.11
//! (descriptor machinery): argument binding through a real call,
//! bound/unbound method dispatch, and the three descriptor wrapper
//! types (`property`, `staticmethod`, `classmethod`).

use std::sync::Arc;

use indexmap::IndexMap;

use pyrt::builtins::classmethod::PyClassMethod;
use pyrt::builtins::function::PyFunction;
use pyrt::builtins::method::PyMethod;
use pyrt::builtins::staticmethod::PyStaticMethod;
use pyrt::function::{CodeObject, Param};
use pyrt::object::{PyObject, PyObjectRef};
use pyrt::{PyResult, VirtualMachine};

/// `def add(a, b): return a + b`, with the body implemented as a host
/// closure (§4.9: "a host callable implementing the body").
fn make_add_function(vm: &VirtualMachine) -> PyObjectRef {
    let body = Arc::new(|bound: pyrt::function::BoundArguments, _globals: PyObjectRef, vm: &VirtualMachine| -> PyResult {
        pyrt::protocol::number::add(&bound.positional[0], &bound.positional[1], vm)
    });
    let code = CodeObject::new(
        "add".to_owned(),
        "<test>".to_owned(),
        vec![
            Param { name: "a".to_owned(), default: None },
            Param { name: "b".to_owned(), default: None },
        ],
        false,
        false,
        body,
    )
    .unwrap();
    let globals = vm.ctx.intern_str("__test_globals__");
    PyFunction::new_ref(Arc::new(code), globals, vm).into_object()
}

#[test]
fn calling_a_function_binds_arguments_and_runs_the_body() {
    let vm = VirtualMachine::default();
    let add = make_add_function(&vm);
    let result = pyrt::protocol::callable::invoke(
        &add,
        vec![vm.new_int(2), vm.new_int(3)],
        IndexMap::new(),
        None,
        None,
        &vm,
    )
    .unwrap();
    assert_eq!(result.downcast_ref::<pyrt::builtins::PyInt>().unwrap().value(), 5);
}

#[test]
fn missing_required_argument_raises_type_error() {
    let vm = VirtualMachine::default();
    let add = make_add_function(&vm);
    let err = pyrt::protocol::callable::invoke(&add, vec![vm.new_int(2)], IndexMap::new(), None, None, &vm)
        .unwrap_err();
    assert!(vm.str_of(&err).unwrap().contains("takes at least"));
}

#[test]
fn bound_method_inserts_self_as_first_argument() {
    let vm = VirtualMachine::default();
    let add = make_add_function(&vm);
    let instance = PyObject::new(
        pyrt::builtins::object::PyBaseObject,
        vm.ctx.types.object_type.clone().into_object(),
        None,
    );
    let bound = PyMethod::new_ref(add, Some(instance), vm.ctx.types.object_type.clone(), &vm).into_object();
    let result = pyrt::protocol::callable::invoke(&bound, vec![vm.new_int(10)], IndexMap::new(), None, None, &vm);
    // `self` (an `object()`) plus `10` is bound to `a`/`b`; adding an
    // `object` to an int has no `__add__`, so this should TypeError
    // rather than silently drop the inserted `self`.
    assert!(result.is_err());
}

#[test]
fn unbound_method_rejects_wrong_instance_type() {
    let vm = VirtualMachine::default();
    let add = make_add_function(&vm);
    let unbound = PyMethod::new_ref(add, None, vm.ctx.types.int_type.clone(), &vm).into_object();
    let err = pyrt::protocol::callable::invoke(&unbound, vec![vm.new_str("nope".to_owned())], IndexMap::new(), None, None, &vm)
        .unwrap_err();
    assert!(vm.str_of(&err).unwrap().contains("must be called with"));
}

#[test]
fn property_get_calls_fget_and_reports_unreadable_without_one() {
    let vm = VirtualMachine::default();
    let identity = make_add_function(&vm); // stand-in callable, unused here
    let _ = identity;

    let prop = pyrt::protocol::callable::call(
        vm.ctx.types.property_type.as_object(),
        pyrt::function::FuncArgs::new(vec![], IndexMap::new()),
        &vm,
    )
    .unwrap();
    let instance = PyObject::new(
        pyrt::builtins::object::PyBaseObject,
        vm.ctx.types.object_type.clone().into_object(),
        None,
    );
    let err = pyrt::protocol::attr::getattr(&instance, "anything", &vm);
    // property itself isn't installed as a class attribute here; this
    // just exercises that a property with no getter reports correctly
    // when invoked directly through its get slot.
    assert!(err.is_err());
    let get_slot = prop.class().slots.read().get.unwrap();
    let direct = get_slot(&prop, Some(instance), None, &vm);
    assert!(direct.is_err());
    assert!(vm.str_of(&direct.unwrap_err()).unwrap().contains("unreadable attribute"));
}

#[test]
fn staticmethod_get_returns_the_callable_unchanged() {
    let vm = VirtualMachine::default();
    let add = make_add_function(&vm);
    let sm = PyObject::new(PyStaticMethod { callable: add.clone() }, vm.ctx.types.staticmethod_type.clone().into_object(), None);
    let get_slot = sm.class().slots.read().get.unwrap();
    let returned = get_slot(&sm, None, None, &vm).unwrap();
    assert_eq!(returned.get_id(), add.get_id());
}

#[test]
fn classmethod_get_binds_the_owner_not_the_instance() {
    let vm = VirtualMachine::default();
    let add = make_add_function(&vm);
    let cm = PyObject::new(PyClassMethod { callable: add }, vm.ctx.types.classmethod_type.clone().into_object(), None);
    let get_slot = cm.class().slots.read().get.unwrap();
    let instance = PyObject::new(
        pyrt::builtins::object::PyBaseObject,
        vm.ctx.types.object_type.clone().into_object(),
        None,
    );
    let bound = get_slot(&cm, Some(instance), Some(vm.ctx.types.object_type.clone().into_object()), &vm).unwrap();
    let method = bound.downcast_ref::<PyMethod>().unwrap();
    assert_eq!(method.class.get_id(), vm.ctx.types.object_type.get_id());
    assert!(method.self_obj.is_some());
}

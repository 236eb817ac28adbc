//! Integration coverage for §4.2 (numeric binary-op dispatch), §4.9
//! (argument binding), and §3 (MRO): the S4/S5/S6 end-to-end scenarios
//! from §8, the subclass-prefers-reflected dispatch rule, and the
//! slice-length/divmod-identity properties from §10.4.

use indexmap::IndexMap;
use proptest::prelude::*;

use pyrt::builtins::dict::PyDict;
use pyrt::function::{CodeObject, Param};
use pyrt::object::{PyObject, PyObjectRef};
use pyrt::protocol::number;
use pyrt::protocol::sequence::{normalize_slice, slice_indices, slice_len};
use pyrt::types::pytype::{call_type, isinstance, PyType, TypeFlags, TypeOrTuple};
use pyrt::types::slot::PyTypeSlots;
use pyrt::{PyResult, VirtualMachine};

fn make_class(vm: &VirtualMachine, name: &str, bases: Vec<pyrt::types::PyTypeRef>, slots: PyTypeSlots) -> pyrt::types::PyTypeRef {
    let attributes = PyDict::new_bootstrap_dict(&vm.ctx.types.dict_type);
    let payload = PyType::new_unready(
        name.to_owned(),
        bases,
        attributes,
        "object",
        TypeFlags::INSTANTIABLE | TypeFlags::ACCEPTABLE_AS_BASE | TypeFlags::HAS_DICT,
    );
    let obj = PyObject::new(payload, vm.ctx.types.type_type.clone().into_object(), None);
    let cls: pyrt::types::PyTypeRef = pyrt::object::PyRef::new_unchecked(obj);
    *cls.slots.write() = slots;
    PyType::make_ready(&cls).unwrap();
    cls
}

fn marker(text: &str, vm: &VirtualMachine) -> PyResult {
    Ok(vm.new_str(text.to_owned()))
}

fn base_add(_v: &PyObjectRef, _w: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    marker("forward", vm)
}

fn derived_radd(_v: &PyObjectRef, _w: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    marker("reflected", vm)
}

#[test]
fn subclass_overriding_reflected_add_wins_over_base_forward_add() {
    let vm = VirtualMachine::default();

    let mut base_slots = PyTypeSlots::default();
    base_slots.number.add = Some(base_add);
    let base = make_class(&vm, "Base", vec![vm.ctx.types.object_type.clone()], base_slots);

    let mut derived_slots = PyTypeSlots::default();
    derived_slots.number.radd = Some(derived_radd);
    let derived = make_class(&vm, "Derived", vec![base.clone()], derived_slots);

    let a = call_type(base, pyrt::function::FuncArgs::new(vec![], IndexMap::new()), &vm).unwrap();
    let b = call_type(derived, pyrt::function::FuncArgs::new(vec![], IndexMap::new()), &vm).unwrap();

    let result = number::add(&a, &b, &vm).unwrap();
    assert_eq!(vm.str_of(&result).unwrap(), "reflected");
}

#[test]
fn same_type_operands_never_consult_the_reflected_slot() {
    let vm = VirtualMachine::default();
    let mut slots = PyTypeSlots::default();
    slots.number.add = Some(base_add);
    let ty = make_class(&vm, "Plain", vec![vm.ctx.types.object_type.clone()], slots);

    let a = call_type(ty.clone(), pyrt::function::FuncArgs::new(vec![], IndexMap::new()), &vm).unwrap();
    let b = call_type(ty, pyrt::function::FuncArgs::new(vec![], IndexMap::new()), &vm).unwrap();
    let result = number::add(&a, &b, &vm).unwrap();
    assert_eq!(vm.str_of(&result).unwrap(), "forward");
}

/// S4: formals `[a, b=None]` plus `**kwargs`.
fn s4_code(vm: &VirtualMachine) -> CodeObject {
    CodeObject::new(
        "f".to_owned(),
        "<test>".to_owned(),
        vec![
            Param { name: "a".to_owned(), default: None },
            Param { name: "b".to_owned(), default: Some(vm.none()) },
        ],
        false,
        true,
        std::sync::Arc::new(|bound, _globals, _vm| Ok(bound.positional[0].clone())),
    )
    .unwrap()
}

#[test]
fn s4_positional_with_extra_keyword_binds_default_and_varkw() {
    let vm = VirtualMachine::default();
    let code = s4_code(&vm);
    let mut kwargs = IndexMap::new();
    kwargs.insert("c".to_owned(), vm.new_int(2));
    let bound = code.bind_arguments(vec![vm.new_int(1)], kwargs, &vm).unwrap();

    assert_eq!(bound.positional[0].downcast_ref::<pyrt::builtins::PyInt>().unwrap().value(), 1);
    assert!(vm.is_none(&bound.positional[1]));
    assert_eq!(bound.varkw.len(), 1);
    assert_eq!(bound.varkw["c"].downcast_ref::<pyrt::builtins::PyInt>().unwrap().value(), 2);
}

#[test]
fn s4_all_keyword_call_binds_identically() {
    let vm = VirtualMachine::default();
    let code = s4_code(&vm);
    let mut kwargs = IndexMap::new();
    kwargs.insert("a".to_owned(), vm.new_int(1));
    kwargs.insert("c".to_owned(), vm.new_int(2));
    let bound = code.bind_arguments(vec![], kwargs, &vm).unwrap();

    assert_eq!(bound.positional[0].downcast_ref::<pyrt::builtins::PyInt>().unwrap().value(), 1);
    assert!(vm.is_none(&bound.positional[1]));
    assert_eq!(bound.varkw["c"].downcast_ref::<pyrt::builtins::PyInt>().unwrap().value(), 2);
}

#[test]
fn s4_too_many_positional_arguments_raises_type_error() {
    let vm = VirtualMachine::default();
    let code = s4_code(&vm);
    let err = code
        .bind_arguments(vec![vm.new_int(1), vm.new_int(2), vm.new_int(3)], IndexMap::new(), &vm)
        .unwrap_err();
    assert_eq!(vm.str_of(&err).unwrap(), "f() takes 2 arguments (3 given)");
}

/// S5: `A`, `B(A)`, `C(A)`, `D(B, C)`; `D.mro() == [D, B, C, A, object]`.
#[test]
fn s5_diamond_inheritance_linearises_to_the_expected_mro() {
    let vm = VirtualMachine::default();
    let object_ty = vm.ctx.types.object_type.clone();

    let a = make_class(&vm, "A", vec![object_ty.clone()], PyTypeSlots::default());
    let b = make_class(&vm, "B", vec![a.clone()], PyTypeSlots::default());
    let c = make_class(&vm, "C", vec![a.clone()], PyTypeSlots::default());
    let d = make_class(&vm, "D", vec![b.clone(), c.clone()], PyTypeSlots::default());

    let names: Vec<String> = d.mro().iter().map(|t| t.name.clone()).collect();
    assert_eq!(names, vec!["D", "B", "C", "A", "object"]);

    let instance = call_type(d, pyrt::function::FuncArgs::new(vec![], IndexMap::new()), &vm).unwrap();
    assert!(isinstance(&instance, &TypeOrTuple::Type(a)));
}

/// S6: float divmod scenarios.
#[test]
fn s6_float_divmod_matches_the_worked_examples() {
    let vm = VirtualMachine::default();

    let result = number::divmod(&vm.new_float(-12.5), &vm.new_float(4.0), &vm).unwrap();
    let tuple = result.downcast_ref::<pyrt::builtins::PyTuple>().unwrap();
    let (q, r) = (tuple.elements()[0].clone(), tuple.elements()[1].clone());
    assert_eq!(q.downcast_ref::<pyrt::builtins::PyFloat>().unwrap().value(), -4.0);
    assert_eq!(r.downcast_ref::<pyrt::builtins::PyFloat>().unwrap().value(), 3.5);

    let inf_result = number::divmod(&vm.new_float(f64::INFINITY), &vm.new_float(f64::INFINITY), &vm).unwrap();
    let inf_tuple = inf_result.downcast_ref::<pyrt::builtins::PyTuple>().unwrap();
    assert!(inf_tuple.elements()[0].downcast_ref::<pyrt::builtins::PyFloat>().unwrap().value().is_nan());
    assert!(inf_tuple.elements()[1].downcast_ref::<pyrt::builtins::PyFloat>().unwrap().value().is_nan());

    let err = number::divmod(&vm.new_float(1.0), &vm.new_float(0.0), &vm).unwrap_err();
    assert!(isinstance(&err, &TypeOrTuple::Type(vm.ctx.exceptions.zero_division_error_type.clone())));
    assert_eq!(vm.str_of(&err).unwrap(), "float division or modulo by zero");
}

proptest! {
    /// §10.4 slice-length property: the closed-form `slice_len` always
    /// agrees with the count of indices `slice_indices` actually yields,
    /// across arbitrary normalised `(start, stop, step)` triples.
    #[test]
    fn slice_len_matches_the_number_of_indices_yielded(
        n in 0isize..40,
        raw_start in -80isize..80,
        raw_stop in -80isize..80,
        step in prop_oneof![-5isize..0, 1isize..5],
    ) {
        let vm = VirtualMachine::default();
        let slice = normalize_slice(Some(raw_start), Some(raw_stop), Some(step), n, &vm).unwrap();
        let counted = slice_indices(slice).count();
        prop_assert_eq!(slice_len(slice), counted);
        for i in slice_indices(slice) {
            prop_assert!(i >= 0 && i < n);
        }
    }

    /// §10.4 divmod-identity property: `a == q*b + r` for `int` divmod,
    /// with `r`'s sign following `b`'s (or zero), per §4.8.
    #[test]
    fn int_divmod_identity_holds(a in -1000i64..1000, b in prop_oneof![-1000i64..0, 1i64..1000]) {
        let vm = VirtualMachine::default();
        let result = number::divmod(&vm.new_int(a), &vm.new_int(b), &vm).unwrap();
        let tuple = result.downcast_ref::<pyrt::builtins::PyTuple>().unwrap();
        let q = tuple.elements()[0].downcast_ref::<pyrt::builtins::PyInt>().unwrap().value();
        let r = tuple.elements()[1].downcast_ref::<pyrt::builtins::PyInt>().unwrap().value();
        prop_assert_eq!(a, q * b + r);
        prop_assert!(r == 0 || (r < 0) == (b < 0));
    }

    /// Same identity, for `float` divmod.
    #[test]
    fn float_divmod_identity_holds(a in -1000.0f64..1000.0, b in prop_oneof![-1000.0f64..-0.1, 0.1f64..1000.0]) {
        let vm = VirtualMachine::default();
        let result = number::divmod(&vm.new_float(a), &vm.new_float(b), &vm).unwrap();
        let tuple = result.downcast_ref::<pyrt::builtins::PyTuple>().unwrap();
        let q = tuple.elements()[0].downcast_ref::<pyrt::builtins::PyFloat>().unwrap().value();
        let r = tuple.elements()[1].downcast_ref::<pyrt::builtins::PyFloat>().unwrap().value();
        prop_assert!((a - (q * b + r)).abs() < 1e-6 * a.abs().max(1.0));
    }
}

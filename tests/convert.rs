//! Integration coverage for §4.12 (the native host-value bridge):
//! the numeric/string mapping rules, the opaque-native-object escape
//! hatch, and arity-checked native-closure wrapping.

use pyrt::builtins::PyInt;
use pyrt::convert::{downcast_native, wrap_native_fn, wrap_native_varargs_fn, Native, ToPyObject, TryFromObject};
use pyrt::VirtualMachine;

#[test]
fn small_integers_map_to_int_and_huge_ones_promote_to_long() {
    let vm = VirtualMachine::default();
    let small = 42i64.to_pyobject(&vm);
    assert!(small.downcast_ref::<PyInt>().is_some());

    let huge = u64::MAX.to_pyobject(&vm);
    assert!(huge.downcast_ref::<pyrt::builtins::long::PyLong>().is_some());
}

#[test]
fn bool_and_float_and_string_round_trip() {
    let vm = VirtualMachine::default();
    assert_eq!(bool::try_from_object(&true.to_pyobject(&vm), &vm).unwrap(), true);
    assert_eq!(f64::try_from_object(&2.5f64.to_pyobject(&vm), &vm).unwrap(), 2.5);
    assert_eq!(String::try_from_object(&"hi".to_pyobject(&vm), &vm).unwrap(), "hi");
}

#[test]
fn an_int_object_also_converts_cleanly_to_a_float_parameter() {
    let vm = VirtualMachine::default();
    let obj = 7i64.to_pyobject(&vm);
    assert_eq!(f64::try_from_object(&obj, &vm).unwrap(), 7.0);
}

#[test]
fn none_maps_both_ways_through_option() {
    let vm = VirtualMachine::default();
    let none_obj: Option<i64> = None;
    assert!(vm.is_none(&none_obj.to_pyobject(&vm)));

    let back = Option::<i64>::try_from_object(&vm.none(), &vm).unwrap();
    assert_eq!(back, None);

    let some_obj = Some(3i64).to_pyobject(&vm);
    assert_eq!(i64::try_from_object(&some_obj, &vm).unwrap(), 3);
}

#[test]
fn wrong_type_conversion_is_a_type_error() {
    let vm = VirtualMachine::default();
    let s = "not an int".to_pyobject(&vm);
    let err = i64::try_from_object(&s, &vm).unwrap_err();
    assert!(vm.str_of(&err).unwrap().contains("expected int"));
}

#[test]
fn an_opaque_native_value_round_trips_through_downcast() {
    let vm = VirtualMachine::default();
    let obj = Native(vec![1u8, 2, 3]).to_pyobject(&vm);
    assert_eq!(downcast_native::<Vec<u8>>(&obj), Some(&vec![1u8, 2, 3]));
    assert_eq!(downcast_native::<String>(&obj), None);
}

#[test]
fn a_fixed_arity_native_closure_adds_two_ints_and_enforces_arity() {
    let vm = VirtualMachine::default();
    let add = wrap_native_fn(
        "add",
        2,
        |args, vm| {
            let a = i64::try_from_object(&args[0], vm)?;
            let b = i64::try_from_object(&args[1], vm)?;
            Ok((a + b).to_pyobject(vm))
        },
        &vm,
    );

    let result = vm.invoke(&add, vec![vm.new_int(3), vm.new_int(4)]).unwrap();
    assert_eq!(i64::try_from_object(&result, &vm).unwrap(), 7);

    let err = vm.invoke(&add, vec![vm.new_int(1)]).unwrap_err();
    assert!(vm.str_of(&err).unwrap().contains("takes"));
}

#[test]
fn a_variadic_native_closure_sums_whatever_it_is_given() {
    let vm = VirtualMachine::default();
    let sum = wrap_native_varargs_fn(
        "sum",
        |args, vm| {
            let mut total = 0i64;
            for a in &args {
                total += i64::try_from_object(a, vm)?;
            }
            Ok(total.to_pyobject(vm))
        },
        &vm,
    );

    let result = vm.invoke(&sum, vec![vm.new_int(1), vm.new_int(2), vm.new_int(3)]).unwrap();
    assert_eq!(i64::try_from_object(&result, &vm).unwrap(), 6);
}

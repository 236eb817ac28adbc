//! Integration coverage for §4.10 (generator & iterator protocol): the
//! send/throw/close state machine, the StopIteration-at-exhaustion rule,
//! and the `__getitem__`-wrapping sequence iterator fallback.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use pyrt::builtins::generator::{GeneratorResume, GeneratorStep, PyGenerator, PyGeneratorRef};
use pyrt::builtins::list::PyList;
use pyrt::object::PyObjectRef;
use pyrt::types::pytype::{isinstance, TypeOrTuple};
use pyrt::{PyResult, VirtualMachine};

fn is_stop_iteration(err: &PyObjectRef, vm: &VirtualMachine) -> bool {
    isinstance(err, &TypeOrTuple::Type(vm.ctx.exceptions.stop_iteration_type.clone()))
}

/// A generator equivalent to `def count_to(n): for i in range(n): yield i`,
/// with `state` holding the next value to produce as a Python int.
fn make_counter(vm: &VirtualMachine, n: i64) -> PyGeneratorRef {
    let body = Arc::new(move |state: PyObjectRef, resume: GeneratorResume, vm: &VirtualMachine| -> PyResult<GeneratorStep> {
        if let GeneratorResume::Throw(exc) = resume {
            return Err(exc);
        }
        let i = state.downcast_ref::<pyrt::builtins::PyInt>().unwrap().value();
        if i >= n {
            return Ok(GeneratorStep::Return(vm.none()));
        }
        Ok(GeneratorStep::Yield { value: vm.new_int(i), state: vm.new_int(i + 1) })
    });
    PyGenerator::new_ref("count_to".to_owned(), body, vm.new_int(0), vm)
}

fn int_value(obj: &PyObjectRef) -> i64 {
    obj.downcast_ref::<pyrt::builtins::PyInt>().unwrap().value()
}

#[test]
fn generator_yields_then_raises_stop_iteration() {
    let vm = VirtualMachine::default();
    let gen = make_counter(&vm, 3);
    let mut seen = Vec::new();
    loop {
        match gen.next(&vm) {
            Ok(v) => seen.push(int_value(&v)),
            Err(e) => {
                assert!(is_stop_iteration(&e, &vm));
                break;
            }
        }
    }
    assert_eq!(seen, vec![0, 1, 2]);
}

#[test]
fn sending_non_none_to_a_just_started_generator_is_a_type_error() {
    let vm = VirtualMachine::default();
    let gen = make_counter(&vm, 3);
    let err = gen.send(vm.new_int(5), &vm).unwrap_err();
    assert!(vm.str_of(&err).unwrap().contains("just-started"));
    // the rejection must not mark the generator started.
    assert_eq!(int_value(&gen.next(&vm).unwrap()), 0);
}

#[test]
fn closing_an_unstarted_generator_is_a_no_op() {
    let vm = VirtualMachine::default();
    let gen = make_counter(&vm, 3);
    gen.close(&vm).unwrap();
    let err = gen.next(&vm).unwrap_err();
    assert!(is_stop_iteration(&err, &vm));
}

#[test]
fn closing_a_suspended_generator_injects_generator_exit_and_succeeds() {
    let vm = VirtualMachine::default();
    let gen = make_counter(&vm, 3);
    assert_eq!(int_value(&gen.next(&vm).unwrap()), 0);
    gen.close(&vm).unwrap();
    let err = gen.next(&vm).unwrap_err();
    assert!(is_stop_iteration(&err, &vm));
}

#[test]
fn a_generator_body_that_ignores_generator_exit_is_a_runtime_error() {
    let vm = VirtualMachine::default();
    let counter = Arc::new(AtomicI64::new(0));
    let counter2 = counter.clone();
    let body = Arc::new(move |_state: PyObjectRef, _resume: GeneratorResume, vm: &VirtualMachine| -> PyResult<GeneratorStep> {
        let i = counter2.fetch_add(1, Ordering::SeqCst);
        Ok(GeneratorStep::Yield { value: vm.new_int(i), state: vm.none() })
    });
    let gen = PyGenerator::new_ref("stubborn".to_owned(), body, vm.none(), &vm);
    gen.next(&vm).unwrap();
    let err = gen.close(&vm).unwrap_err();
    assert!(vm.str_of(&err).unwrap().contains("ignored GeneratorExit"));
}

#[test]
fn sequence_iterator_wraps_getitem_and_stops_on_index_error() {
    let vm = VirtualMachine::default();
    let list = PyList::new_ref(vec![vm.new_int(10), vm.new_int(20)], &vm).into_object();
    let it = pyrt::builtins::iterator::iter(&list, &vm).unwrap();

    let next_slot = it.class().slots.read().next.unwrap();
    let a = next_slot(&it, &vm).unwrap();
    assert_eq!(int_value(&a), 10);
    let b = next_slot(&it, &vm).unwrap();
    assert_eq!(int_value(&b), 20);
    let err = next_slot(&it, &vm).unwrap_err();
    assert!(is_stop_iteration(&err, &vm));
}

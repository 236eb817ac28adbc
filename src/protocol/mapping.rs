//! C2: the `Contains`/`GetItem`/`SetItem`/`Len` slots, dispatched the
//! same way §4.1 attribute lookup consults the type, not the instance.

use crate::object::PyObjectRef;
use crate::vm::{PyResult, VirtualMachine};

pub fn len(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult<usize> {
    let slot = obj.class().slots.read().mapping.len;
    slot.ok_or_else(|| vm.new_type_error(format!("object of type '{}' has no len()", obj.class().name)))
        .and_then(|f| f(obj, vm))
}

pub fn contains(obj: &PyObjectRef, item: &PyObjectRef, vm: &VirtualMachine) -> PyResult<bool> {
    let slot = obj.class().slots.read().mapping.contains;
    match slot {
        Some(f) => vm.bool_truth(&f(obj, item, vm)?),
        None => Err(vm.new_type_error(format!(
            "argument of type '{}' is not iterable",
            obj.class().name
        ))),
    }
}

pub fn getitem(obj: &PyObjectRef, key: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let slot = obj.class().slots.read().mapping.getitem;
    slot.ok_or_else(|| {
        vm.new_type_error(format!("'{}' object is not subscriptable", obj.class().name))
    })
    .and_then(|f| f(obj, key, vm))
}

pub fn setitem(obj: &PyObjectRef, key: &PyObjectRef, value: &PyObjectRef, vm: &VirtualMachine) -> PyResult<()> {
    let slot = obj.class().slots.read().mapping.setitem;
    slot.ok_or_else(|| {
        vm.new_type_error(format!(
            "'{}' object does not support item assignment",
            obj.class().name
        ))
    })
    .and_then(|f| f(obj, key, value, vm))
}

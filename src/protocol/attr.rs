//! C1 §4.1: attribute lookup, the descriptor-precedence algorithm, and
//! the default `__setattr__`/`__delattr__` behaviour.
//!
//! Grounded in the teacher's `object/ext.rs` generic `__getattribute__`
//! and `builtins/descriptor.rs` for the data/non-data split (§4.11).

use crate::builtins::dict::PyDict;
use crate::object::{PyObjectRef, PyRef};
use crate::types::PyTypeRef;
use crate::vm::{PyResult, VirtualMachine};

/// Look up `name` in `ty`'s MRO, returning the raw value and the type
/// that defined it (the "owner"), without invoking any descriptor.
pub fn lookup_in_mro(ty: &PyTypeRef, name: &str, vm: &VirtualMachine) -> Option<(PyObjectRef, PyTypeRef)> {
    for base in ty.mro() {
        if let Some(v) = base.attributes.get_item_str(name, vm) {
            return Some((v, base));
        }
    }
    None
}

fn is_data_descriptor(value: &PyObjectRef) -> bool {
    let slots = value.class().slots.read();
    slots.set.is_some() || slots.delete.is_some()
}

fn is_descriptor(value: &PyObjectRef) -> bool {
    let slots = value.class().slots.read();
    slots.get.is_some() || slots.set.is_some() || slots.delete.is_some()
}

/// The default `object.__getattribute__` algorithm (§4.1, four steps).
pub fn generic_get_attribute(
    obj: &PyObjectRef,
    name: &str,
    vm: &VirtualMachine,
) -> PyResult {
    let ty = obj.class();

    // (1) data descriptor in the MRO
    if let Some((value, owner)) = lookup_in_mro(&ty, name, vm) {
        if is_data_descriptor(&value) {
            let get = value.class().slots.read().get;
            if let Some(get) = get {
                return get(&value, Some(obj.clone()), Some(owner.into_object()), vm);
            }
            return Ok(value);
        }

        // (3, deferred) remember the non-data descriptor / plain class
        // attribute for after the instance dict is checked.
        return finish_lookup(obj, name, Some((value, owner)), vm);
    }

    finish_lookup(obj, name, None, vm)
}

fn finish_lookup(
    obj: &PyObjectRef,
    name: &str,
    class_attr: Option<(PyObjectRef, PyTypeRef)>,
    vm: &VirtualMachine,
) -> PyResult {
    // (2) instance __dict__
    if let Some(dict) = obj.dict() {
        if let Some(v) = dict.get_item_str(name, vm) {
            return Ok(v);
        }
    }

    // (3) non-data descriptor or plain value from the MRO
    if let Some((value, _owner)) = class_attr {
        if is_descriptor(&value) {
            let get = value.class().slots.read().get;
            if let Some(get) = get {
                return get(&value, Some(obj.clone()), Some(obj.class().into_object()), vm);
            }
        }
        return Ok(value);
    }

    // (4)
    Err(vm.new_attribute_error(format!(
        "'{}' object has no attribute '{}'",
        obj.class().name,
        name
    )))
}

/// The default `object.__setattr__`: consult data descriptors in the
/// MRO first, else write to the instance `__dict__`.
pub fn generic_set_attribute(
    obj: &PyObjectRef,
    name: &str,
    value: PyObjectRef,
    vm: &VirtualMachine,
) -> PyResult<()> {
    let ty = obj.class();
    if let Some((descr, _owner)) = lookup_in_mro(&ty, name, vm) {
        if is_data_descriptor(&descr) {
            let set = descr.class().slots.read().set;
            if let Some(set) = set {
                return set(&descr, obj.clone(), value, vm);
            }
            return Err(vm.new_attribute_error(format!("can't set attribute '{}'", name)));
        }
    }
    let dict = ensure_instance_dict(obj, vm)?;
    dict.set_item_str(name, value, vm);
    Ok(())
}

pub fn generic_del_attribute(obj: &PyObjectRef, name: &str, vm: &VirtualMachine) -> PyResult<()> {
    let ty = obj.class();
    if let Some((descr, _owner)) = lookup_in_mro(&ty, name, vm) {
        if is_data_descriptor(&descr) {
            let delete = descr.class().slots.read().delete;
            if let Some(delete) = delete {
                return delete(&descr, obj.clone(), vm);
            }
            return Err(vm.new_attribute_error(format!("can't delete attribute '{}'", name)));
        }
    }
    match obj.dict() {
        Some(dict) if dict.del_item_str(name, vm) => Ok(()),
        _ => Err(vm.new_attribute_error(format!(
            "'{}' object has no attribute '{}'",
            obj.class().name,
            name
        ))),
    }
}

/// `getattr(obj, name)`: goes through the class's `get_attribute` slot
/// rather than calling [`generic_get_attribute`] directly, so a type
/// that overrides `__getattribute__` is honored (§4.1, §4.2's slot
/// inheritance invariant (i) guarantees every type has this slot set,
/// since `object` supplies the default and it's never left unset).
pub fn getattr(obj: &PyObjectRef, name: &str, vm: &VirtualMachine) -> PyResult {
    let slot = obj
        .class()
        .slots
        .read()
        .get_attribute
        .expect("every type inherits object's get_attribute slot");
    slot(obj, name, vm)
}

pub fn setattr(obj: &PyObjectRef, name: &str, value: PyObjectRef, vm: &VirtualMachine) -> PyResult<()> {
    let slot = obj
        .class()
        .slots
        .read()
        .set_attr
        .expect("every type inherits object's set_attr slot");
    slot(obj, name, Some(value), vm)
}

pub fn delattr(obj: &PyObjectRef, name: &str, vm: &VirtualMachine) -> PyResult<()> {
    let slot = obj
        .class()
        .slots
        .read()
        .set_attr
        .expect("every type inherits object's set_attr slot");
    slot(obj, name, None, vm)
}

fn ensure_instance_dict(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult<PyRef<PyDict>> {
    if let Some(d) = obj.dict() {
        return Ok(d);
    }
    if !obj.class().flags.contains(crate::types::TypeFlags::HAS_DICT) {
        return Err(vm.new_attribute_error(format!(
            "'{}' object has no attribute '__dict__'",
            obj.class().name
        )));
    }
    let d = PyDict::new_ref(vm);
    obj.set_dict(Some(d.clone()));
    Ok(d)
}

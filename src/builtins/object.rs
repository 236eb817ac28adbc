//! C1 §4.1: the root type. Every type's MRO bottoms out here, which is
//! where the default attribute-access algorithm (§4.1, four steps) and
//! `dir()` (§11 supplemented feature) actually live — `object` itself
//! just wires them up as slots so every subclass inherits them per
//! invariant (i) in §3.

use crate::builtins::dict::PyDict;
use crate::builtins::str::PyStr;
use crate::function::FuncArgs;
use crate::impl_payload;
use crate::object::{PyObject, PyObjectRef};
use crate::protocol::attr::{generic_del_attribute, generic_set_attribute};
use crate::types::{PyTypeRef, TypeFlags};
use crate::vm::{PyResult, VirtualMachine};

/// The payload for a plain `object()` instance; carries no state beyond
/// the universal header (class, optional `__dict__`).
#[derive(Debug)]
pub struct PyBaseObject;

impl_payload!(PyBaseObject, "object");

pub fn object_new(cls: PyTypeRef, _args: FuncArgs, vm: &VirtualMachine) -> PyResult {
    let dict = if cls.flags.contains(TypeFlags::HAS_DICT) {
        Some(PyDict::new_ref(vm))
    } else {
        None
    };
    Ok(PyObject::new(PyBaseObject, cls.into_object(), dict))
}

/// The unified `set_attr` slot (§4.2's `SetAttrSlot`): `Some(value)` is
/// `setattr`, `None` is `delattr`, matching CPython's single `tp_setattro`
/// doing double duty.
pub fn object_set_attr(obj: &PyObjectRef, name: &str, value: Option<PyObjectRef>, vm: &VirtualMachine) -> PyResult<()> {
    match value {
        Some(v) => generic_set_attribute(obj, name, v, vm),
        None => generic_del_attribute(obj, name, vm),
    }
}

/// `dir(obj)`: the sorted union of every name reachable from `obj`'s
/// instance `__dict__` and every base's attribute dict in its MRO.
pub fn object_dir(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult<Vec<String>> {
    let mut names = std::collections::BTreeSet::new();
    for base in obj.class().mro() {
        for (k, _) in base.attributes.items(vm)? {
            if let Some(s) = k.downcast_ref::<PyStr>() {
                names.insert(s.as_str().to_owned());
            }
        }
    }
    if let Some(dict) = obj.dict() {
        for (k, _) in dict.items(vm)? {
            if let Some(s) = k.downcast_ref::<PyStr>() {
                names.insert(s.as_str().to_owned());
            }
        }
    }
    Ok(names.into_iter().collect())
}

#[cfg(test)]
mod tests {
    // Exercised end-to-end in tests/attr.rs against a bootstrapped VM,
    // since attribute lookup needs a ready MRO and a live dict type.
}

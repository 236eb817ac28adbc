//! C13 §4.13: the module object a dotted import resolves to. Carries no
//! state of its own beyond the universal per-instance `__dict__` every
//! attribute a module exposes lives there.
//!
//! Grounded in the teacher's `builtins/module.rs` `PyModule` (an empty
//! payload plus `HAS_DICT`) and its `SlotGetattro` override, which falls
//! back to a user-supplied `__getattr__` before raising the module-named
//! `AttributeError`.

use crate::builtins::dict::PyDict;
use crate::function::FuncArgs;
use crate::impl_payload;
use crate::object::{PyObject, PyObjectRef, PyRef};
use crate::protocol::attr::generic_get_attribute;
use crate::types::pytype::{isinstance, TypeOrTuple};
use crate::types::PyTypeRef;
use crate::vm::{PyResult, VirtualMachine};

#[derive(Debug)]
pub struct PyModule;

impl_payload!(PyModule, "module");

pub type PyModuleRef = PyRef<PyModule>;

/// Seeds the five dunder attributes CPython's module `__init__` sets,
/// so `repr(m)` and `from x import *` machinery find what they expect
/// even though this runtime doesn't implement either.
fn seed_dict(dict: &PyRef<PyDict>, name: PyObjectRef, doc: PyObjectRef, vm: &VirtualMachine) {
    dict.set_item_str("__name__", name, vm);
    dict.set_item_str("__doc__", doc, vm);
    dict.set_item_str("__package__", vm.none(), vm);
    dict.set_item_str("__loader__", vm.none(), vm);
}

/// Builds a fresh, empty module named `name` directly (§4.13's
/// "construct an empty module object"), bypassing the `module(...)`
/// constructor call protocol the import coordinator has no need for.
pub fn new_module(name: &str, vm: &VirtualMachine) -> PyModuleRef {
    let dict = PyDict::new_ref(vm);
    seed_dict(&dict, vm.new_str(name.to_owned()), vm.none(), vm);
    let obj = PyObject::new(PyModule, vm.ctx.types.module_type.clone().into_object(), Some(dict));
    PyRef::new_unchecked(obj)
}

pub fn module_new(cls: PyTypeRef, args: FuncArgs, vm: &VirtualMachine) -> PyResult {
    let mut positional = args.args.into_iter();
    let name = positional
        .next()
        .ok_or_else(|| vm.new_type_error("module() takes at least 1 argument (0 given)".to_owned()))?;
    let doc = positional.next().unwrap_or_else(|| vm.none());
    let dict = PyDict::new_ref(vm);
    seed_dict(&dict, name, doc, vm);
    Ok(PyObject::new(PyModule, cls.into_object(), Some(dict)))
}

/// `module.__getattribute__` (§4.1's default algorithm, then a
/// module-specific fallback to a user `__getattr__` before the richer
/// "module 'NAME' has no attribute 'X'" message).
pub fn module_get_attribute(obj: &PyObjectRef, name: &str, vm: &VirtualMachine) -> PyResult {
    match generic_get_attribute(obj, name, vm) {
        Ok(v) => Ok(v),
        Err(e) => {
            if let Some(dict) = obj.dict() {
                if let Some(getattr) = dict.get_item_str("__getattr__", vm) {
                    return vm.invoke(&getattr, vec![vm.new_str(name.to_owned())]);
                }
            }
            if isinstance(&e, &TypeOrTuple::Type(vm.ctx.exceptions.attribute_error_type.clone())) {
                let suffix = module_name(obj, vm).map(|n| format!(" '{}'", n)).unwrap_or_default();
                return Err(vm.new_attribute_error(format!("module{} has no attribute '{}'", suffix, name)));
            }
            Err(e)
        }
    }
}

fn module_name(obj: &PyObjectRef, vm: &VirtualMachine) -> Option<String> {
    let dict = obj.dict()?;
    let name_obj = dict.get_item_str("__name__", vm)?;
    vm.str_of(&name_obj).ok()
}

pub fn module_repr(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let name = module_name(obj, vm).unwrap_or_else(|| "?".to_owned());
    Ok(vm.new_str(format!("<module '{}'>", name)))
}

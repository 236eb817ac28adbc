//! §6 "Callable protocol" and the sibling `invoke` entry point.

use crate::function::FuncArgs;
use crate::object::PyObjectRef;
use crate::vm::{PyResult, VirtualMachine};

pub fn is_callable(obj: &PyObjectRef) -> bool {
    obj.class().slots.read().call.is_some()
}

pub fn call(obj: &PyObjectRef, args: FuncArgs, vm: &VirtualMachine) -> PyResult {
    let slot = obj.class().slots.read().call;
    match slot {
        Some(f) => f(obj, args, vm),
        None => Err(vm.new_type_error(format!("'{}' object is not callable", obj.class().name))),
    }
}

/// The `invoke` entry point of §6: accepts a pre-built positional
/// vector plus `*varargs` (any iterable, flattened) and `**kwargs`
/// (must be a dict, merged with duplicate-key detection).
pub fn invoke(
    obj: &PyObjectRef,
    mut positional: Vec<PyObjectRef>,
    mut keywords: indexmap::IndexMap<String, PyObjectRef>,
    varargs: Option<PyObjectRef>,
    kwargs: Option<PyObjectRef>,
    vm: &VirtualMachine,
) -> PyResult {
    if let Some(varargs) = varargs {
        let extra = vm.iterate_to_vec(&varargs)?;
        positional.extend(extra);
    }
    if let Some(kwargs) = kwargs {
        let dict = crate::builtins::dict::PyDict::from_object(&kwargs, vm)?;
        for (k, v) in dict.items(vm)? {
            let name = vm.str_of(&k)?;
            if keywords.contains_key(&name) {
                return Err(vm.new_type_error(format!(
                    "got multiple values for keyword argument '{}'",
                    name
                )));
            }
            keywords.insert(name, v);
        }
    }
    let args = FuncArgs::new(positional, keywords);
    call(obj, args, vm)
}

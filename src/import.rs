//! C13 §4.13: the `sys.modules` registry and the `import_module`
//! coordinator built on top of it.
//!
//! The actual source-finding and parsing loader is out of scope here;
//! a caller supplies one host closure ("handle") per dotted-name
//! segment, analogous to the `NativeBody`/`GeneratorBody` closures used
//! elsewhere for code this runtime doesn't compile or interpret itself.
//! Grounded in the teacher's `vm/src/import.rs` `import_module` for the
//! registry-and-circularity shape, adapted since that file's disk
//! search and bytecode execution have no counterpart here.

use std::sync::Arc;

use crate::builtins::module::{self, PyModuleRef};
use crate::object::PyObjectRef;
use crate::vm::{PyResult, VirtualMachine};

/// Populates a freshly-registered module's attributes. Receives the
/// module object `sys.modules` already holds the entry for, so a
/// handle that needs to reach back into its own partially-built module
/// during a circular import can do so through `vm.ctx.sys_modules`.
pub type ImportHandle = Arc<dyn Fn(&PyModuleRef, &VirtualMachine) -> PyResult<()> + Send + Sync>;

/// `import_module(name, handles)` (§4.13): `name` is a dotted path
/// (`"a.b.c"`) and `handles` supplies one handle per segment, in order.
/// Returns the chain of module objects, outermost first, each already
/// installed in `sys.modules` under its own dotted prefix.
pub fn import_module(name: &str, handles: &[ImportHandle], vm: &VirtualMachine) -> PyResult<Vec<PyModuleRef>> {
    let segments: Vec<&str> = name.split('.').collect();
    if segments.len() != handles.len() {
        return Err(vm.new_value_error(format!(
            "import_module: {} dotted segments but {} handles",
            segments.len(),
            handles.len()
        )));
    }

    let mut chain = Vec::with_capacity(segments.len());
    let mut prefix = String::new();
    for (segment, handle) in segments.iter().zip(handles.iter()) {
        if !prefix.is_empty() {
            prefix.push('.');
        }
        prefix.push_str(segment);

        let existing = vm.ctx.sys_modules.get_item_str(&prefix, vm).and_then(|obj| downcast_module(obj));
        let mod_ref = match existing {
            Some(m) => m,
            None => {
                let fresh = module::new_module(&prefix, vm);
                vm.ctx.sys_modules.set_item_str(&prefix, fresh.clone().into_object(), vm);
                handle(&fresh, vm)?;
                if vm.ctx.sys_modules.get_item_str(&prefix, vm).is_none() {
                    return Err(vm.new_import_error(format!(
                        "Loaded module {} not found in sys.modules",
                        prefix
                    )));
                }
                fresh
            }
        };
        chain.push(mod_ref);
    }
    Ok(chain)
}

fn downcast_module(obj: PyObjectRef) -> Option<PyModuleRef> {
    use crate::object::PyRef;
    PyRef::try_from_object(obj).ok()
}

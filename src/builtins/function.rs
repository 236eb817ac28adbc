//! C9 §4.9: "A function is a code object plus its captured globals;
//! callable via the standard call protocol."
//!
//! Grounded in the teacher's `builtins/function.rs` `PyFunction`
//! (code + scope), simplified to this crate's host-callable code-object
//! model: there's no bytecode frame to build locals for, so a function
//! just forwards to [`CodeObject::eval`].

use std::sync::Arc;

use crate::function::{CodeObject, FuncArgs};
use crate::impl_payload;
use crate::object::{PyObject, PyObjectRef, PyRef};
use crate::types::pytype::PyType;
use crate::vm::{PyResult, VirtualMachine};

pub type PyFunctionRef = PyRef<PyFunction>;

#[derive(Debug)]
pub struct PyFunction {
    pub code: Arc<CodeObject>,
    pub globals: PyObjectRef,
}

impl_payload!(PyFunction, "function");

impl PyFunction {
    pub fn new_ref(code: Arc<CodeObject>, globals: PyObjectRef, vm: &VirtualMachine) -> PyFunctionRef {
        let obj = PyObject::new(
            PyFunction { code, globals },
            vm.ctx.types.function_type.clone().into_object(),
            None,
        );
        PyRef::new_unchecked(obj)
    }

    pub fn name(&self) -> &str {
        &self.code.name
    }
}

pub fn function_call(obj: &PyObjectRef, args: FuncArgs, vm: &VirtualMachine) -> PyResult {
    let func = obj.downcast_ref::<PyFunction>().expect("function_call on non-function");
    func.code.eval(func.globals.clone(), args.args, args.kwargs, vm)
}

/// §4.11 non-data descriptor: a function accessed through an instance
/// becomes a bound method; accessed through the class, an unbound one
/// (Python 2's "unbound method" wrapper, §4.9's bound-method paragraph).
pub fn function_get(
    zelf: &PyObjectRef,
    obj: Option<PyObjectRef>,
    owner: Option<PyObjectRef>,
    vm: &VirtualMachine,
) -> PyResult {
    let owner_cls = match owner {
        Some(o) => PyRef::<PyType>::try_from_object(o)
            .unwrap_or_else(|o| o.class()),
        None => vm.ctx.types.object_type.clone(),
    };
    Ok(crate::builtins::method::PyMethod::new_ref(zelf.clone(), obj, owner_cls, vm).into_object())
}

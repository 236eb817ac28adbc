//! C9 §4.9: "A bound method stores (function, self, class) and, when
//! called, inserts self as the first positional argument and enforces
//! isinstance(self, class) when self is None (unbound form)."
//!
//! Grounded in the teacher's `builtins/function.rs` `PyBoundMethod`,
//! generalized to also cover Python 2's unbound-method form (`self_obj:
//! None`), which the teacher's Python-3-only model doesn't need.

use crate::function::FuncArgs;
use crate::impl_payload;
use crate::object::{PyObject, PyObjectRef, PyRef};
use crate::protocol::callable;
use crate::types::pytype::{isinstance, PyType, TypeOrTuple};
use crate::vm::{PyResult, VirtualMachine};

pub type PyMethodRef = PyRef<PyMethod>;

#[derive(Debug)]
pub struct PyMethod {
    pub func: PyObjectRef,
    pub self_obj: Option<PyObjectRef>,
    pub class: PyRef<PyType>,
}

impl_payload!(PyMethod, "instancemethod");

impl PyMethod {
    pub fn new_ref(
        func: PyObjectRef,
        self_obj: Option<PyObjectRef>,
        class: PyRef<PyType>,
        vm: &VirtualMachine,
    ) -> PyMethodRef {
        let obj = PyObject::new(
            PyMethod { func, self_obj, class },
            vm.ctx.types.method_type.clone().into_object(),
            None,
        );
        PyRef::new_unchecked(obj)
    }

    fn func_name(&self) -> String {
        self.func
            .downcast_ref::<crate::builtins::function::PyFunction>()
            .map(|f| f.name().to_owned())
            .unwrap_or_else(|| self.func.class().name.clone())
    }
}

pub fn method_call(obj: &PyObjectRef, mut args: FuncArgs, vm: &VirtualMachine) -> PyResult {
    let method = obj.downcast_ref::<PyMethod>().expect("method_call on non-method");
    match &method.self_obj {
        Some(self_obj) => args.prepend_arg(self_obj.clone()),
        None => {
            let first = args.args.first().cloned().ok_or_else(|| {
                vm.new_type_error(format!(
                    "unbound method {}() must be called with {} instance as first argument (got nothing instead)",
                    method.func_name(),
                    method.class.name,
                ))
            })?;
            if !isinstance(&first, &TypeOrTuple::Type(method.class.clone())) {
                return Err(vm.new_type_error(format!(
                    "unbound method {}() must be called with {} instance as first argument (got {} instance instead)",
                    method.func_name(),
                    method.class.name,
                    first.class().name,
                )));
            }
        }
    }
    callable::call(&method.func, args, vm)
}

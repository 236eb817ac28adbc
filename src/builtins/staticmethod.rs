//! C9 §4.9: "A static method forwards __get__ to its stored callable
//! unchanged."
//!
//! Grounded in the teacher's `builtins/staticmethod.rs`.

use crate::function::FuncArgs;
use crate::impl_payload;
use crate::object::{PyObject, PyObjectRef};
use crate::types::PyTypeRef;
use crate::vm::{PyResult, VirtualMachine};

#[derive(Debug)]
pub struct PyStaticMethod {
    pub callable: PyObjectRef,
}

impl_payload!(PyStaticMethod, "staticmethod");

pub fn staticmethod_new(cls: PyTypeRef, args: FuncArgs, vm: &VirtualMachine) -> PyResult {
    let callable = args
        .args
        .into_iter()
        .next()
        .ok_or_else(|| vm.new_type_error("staticmethod() takes exactly 1 argument (0 given)".to_owned()))?;
    Ok(PyObject::new(PyStaticMethod { callable }, cls.into_object(), None))
}

pub fn staticmethod_get(
    zelf: &PyObjectRef,
    _obj: Option<PyObjectRef>,
    _owner: Option<PyObjectRef>,
    _vm: &VirtualMachine,
) -> PyResult {
    let sm = zelf.downcast_ref::<PyStaticMethod>().expect("staticmethod_get on non-staticmethod");
    Ok(sm.callable.clone())
}

//! C9 §4.9: "A class method forwards __get__ by binding the owner (not
//! the instance) as first argument."
//!
//! Grounded in the teacher's `builtins/classmethod.rs`.

use crate::function::FuncArgs;
use crate::impl_payload;
use crate::object::{PyObject, PyObjectRef, PyRef};
use crate::types::pytype::PyType;
use crate::types::PyTypeRef;
use crate::vm::{PyResult, VirtualMachine};

#[derive(Debug)]
pub struct PyClassMethod {
    pub callable: PyObjectRef,
}

impl_payload!(PyClassMethod, "classmethod");

pub fn classmethod_new(cls: PyTypeRef, args: FuncArgs, vm: &VirtualMachine) -> PyResult {
    let callable = args
        .args
        .into_iter()
        .next()
        .ok_or_else(|| vm.new_type_error("classmethod() takes exactly 1 argument (0 given)".to_owned()))?;
    Ok(PyObject::new(PyClassMethod { callable }, cls.into_object(), None))
}

pub fn classmethod_get(
    zelf: &PyObjectRef,
    obj: Option<PyObjectRef>,
    owner: Option<PyObjectRef>,
    vm: &VirtualMachine,
) -> PyResult {
    let cm = zelf.downcast_ref::<PyClassMethod>().expect("classmethod_get on non-classmethod");
    let owner_obj = owner
        .or_else(|| obj.as_ref().map(|o| o.class().into_object()))
        .ok_or_else(|| vm.new_type_error("classmethod.__get__ needs an owner".to_owned()))?;
    let owner_cls = PyRef::<PyType>::try_from_object(owner_obj.clone()).unwrap_or_else(|o| o.class());
    Ok(crate::builtins::method::PyMethod::new_ref(cm.callable.clone(), Some(owner_obj), owner_cls, vm).into_object())
}

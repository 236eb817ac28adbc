//! §3 "Singletons": `None`, `NotImplemented`, `Ellipsis`, and the
//! internal `UnboundLocal` sentinel — process-wide unique instances of
//! non-instantiable types.

use crate::function::FuncArgs;
use crate::impl_payload;
use crate::object::{PyObject, PyObjectRef};
use crate::vm::{PyResult, VirtualMachine};

#[derive(Debug, Default)]
pub struct PyNone;
impl_payload!(PyNone, "NoneType");

#[derive(Debug, Default)]
pub struct PyNotImplemented;
impl_payload!(PyNotImplemented, "NotImplementedType");

#[derive(Debug, Default)]
pub struct PyEllipsis;
impl_payload!(PyEllipsis, "ellipsis");

/// Inserted into a frame's locals before argument binding runs, so that
/// reading a not-yet-assigned local raises `UnboundLocalError` instead
/// of silently returning something else (§3 "Singletons").
#[derive(Debug, Default)]
pub struct PyUnboundLocal;
impl_payload!(PyUnboundLocal, "UnboundLocalType");

pub fn none_repr(_obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    Ok(vm.new_str("None".to_owned()))
}

pub fn none_bool(_obj: &PyObjectRef, _vm: &VirtualMachine) -> PyResult<bool> {
    Ok(false)
}

pub fn not_implemented_repr(_obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    Ok(vm.new_str("NotImplemented".to_owned()))
}

pub fn ellipsis_repr(_obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    Ok(vm.new_str("Ellipsis".to_owned()))
}

pub fn singleton_new_disallowed(
    cls: crate::types::PyTypeRef,
    _args: FuncArgs,
    vm: &VirtualMachine,
) -> PyResult {
    Err(vm.new_type_error(format!("cannot create '{}' instances", cls.name)))
}

pub fn new_none(vm: &VirtualMachine) -> PyObjectRef {
    PyObject::new(PyNone, vm.ctx.types.none_type.clone().into_object(), None)
}

pub fn new_not_implemented(vm: &VirtualMachine) -> PyObjectRef {
    PyObject::new(PyNotImplemented, vm.ctx.types.not_implemented_type.clone().into_object(), None)
}

pub fn new_ellipsis(vm: &VirtualMachine) -> PyObjectRef {
    PyObject::new(PyEllipsis, vm.ctx.types.ellipsis_type.clone().into_object(), None)
}

pub fn new_unbound_local(vm: &VirtualMachine) -> PyObjectRef {
    PyObject::new(PyUnboundLocal, vm.ctx.types.unbound_local_type.clone().into_object(), None)
}

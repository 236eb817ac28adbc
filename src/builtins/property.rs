//! C9 §4.9: "A property stores three callables (fget, fset, fdel);
//! __get__ invokes fget(instance) (raising AttributeError("unreadable
//! attribute") if fget is absent); __set__ and __delete__ likewise."
//!
//! Grounded in the teacher's `builtins/property.rs`.

use parking_lot::RwLock;

use crate::function::FuncArgs;
use crate::impl_payload;
use crate::object::{PyObject, PyObjectRef};
use crate::types::PyTypeRef;
use crate::vm::{PyResult, VirtualMachine};

#[derive(Debug)]
pub struct PyProperty {
    getter: RwLock<Option<PyObjectRef>>,
    setter: RwLock<Option<PyObjectRef>>,
    deleter: RwLock<Option<PyObjectRef>>,
}

impl_payload!(PyProperty, "property");

pub fn property_new(cls: PyTypeRef, args: FuncArgs, vm: &VirtualMachine) -> PyResult {
    let mut positional = args.args.into_iter();
    let non_none = |v: Option<PyObjectRef>, vm: &VirtualMachine| v.filter(|o| !vm.is_none(o));
    let fget = non_none(positional.next(), vm);
    let fset = non_none(positional.next(), vm);
    let fdel = non_none(positional.next(), vm);
    Ok(PyObject::new(
        PyProperty {
            getter: RwLock::new(fget),
            setter: RwLock::new(fset),
            deleter: RwLock::new(fdel),
        },
        cls.into_object(),
        None,
    ))
}

pub fn property_get(
    zelf: &PyObjectRef,
    obj: Option<PyObjectRef>,
    _owner: Option<PyObjectRef>,
    vm: &VirtualMachine,
) -> PyResult {
    let prop = zelf.downcast_ref::<PyProperty>().expect("property_get on non-property");
    match obj {
        None => Ok(zelf.clone()),
        Some(obj) => match prop.getter.read().clone() {
            Some(getter) => vm.invoke(&getter, vec![obj]),
            None => Err(vm.new_attribute_error("unreadable attribute".to_owned())),
        },
    }
}

pub fn property_set(obj: &PyObjectRef, instance: PyObjectRef, value: PyObjectRef, vm: &VirtualMachine) -> PyResult<()> {
    let prop = obj.downcast_ref::<PyProperty>().expect("property_set on non-property");
    match prop.setter.read().clone() {
        Some(setter) => vm.invoke(&setter, vec![instance, value]).map(drop),
        None => Err(vm.new_attribute_error("can't set attribute".to_owned())),
    }
}

pub fn property_delete(obj: &PyObjectRef, instance: PyObjectRef, vm: &VirtualMachine) -> PyResult<()> {
    let prop = obj.downcast_ref::<PyProperty>().expect("property_delete on non-property");
    match prop.deleter.read().clone() {
        Some(deleter) => vm.invoke(&deleter, vec![instance]).map(drop),
        None => Err(vm.new_attribute_error("can't delete attribute".to_owned())),
    }
}

//! C10 §4.10 "Iterator protocol": `iter(o)` returns `o.__iter__()` if
//! defined, else wraps `o.__getitem__` in a sequence iterator that counts
//! upwards until `IndexError` is raised.
//!
//! Grounded in the teacher's `builtins/iter.rs` `PySequenceIterator`.

use std::sync::atomic::{AtomicIsize, Ordering};

use crate::impl_payload;
use crate::object::{PyObject, PyObjectRef, PyRef};
use crate::types::pytype::{isinstance, TypeOrTuple};
use crate::vm::{PyResult, VirtualMachine};

pub type PySeqIteratorRef = PyRef<PySeqIterator>;

#[derive(Debug)]
pub struct PySeqIterator {
    position: AtomicIsize,
    obj: PyObjectRef,
}

impl_payload!(PySeqIterator, "iterator");

impl PySeqIterator {
    pub fn new_ref(obj: PyObjectRef, vm: &VirtualMachine) -> PySeqIteratorRef {
        let payload = PySeqIterator { position: AtomicIsize::new(0), obj };
        let wrapped = PyObject::new(payload, vm.ctx.types.seq_iterator_type.clone().into_object(), None);
        PyRef::new_unchecked(wrapped)
    }
}

/// `iter(o)` (§4.10): prefer a real `__iter__`, fall back to wrapping
/// `__getitem__` in a counting sequence iterator.
pub fn iter(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let iter_slot = obj.class().slots.read().iter;
    if let Some(f) = iter_slot {
        return f(obj, vm);
    }
    if obj.class().slots.read().mapping.getitem.is_some() {
        return Ok(PySeqIterator::new_ref(obj.clone(), vm).into_object());
    }
    Err(vm.new_type_error(format!("'{}' object is not iterable", obj.class().name)))
}

pub fn seq_iterator_next(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let it = obj.downcast_ref::<PySeqIterator>().expect("seq_iterator_next on non-iterator");
    let getitem = it
        .obj
        .class()
        .slots
        .read()
        .mapping
        .getitem
        .expect("PySeqIterator always wraps a getitem-capable object");
    let pos = it.position.fetch_add(1, Ordering::SeqCst);
    let idx = vm.new_int(pos as i64);
    match getitem(&it.obj, &idx, vm) {
        Err(e) if isinstance(&e, &TypeOrTuple::Type(vm.ctx.exceptions.index_error_type.clone())) => {
            Err(vm.new_stop_iteration())
        }
        other => other,
    }
}

pub fn seq_iterator_iter(obj: &PyObjectRef, _vm: &VirtualMachine) -> PyResult {
    Ok(obj.clone())
}

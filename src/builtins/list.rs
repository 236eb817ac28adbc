//! C6 §4.6: the mutable ordered sequence.

use parking_lot::RwLock;

use crate::function::FuncArgs;
use crate::impl_payload;
use crate::object::{PyObject, PyObjectRef, PyRef};
use crate::protocol::comparison::{rich_compare, CompareOp};
use crate::protocol::sequence::normalize_index;
use crate::vm::{PyResult, VirtualMachine};

#[derive(Debug)]
pub struct PyList {
    elements: RwLock<Vec<PyObjectRef>>,
}

impl_payload!(PyList, "list");

pub type PyListRef = PyRef<PyList>;

impl PyList {
    pub fn new_ref(elements: Vec<PyObjectRef>, vm: &VirtualMachine) -> PyListRef {
        let obj = PyObject::new(
            PyList { elements: RwLock::new(elements) },
            vm.ctx.types.list_type.clone().into_object(),
            None,
        );
        PyRef::new_unchecked(obj)
    }

    pub fn len(&self) -> usize {
        self.elements.read().len()
    }

    pub fn to_vec(&self) -> Vec<PyObjectRef> {
        self.elements.read().clone()
    }

    pub fn get(&self, i: usize) -> Option<PyObjectRef> {
        self.elements.read().get(i).cloned()
    }

    pub fn set(&self, i: usize, value: PyObjectRef) {
        self.elements.write()[i] = value;
    }

    pub fn append(&self, value: PyObjectRef) {
        self.elements.write().push(value);
    }

    pub fn extend(&self, values: impl IntoIterator<Item = PyObjectRef>) {
        self.elements.write().extend(values);
    }

    pub fn pop(&self, i: usize) -> PyObjectRef {
        self.elements.write().remove(i)
    }

    /// Stable sort (§4.6): default comparator `Lt`, optional `key`,
    /// optional `reverse`. Sorting delegates comparisons through the
    /// usual rich-compare dispatch so user `__lt__` overrides apply.
    pub fn sort(
        &self,
        key: Option<PyObjectRef>,
        reverse: bool,
        vm: &VirtualMachine,
    ) -> PyResult<()> {
        let mut items = self.elements.read().clone();
        let mut decorated: Vec<(PyObjectRef, PyObjectRef)> = Vec::with_capacity(items.len());
        for item in items.drain(..) {
            let k = match &key {
                Some(f) => crate::protocol::callable::call(f, FuncArgs::new(vec![item.clone()], Default::default()), vm)?,
                None => item.clone(),
            };
            decorated.push((k, item));
        }
        // insertion sort: stable and lets `?` propagate from user `__lt__`
        // without needing a panicking comparator closure.
        for i in 1..decorated.len() {
            let mut j = i;
            while j > 0 {
                let lt = rich_compare(&decorated[j].0, &decorated[j - 1].0, CompareOp::Lt, vm)?;
                if vm.bool_truth(&lt)? {
                    decorated.swap(j, j - 1);
                    j -= 1;
                } else {
                    break;
                }
            }
        }
        let mut sorted: Vec<PyObjectRef> = decorated.into_iter().map(|(_, v)| v).collect();
        if reverse {
            sorted.reverse();
        }
        *self.elements.write() = sorted;
        Ok(())
    }
}

pub fn list_len(obj: &PyObjectRef, _vm: &VirtualMachine) -> PyResult<usize> {
    Ok(obj.downcast_ref::<PyList>().unwrap().len())
}

pub fn list_getitem(obj: &PyObjectRef, key: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let l = obj.downcast_ref::<PyList>().unwrap();
    let index = vm.to_index(key)?;
    let i = normalize_index(index, l.len() as isize, vm)?;
    Ok(l.get(i).unwrap())
}

pub fn list_setitem(obj: &PyObjectRef, key: &PyObjectRef, value: &PyObjectRef, vm: &VirtualMachine) -> PyResult<()> {
    let l = obj.downcast_ref::<PyList>().unwrap();
    let index = vm.to_index(key)?;
    let i = normalize_index(index, l.len() as isize, vm)?;
    l.set(i, value.clone());
    Ok(())
}

pub fn list_repr(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    if vm.frame_repr_enter(obj) {
        return Ok(vm.new_str("[...]".to_owned()));
    }
    let l = obj.downcast_ref::<PyList>().unwrap();
    let parts: PyResult<Vec<String>> = l.to_vec().iter().map(|e| vm.repr_of(e)).collect();
    vm.frame_repr_leave(obj);
    Ok(vm.new_str(format!("[{}]", parts?.join(", "))))
}

pub fn list_new(cls: crate::types::PyTypeRef, args: FuncArgs, vm: &VirtualMachine) -> PyResult {
    let elements = match args.args.first() {
        Some(iterable) => vm.iterate_to_vec(iterable)?,
        None => Vec::new(),
    };
    let obj = PyObject::new(PyList { elements: RwLock::new(elements) }, cls.into_object(), None);
    Ok(obj)
}

#[cfg(test)]
mod tests {
    // Sort stability and slice semantics are exercised in
    // tests/containers.rs against a bootstrapped VM.
}

//! C6: `set` and `frozenset`. Both share the dict's open-addressing
//! table mechanics (§4.6 "Set ... reuses the dict's table"), storing
//! members as keys mapped to themselves — there is no separate probe
//! sequence or growth policy to maintain here.

use crate::dictdatatype::Dict;
use crate::function::FuncArgs;
use crate::impl_payload;
use crate::object::{PyObject, PyObjectRef, PyRef};
use crate::protocol::number::hash_object;
use crate::types::PyTypeRef;
use crate::vm::{PyResult, VirtualMachine};

#[derive(Debug)]
pub struct PySet {
    inner: Dict,
}

impl_payload!(PySet, "set");

pub type PySetRef = PyRef<PySet>;

#[derive(Debug)]
pub struct PyFrozenSet {
    inner: Dict,
}

impl_payload!(PyFrozenSet, "frozenset");

pub type PyFrozenSetRef = PyRef<PyFrozenSet>;

impl PySet {
    pub fn new_ref(vm: &VirtualMachine) -> PySetRef {
        let obj = PyObject::new(PySet { inner: Dict::new() }, vm.ctx.types.set_type.clone().into_object(), None);
        PyRef::new_unchecked(obj)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn contains(&self, item: &PyObjectRef, vm: &VirtualMachine) -> PyResult<bool> {
        self.inner.contains(item, vm)
    }

    pub fn add(&self, item: PyObjectRef, vm: &VirtualMachine) -> PyResult<()> {
        self.inner.insert(item.clone(), item, vm)
    }

    pub fn discard(&self, item: &PyObjectRef, vm: &VirtualMachine) -> PyResult<bool> {
        Ok(self.inner.delete(item, vm)?.is_some())
    }

    pub fn elements(&self, vm: &VirtualMachine) -> Vec<PyObjectRef> {
        self.inner.items_snapshot(vm).into_iter().map(|(k, _)| k).collect()
    }
}

impl PyFrozenSet {
    pub fn new_ref(elements: Vec<PyObjectRef>, vm: &VirtualMachine) -> PyResult<PyFrozenSetRef> {
        let inner = Dict::new();
        for e in elements {
            inner.insert(e.clone(), e, vm)?;
        }
        let obj = PyObject::new(PyFrozenSet { inner }, vm.ctx.types.frozenset_type.clone().into_object(), None);
        Ok(PyRef::new_unchecked(obj))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn contains(&self, item: &PyObjectRef, vm: &VirtualMachine) -> PyResult<bool> {
        self.inner.contains(item, vm)
    }

    pub fn elements(&self, vm: &VirtualMachine) -> Vec<PyObjectRef> {
        self.inner.items_snapshot(vm).into_iter().map(|(k, _)| k).collect()
    }

    /// XOR-and-rotate fold so membership order never affects the hash
    /// (§4.6 "FrozenSet ... hashable, independent of element order").
    pub fn hash(&self, vm: &VirtualMachine) -> PyResult<i64> {
        let mut acc: u64 = 1_927_868_237;
        acc = acc.wrapping_mul((self.len() as u64).wrapping_add(1));
        for item in self.elements(vm) {
            let h = hash_object(&item, vm)? as u64;
            acc ^= (h ^ (h << 16) ^ 89_869_747).wrapping_mul(3_644_798_167);
        }
        acc = acc.wrapping_mul(69_069).wrapping_add(907_133_923);
        if acc as i64 == -1 {
            acc = acc.wrapping_add(2);
        }
        Ok(acc as i64)
    }
}

fn set_union(a: &[PyObjectRef], b: &[PyObjectRef], vm: &VirtualMachine) -> PyResult<Vec<PyObjectRef>> {
    let mut out = a.to_vec();
    for item in b {
        let mut present = false;
        for existing in &out {
            if crate::protocol::comparison::objects_equal(existing, item, vm)? {
                present = true;
                break;
            }
        }
        if !present {
            out.push(item.clone());
        }
    }
    Ok(out)
}

pub fn union(a: &PySet, b: &PySet, vm: &VirtualMachine) -> PyResult<PySetRef> {
    let merged = set_union(&a.elements(vm), &b.elements(vm), vm)?;
    let result = PySet::new_ref(vm);
    for item in merged {
        result.add(item, vm)?;
    }
    Ok(result)
}

pub fn intersection(a: &PySet, b: &PySet, vm: &VirtualMachine) -> PyResult<PySetRef> {
    let result = PySet::new_ref(vm);
    for item in a.elements(vm) {
        if b.contains(&item, vm)? {
            result.add(item, vm)?;
        }
    }
    Ok(result)
}

pub fn difference(a: &PySet, b: &PySet, vm: &VirtualMachine) -> PyResult<PySetRef> {
    let result = PySet::new_ref(vm);
    for item in a.elements(vm) {
        if !b.contains(&item, vm)? {
            result.add(item, vm)?;
        }
    }
    Ok(result)
}

pub fn symmetric_difference(a: &PySet, b: &PySet, vm: &VirtualMachine) -> PyResult<PySetRef> {
    let result = PySet::new_ref(vm);
    for item in a.elements(vm) {
        if !b.contains(&item, vm)? {
            result.add(item, vm)?;
        }
    }
    for item in b.elements(vm) {
        if !a.contains(&item, vm)? {
            result.add(item, vm)?;
        }
    }
    Ok(result)
}

pub fn is_subset(a: &PySet, b: &PySet, vm: &VirtualMachine) -> PyResult<bool> {
    for item in a.elements(vm) {
        if !b.contains(&item, vm)? {
            return Ok(false);
        }
    }
    Ok(true)
}

pub fn is_superset(a: &PySet, b: &PySet, vm: &VirtualMachine) -> PyResult<bool> {
    is_subset(b, a, vm)
}

pub fn set_len(obj: &PyObjectRef, _vm: &VirtualMachine) -> PyResult<usize> {
    Ok(obj.downcast_ref::<PySet>().unwrap().len())
}

pub fn set_contains(obj: &PyObjectRef, item: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    Ok(vm.new_bool(obj.downcast_ref::<PySet>().unwrap().contains(item, vm)?))
}

pub fn set_repr(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let s = obj.downcast_ref::<PySet>().unwrap();
    if s.len() == 0 {
        return Ok(vm.new_str("set([])".to_owned()));
    }
    let parts: PyResult<Vec<String>> = s.elements(vm).iter().map(|e| vm.repr_of(e)).collect();
    Ok(vm.new_str(format!("set([{}])", parts?.join(", "))))
}

pub fn frozenset_hash(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult<i64> {
    obj.downcast_ref::<PyFrozenSet>().unwrap().hash(vm)
}

pub fn set_new(cls: PyTypeRef, args: FuncArgs, vm: &VirtualMachine) -> PyResult {
    let obj = PyObject::new(PySet { inner: Dict::new() }, cls.into_object(), None);
    if let Some(iterable) = args.args.first() {
        let set = obj.downcast_ref::<PySet>().unwrap();
        for item in vm.iterate_to_vec(iterable)? {
            set.add(item, vm)?;
        }
    }
    Ok(obj)
}

pub fn frozenset_new(cls: PyTypeRef, args: FuncArgs, vm: &VirtualMachine) -> PyResult {
    let elements = match args.args.first() {
        Some(iterable) => vm.iterate_to_vec(iterable)?,
        None => Vec::new(),
    };
    let inner = Dict::new();
    for e in elements {
        inner.insert(e.clone(), e, vm)?;
    }
    Ok(PyObject::new(PyFrozenSet { inner }, cls.into_object(), None))
}

#[cfg(test)]
mod tests {
    // Set-algebra scenarios are exercised in tests/containers.rs
    // against a bootstrapped VM, since they need real hashing/equality
    // dispatch through the VM.
}

//! C6 §4.6: the immutable ordered sequence. Hashable by folding element
//! hashes with the CPython-style multiplier (§4.6 "Tuple ... supports
//! ... hashing").

use crate::function::FuncArgs;
use crate::impl_payload;
use crate::object::{PyObject, PyObjectRef, PyRef};
use crate::protocol::comparison::objects_equal;
use crate::protocol::number::hash_object;
use crate::protocol::sequence::normalize_index;
use crate::vm::{PyResult, VirtualMachine};

#[derive(Debug)]
pub struct PyTuple {
    elements: Vec<PyObjectRef>,
}

impl_payload!(PyTuple, "tuple");

pub type PyTupleRef = PyRef<PyTuple>;

/// CPython's xxHash-derived tuple-hash multiplier, retained here purely
/// as "a" stable mixing constant — compatibility with CPython's literal
/// tuple hash isn't a goal, just a well-distributed fold.
const MULT: u64 = 0x9E3779B185EBCA87;

impl PyTuple {
    pub fn elements(&self) -> &[PyObjectRef] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn new_ref(elements: Vec<PyObjectRef>, vm: &VirtualMachine) -> PyTupleRef {
        let obj = PyObject::new(PyTuple { elements }, vm.ctx.types.tuple_type.clone().into_object(), None);
        PyRef::new_unchecked(obj)
    }

    pub fn hash(&self, vm: &VirtualMachine) -> PyResult<i64> {
        let mut acc: u64 = 0x345678;
        let len = self.elements.len() as u64;
        for (i, e) in self.elements.iter().enumerate() {
            let h = hash_object(e, vm)? as u64;
            acc = (acc ^ h).wrapping_mul(MULT);
            acc = acc.wrapping_add(len - i as u64);
        }
        acc ^= 97_531;
        Ok(acc as i64)
    }

    pub fn eq(&self, other: &PyTuple, vm: &VirtualMachine) -> PyResult<bool> {
        if self.elements.len() != other.elements.len() {
            return Ok(false);
        }
        for (a, b) in self.elements.iter().zip(other.elements.iter()) {
            if !objects_equal(a, b, vm)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

pub fn tuple_len(obj: &PyObjectRef, _vm: &VirtualMachine) -> PyResult<usize> {
    Ok(obj.downcast_ref::<PyTuple>().unwrap().len())
}

pub fn tuple_getitem(obj: &PyObjectRef, key: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let t = obj.downcast_ref::<PyTuple>().unwrap();
    let index = vm.to_index(key)?;
    let i = normalize_index(index, t.len() as isize, vm)?;
    Ok(t.elements[i].clone())
}

pub fn tuple_hash(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult<i64> {
    obj.downcast_ref::<PyTuple>().unwrap().hash(vm)
}

pub fn tuple_eq(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    match other.downcast_ref::<PyTuple>() {
        Some(b) => {
            let a = obj.downcast_ref::<PyTuple>().unwrap();
            Ok(vm.new_bool(a.eq(b, vm)?))
        }
        None => Ok(vm.not_implemented()),
    }
}

pub fn tuple_repr(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let t = obj.downcast_ref::<PyTuple>().unwrap();
    let parts: Vec<String> = t
        .elements
        .iter()
        .map(|e| vm.repr_of(e))
        .collect::<PyResult<_>>()?;
    let body = if parts.len() == 1 {
        format!("{},", parts[0])
    } else {
        parts.join(", ")
    };
    Ok(vm.new_str(format!("({})", body)))
}

pub fn tuple_new(cls: crate::types::PyTypeRef, args: FuncArgs, vm: &VirtualMachine) -> PyResult {
    let elements = match args.args.first() {
        Some(iterable) => vm.iterate_to_vec(iterable)?,
        None => Vec::new(),
    };
    let obj = PyObject::new(PyTuple { elements }, cls.into_object(), None);
    Ok(obj)
}

#[cfg(test)]
mod tests {
    // Hash-contract/equality (invariant 6, §8) is exercised in
    // tests/numeric_tower.rs against a bootstrapped VM.
}

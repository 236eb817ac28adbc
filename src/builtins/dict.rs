//! The `dict` builtin type: a thin Python-facing wrapper around the
//! concurrent table of [`crate::dictdatatype::Dict`] (C5).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::dictdatatype::{Dict, Table};
use crate::function::FuncArgs;
use crate::impl_payload;
use crate::object::{PyObject, PyObjectPayload, PyObjectRef, PyRef};
use crate::vm::{PyResult, VirtualMachine};

#[derive(Debug)]
pub struct PyDict {
    inner: Dict,
}

impl std::fmt::Debug for Dict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Dict(len={})", self.len())
    }
}

impl_payload!(PyDict, "dict");

pub type PyDictRef = PyRef<PyDict>;

impl PyDict {
    pub fn new() -> Self {
        PyDict { inner: Dict::new() }
    }

    pub fn new_ref(vm: &VirtualMachine) -> PyDictRef {
        let obj = PyObject::new(PyDict::new(), vm.ctx.types.dict_type.as_object().clone(), None);
        PyRef::new_unchecked(obj)
    }

    /// Builds a dict classed under `dict_type` directly, for use before
    /// `VirtualMachine`/`Context` exist yet — every builtin type's
    /// `attributes` dict is created this way during bootstrap, when
    /// `dict_type` itself may not be fully ready but is always at least
    /// allocated.
    pub fn new_bootstrap_dict(dict_type: &PyRef<crate::types::pytype::PyType>) -> PyRef<PyDict> {
        let obj = PyObject::new(PyDict::new(), dict_type.clone().into_object(), None);
        PyRef::new_unchecked(obj)
    }

    /// Builds a dict with no class at all, for the three attribute dicts
    /// created before `dict_type` itself exists (`object`'s, `type`'s,
    /// and `dict`'s own attributes). `vm::Context::new` patches each one
    /// to `dict_type` immediately once it's built.
    pub fn new_bootstrap_ref() -> PyRef<PyDict> {
        PyRef::new_unchecked(PyObject::new_bootstrap_root(PyDict::new()))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn get_item(&self, key: &PyObjectRef, vm: &VirtualMachine) -> PyResult<Option<PyObjectRef>> {
        self.inner.get(key, vm)
    }

    pub fn set_item(&self, key: PyObjectRef, value: PyObjectRef, vm: &VirtualMachine) -> PyResult<()> {
        self.inner.insert(key, value, vm)?;
        Ok(())
    }

    pub fn del_item(&self, key: &PyObjectRef, vm: &VirtualMachine) -> PyResult<bool> {
        Ok(self.inner.delete(key, vm)?.is_some())
    }

    pub fn contains(&self, key: &PyObjectRef, vm: &VirtualMachine) -> PyResult<bool> {
        self.inner.contains(key, vm)
    }

    pub fn setdefault(
        &self,
        key: PyObjectRef,
        default: impl FnOnce() -> PyObjectRef,
        vm: &VirtualMachine,
    ) -> PyResult<PyObjectRef> {
        self.inner.setdefault(key, default, vm)
    }

    /// Convenience used pervasively for `__dict__`-style attribute maps
    /// (type dicts, module namespaces): looks up a plain Rust `&str` via
    /// the interned-string table instead of requiring the caller to
    /// build a `PyStr` object first.
    pub fn get_item_str(&self, name: &str, vm: &VirtualMachine) -> Option<PyObjectRef> {
        let key = vm.ctx.intern_str(name);
        self.inner.get(&key, vm).expect("str keys are always hashable")
    }

    pub fn set_item_str(&self, name: &str, value: PyObjectRef, vm: &VirtualMachine) {
        let key = vm.ctx.intern_str(name);
        self.inner.insert(key, value, vm).expect("str keys are always hashable");
    }

    pub fn del_item_str(&self, name: &str, vm: &VirtualMachine) -> bool {
        let key = vm.ctx.intern_str(name);
        self.inner.delete(&key, vm).expect("str keys are always hashable").is_some()
    }

    pub fn items(&self, vm: &VirtualMachine) -> PyResult<Vec<(PyObjectRef, PyObjectRef)>> {
        Ok(self.inner.items_snapshot(vm))
    }

    pub fn eq(a: &PyDict, b: &PyDict, vm: &VirtualMachine) -> PyResult<bool> {
        Dict::dict_eq(&a.inner, &b.inner, vm)
    }

    pub fn iter(self_ref: &PyDictRef, vm: &VirtualMachine) -> PyDictIterator {
        PyDictIterator {
            dict: self_ref.clone(),
            table: self_ref.inner.snapshot_table(vm),
            index: AtomicUsize::new(0),
            version: self_ref.inner.version(),
        }
    }

    pub fn from_object(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult<PyDictRef> {
        PyRef::try_from_object(obj.clone())
            .map_err(|o| vm.new_type_error(format!("expected dict, got '{}'", o.class().name)))
    }
}

/// §4.5 "Iteration": snapshot the table and the version at creation;
/// `next()` re-checks the version before walking further, even past
/// exhaustion (§9's documented CPython divergence).
pub struct PyDictIterator {
    dict: PyDictRef,
    table: Arc<Table>,
    index: AtomicUsize,
    version: i64,
}

impl_payload!(PyDictIterator, "dictionary-keyiterator");

impl std::fmt::Debug for PyDictIterator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<dict_iterator>")
    }
}

impl PyDictIterator {
    pub fn next(&self, vm: &VirtualMachine) -> PyResult<Option<(PyObjectRef, PyObjectRef)>> {
        if self.dict.inner.version() != self.version {
            return Err(vm.new_runtime_error("dictionary changed during iteration".to_owned()));
        }
        loop {
            let i = self.index.fetch_add(1, Ordering::AcqRel);
            if i >= self.table.entries.len() {
                return Ok(None);
            }
            if let Some((k, v)) = self.table.entries[i].live() {
                return Ok(Some((k.clone(), v.clone())));
            }
        }
    }
}

// --- slot implementations -------------------------------------------------

pub fn dict_len(obj: &PyObjectRef, _vm: &VirtualMachine) -> PyResult<usize> {
    Ok(obj.downcast_ref::<PyDict>().unwrap().len())
}

pub fn dict_getitem(obj: &PyObjectRef, key: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let d = obj.downcast_ref::<PyDict>().unwrap();
    d.get_item(key, vm)?
        .ok_or_else(|| vm.new_key_error(key.clone()))
}

pub fn dict_setitem(obj: &PyObjectRef, key: &PyObjectRef, value: &PyObjectRef, vm: &VirtualMachine) -> PyResult<()> {
    let d = obj.downcast_ref::<PyDict>().unwrap();
    d.set_item(key.clone(), value.clone(), vm)
}

pub fn dict_contains(obj: &PyObjectRef, item: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let d = obj.downcast_ref::<PyDict>().unwrap();
    Ok(vm.new_bool(d.contains(item, vm)?))
}

pub fn dict_eq_slot(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    match other.downcast_ref::<PyDict>() {
        Some(b) => {
            let a = obj.downcast_ref::<PyDict>().unwrap();
            Ok(vm.new_bool(PyDict::eq(a, b, vm)?))
        }
        None => Ok(vm.not_implemented()),
    }
}

pub fn dict_new(cls: crate::types::PyTypeRef, _args: FuncArgs, _vm: &VirtualMachine) -> PyResult {
    let obj = PyObject::new(PyDict::new(), cls.into_object(), None);
    Ok(obj)
}

#[cfg(test)]
mod tests {
    // Concurrency scenario S2 and the grow scenario S1 (§8) are
    // exercised in tests/dict_concurrency.rs against a live VM.
}

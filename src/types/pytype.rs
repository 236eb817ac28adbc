//! C1: the type object. Carries name, bases, MRO, attribute dict, slot
//! table, basis name and instantiability flags (§3 "Type").
//!
//! Grounded in `builtins/type.rs` of the teacher for the overall shape,
//! and `types/slot.rs` there for slot inheritance. MRO linearisation
//! follows the classic C3 algorithm (the same algorithm CPython and the
//! teacher use), referenced by the spec itself as "C3-style monotonic
//! linearisation" in §3.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use crate::impl_payload;
use crate::object::{PyObject, PyObjectPayload, PyObjectRef, PyRef};
use crate::builtins::dict::PyDict;
use crate::types::slot::PyTypeSlots;
use crate::vm::{PyResult, VirtualMachine};

pub type PyTypeRef = PyRef<PyType>;

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default)]
    pub struct TypeFlags: u32 {
        /// `flags.instantiable` of §3: false for `NoneType`, `bool`,
        /// `NotImplementedType`, etc.
        const INSTANTIABLE = 1 << 0;
        /// `flags.acceptable_as_base` of §3.
        const ACCEPTABLE_AS_BASE = 1 << 1;
        /// Instances of this type (and its instantiable subclasses) get a
        /// lazily-created per-instance `__dict__`.
        const HAS_DICT = 1 << 2;
    }
}

pub struct PyType {
    pub name: String,
    pub bases: Vec<PyTypeRef>,
    /// Populated once during readiness; empty beforehand.
    pub mro: RwLock<Vec<PyTypeRef>>,
    pub attributes: PyRef<PyDict>,
    pub slots: RwLock<PyTypeSlots>,
    pub basis: &'static str,
    pub flags: TypeFlags,
    ready: AtomicBool,
}

impl_payload!(PyType, "type");

impl std::fmt::Debug for PyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<type '{}'>", self.name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MroError {
    #[error("Cannot create a consistent method resolution order (MRO) for bases {0:?}")]
    Inconsistent(Vec<String>),
}

impl PyType {
    pub fn new_unready(
        name: String,
        bases: Vec<PyTypeRef>,
        attributes: PyRef<PyDict>,
        basis: &'static str,
        flags: TypeFlags,
    ) -> Self {
        PyType {
            name,
            bases,
            mro: RwLock::new(Vec::new()),
            attributes,
            slots: RwLock::new(PyTypeSlots::default()),
            basis,
            flags,
            ready: AtomicBool::new(false),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Phase 2 of the lifecycle in §3: linearise MRO, then inherit slots
    /// from the first base in MRO that defines each one (invariant (i)).
    pub fn make_ready(self_ref: &PyTypeRef) -> Result<(), MroError> {
        if self_ref.is_ready() {
            return Ok(());
        }
        let mro = linearize(self_ref)?;
        {
            let mut slots = self_ref.slots.write();
            // mro[0] is self_ref; inherit starting from mro[1..].
            for base in mro.iter().skip(1) {
                let base_slots = base.slots.read();
                slots.inherit_from(&base_slots);
            }
        }
        *self_ref.mro.write() = mro;
        self_ref.ready.store(true, Ordering::Release);
        log::trace!("type '{}' ready", self_ref.name);
        Ok(())
    }

    pub fn mro(&self) -> Vec<PyTypeRef> {
        self.mro.read().clone()
    }

    /// `issubclass(self, other)`: "the transitive closure of 'appears in
    /// MRO'" (§3 invariant (v)).
    pub fn is_subtype(&self, other: &PyType) -> bool {
        self.mro.read().iter().any(|t| std::ptr::eq(t.payload(), other))
    }

    pub fn full_name(&self) -> &str {
        &self.name
    }
}

/// C3 linearisation (Barrett et al.), the standard multiple-inheritance
/// MRO algorithm: `L[C] = C + merge(L[B1], ..., L[Bn], [B1, ..., Bn])`.
fn linearize(ty: &PyTypeRef) -> Result<Vec<PyTypeRef>, MroError> {
    if ty.bases.is_empty() {
        return Ok(vec![ty.clone()]);
    }
    let mut sequences: Vec<Vec<PyTypeRef>> = ty
        .bases
        .iter()
        .map(|b| {
            if !b.is_ready() {
                PyType::make_ready(b)?;
            }
            Ok(b.mro())
        })
        .collect::<Result<_, MroError>>()?;
    sequences.push(ty.bases.clone());

    let mut result = vec![ty.clone()];
    loop {
        sequences.retain(|s| !s.is_empty());
        if sequences.is_empty() {
            break;
        }
        let mut candidate = None;
        'outer: for seq in &sequences {
            let head = &seq[0];
            for seq2 in &sequences {
                if seq2[1..].iter().any(|t| t.get_id() == head.get_id()) {
                    continue 'outer;
                }
            }
            candidate = Some(head.clone());
            break;
        }
        let candidate = candidate.ok_or_else(|| {
            MroError::Inconsistent(ty.bases.iter().map(|b| b.name.clone()).collect())
        })?;
        result.push(candidate.clone());
        for seq in sequences.iter_mut() {
            if seq[0].get_id() == candidate.get_id() {
                seq.remove(0);
            }
        }
    }
    Ok(result)
}

/// `isinstance`/`issubclass` accept either a single type or a tuple of
/// types (§4.1).
pub enum TypeOrTuple {
    Type(PyTypeRef),
    Tuple(Vec<PyTypeRef>),
}

pub fn isinstance(obj: &PyObjectRef, target: &TypeOrTuple) -> bool {
    let obj_type = obj.class();
    match target {
        TypeOrTuple::Type(t) => obj_type.is_subtype(t),
        TypeOrTuple::Tuple(ts) => ts.iter().any(|t| obj_type.is_subtype(t)),
    }
}

pub fn issubclass(sub: &PyTypeRef, target: &TypeOrTuple) -> bool {
    match target {
        TypeOrTuple::Type(t) => sub.is_subtype(t),
        TypeOrTuple::Tuple(ts) => ts.iter().any(|t| sub.is_subtype(t)),
    }
}

/// `TypeType.__call__(T, *a, **kw)` (§4.1 "Instance construction").
pub fn call_type(
    cls: PyTypeRef,
    args: crate::function::FuncArgs,
    vm: &VirtualMachine,
) -> PyResult {
    let new = cls
        .slots
        .read()
        .new
        .ok_or_else(|| vm.new_type_error(format!("cannot create '{}' instances", cls.name)))?;
    let result = new(cls.clone(), args.clone(), vm)?;
    if isinstance(&result, &TypeOrTuple::Type(cls.clone())) {
        let init = result.class().slots.read().init;
        if let Some(init) = init {
            init(&result, args, vm)?;
        }
    }
    Ok(result)
}

pub fn as_pyobject(t: &PyTypeRef) -> &PyObjectRef {
    t.as_object()
}

/// The `call` slot `type` itself carries, so that `T(...)` for any type
/// object `T` goes through the ordinary callable protocol (§4.2) instead
/// of every caller needing to special-case "the thing being called is a
/// type".
pub fn type_call(obj: &PyObjectRef, args: crate::function::FuncArgs, vm: &VirtualMachine) -> PyResult {
    let cls = PyRef::<PyType>::new_unchecked(obj.clone());
    call_type(cls, args, vm)
}

#[allow(dead_code)]
fn _assert_payload(_: &PyObject) {}

#[cfg(test)]
mod tests {
    // MRO correctness (S5 from spec §8) is exercised in
    // tests/mro.rs against a fully bootstrapped VM, since linearisation
    // needs ready base types to walk.
}

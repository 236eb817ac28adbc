//! The universal object header (§3 "Object header") and the reference
//! types built on top of it.
//!
//! Grounded in `object/core.rs` of the teacher, simplified: the teacher
//! packs `typ`/`dict`/`payload` behind a hand-written vtable to keep
//! `PyObjectRef` one pointer wide. We keep the three fields explicit and
//! erase the payload with `Box<dyn PyObjectPayload>` instead, since this
//! crate leans on the host's allocator/refcounting rather than managing
//! its own layout (see SPEC_FULL.md §1 non-goals).

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::RwLock;

use super::payload::PyObjectPayload;
use crate::builtins::dict::PyDict;
use crate::types::pytype::PyType;

/// The object header plus its type-erased payload. Every Python value is
/// a `PyObjectRef` pointing at one of these.
///
/// `typ` is an `Option` rather than a bare `PyObjectRef` for one reason
/// only: bootstrapping `object`/`type` (each is an instance of the
/// other) needs a moment where a header exists but its type doesn't yet.
/// [`PyObject::new`] always supplies `Some`; [`PyObject::new_bootstrap_root`]
/// is the sole way to get `None`, and only `vm::Context`'s bootstrap
/// patches it back to `Some` before any other code can observe it.
pub struct PyObject {
    pub(crate) typ: RwLock<Option<PyObjectRef>>,
    pub(crate) dict: RwLock<Option<PyRef<PyDict>>>,
    pub(crate) payload: Box<dyn PyObjectPayload>,
}

/// Reference-counted, shared handle to a [`PyObject`]. Identity (`id()`)
/// is the pointer value of the `Arc`'s backing allocation.
pub type PyObjectRef = Arc<PyObject>;

impl PyObject {
    pub fn new<T: PyObjectPayload + 'static>(
        payload: T,
        typ: PyObjectRef,
        dict: Option<PyRef<PyDict>>,
    ) -> PyObjectRef {
        Arc::new(PyObject {
            typ: RwLock::new(Some(typ)),
            dict: RwLock::new(dict),
            payload: Box::new(payload),
        })
    }

    /// Metaclass-bootstrap-only: a header with no type yet. Used exactly
    /// twice, for `object` and `type` themselves, by `vm::Context::new`.
    pub fn new_bootstrap_root<T: PyObjectPayload + 'static>(payload: T) -> PyObjectRef {
        Arc::new(PyObject {
            typ: RwLock::new(None),
            dict: RwLock::new(None),
            payload: Box::new(payload),
        })
    }

    /// `id(o)`: the pointer identity of the header (§3).
    pub fn get_id(&self) -> usize {
        self as *const PyObject as usize
    }

    pub fn class(&self) -> PyRef<PyType> {
        PyRef::new_unchecked(
            self.typ
                .read()
                .clone()
                .expect("object header has no type (bootstrap not finished)"),
        )
    }

    pub fn set_class(&self, typ: PyRef<PyType>) {
        *self.typ.write() = Some(typ.into_object());
    }

    pub fn dict(&self) -> Option<PyRef<PyDict>> {
        self.dict.read().clone()
    }

    pub fn set_dict(&self, dict: Option<PyRef<PyDict>>) {
        *self.dict.write() = dict;
    }

    pub fn payload(&self) -> &dyn PyObjectPayload {
        &*self.payload
    }

    pub fn payload_is<T: PyObjectPayload + 'static>(&self) -> bool {
        self.payload.is::<T>()
    }

    pub fn downcast_ref<T: PyObjectPayload + 'static>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    /// Same-identity equality used wherever the spec calls for pointer
    /// identity rather than `__eq__` (e.g. the default `object.__eq__`,
    /// dict tombstone/key-sentinel comparisons).
    pub fn is(&self, other: &PyObject) -> bool {
        std::ptr::eq(self, other)
    }
}

impl fmt::Debug for PyObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<py {} @ {:#x}>", self.payload.payload_type_name(), self.get_id())
    }
}

/// A typed, checked-on-construction handle to a [`PyObject`] known to
/// carry payload `T`. Mirrors the teacher's `PyRef<T>`.
pub struct PyRef<T: PyObjectPayload + 'static> {
    obj: PyObjectRef,
    _marker: PhantomData<T>,
}

impl<T: PyObjectPayload + 'static> PyRef<T> {
    /// Build a `PyRef<T>` from an object already known (by construction,
    /// not by runtime check) to carry payload `T`. Debug builds assert
    /// the invariant; release builds trust the caller, exactly as the
    /// teacher's `PyRef::new_ref` trusts its callers.
    pub fn new_unchecked(obj: PyObjectRef) -> Self {
        debug_assert!(
            obj.payload_is::<T>(),
            "PyRef::new_unchecked: payload mismatch, expected {}",
            std::any::type_name::<T>()
        );
        PyRef { obj, _marker: PhantomData }
    }

    /// Fallible downcast used at runtime boundaries (native bridge,
    /// argument binding) where the payload isn't known in advance.
    pub fn try_from_object(obj: PyObjectRef) -> Result<Self, PyObjectRef> {
        if obj.payload_is::<T>() {
            Ok(PyRef { obj, _marker: PhantomData })
        } else {
            Err(obj)
        }
    }

    pub fn payload(&self) -> &T {
        self.obj
            .payload
            .downcast_ref::<T>()
            .expect("PyRef invariant violated")
    }

    pub fn as_object(&self) -> &PyObjectRef {
        &self.obj
    }

    pub fn into_object(self) -> PyObjectRef {
        self.obj
    }

    pub fn get_id(&self) -> usize {
        self.obj.get_id()
    }
}

impl<T: PyObjectPayload + 'static> Clone for PyRef<T> {
    fn clone(&self) -> Self {
        PyRef { obj: self.obj.clone(), _marker: PhantomData }
    }
}

impl<T: PyObjectPayload + 'static> std::ops::Deref for PyRef<T> {
    type Target = T;
    fn deref(&self) -> &T {
        self.payload()
    }
}

impl<T: PyObjectPayload + 'static> fmt::Debug for PyRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.obj, f)
    }
}

impl<T: PyObjectPayload + 'static> From<PyRef<T>> for PyObjectRef {
    fn from(r: PyRef<T>) -> Self {
        r.obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impl_payload;

    #[derive(Debug)]
    struct Dummy(i32);
    impl_payload!(Dummy, "dummy");

    #[test]
    fn id_is_stable_pointer_identity() {
        // Can't build a full type object here without the bootstrap;
        // identity math is exercised against raw allocations instead.
        let a = Box::new(Dummy(1));
        let b = Box::new(Dummy(1));
        assert_ne!(&*a as *const Dummy as usize, &*b as *const Dummy as usize);
    }
}

//! The `PyObjectPayload` trait: every concrete Python value (the host-side
//! "basis" of §3) implements it so it can live behind a type-erased
//! [`PyObjectRef`](super::PyObjectRef) and be recovered by downcast.

use std::any::Any;
use std::fmt;

/// A basis type: the host-language payload underlying a Python object.
///
/// Mirrors the teacher's `object::payload::PyPayload`, minus the manual
/// vtable erasure it uses for a single-pointer-width representation —
/// that optimization chases a GC/refcount budget this crate doesn't
/// have to manage itself (§1 non-goal: "garbage collection beyond what
/// the host language provides"), so plain `dyn Any` downcasting is used
/// instead.
pub trait PyObjectPayload: Any + fmt::Debug + Send + Sync {
    /// Name used in default reprs and error messages when no type object
    /// has been attached yet (bootstrap only; normally the type's own
    /// `name` is used).
    fn payload_type_name(&self) -> &'static str;
}

impl dyn PyObjectPayload {
    pub fn downcast_ref<T: PyObjectPayload + 'static>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref::<T>()
    }

    pub fn is<T: PyObjectPayload + 'static>(&self) -> bool {
        (self as &dyn Any).is::<T>()
    }
}

/// Implements [`PyObjectPayload`] for a concrete basis struct with a
/// literal type name, the way nearly every `builtins::*` module in this
/// crate declares its payload.
#[macro_export]
macro_rules! impl_payload {
    ($ty:ty, $name:literal) => {
        impl $crate::object::PyObjectPayload for $ty {
            fn payload_type_name(&self) -> &'static str {
                $name
            }
        }
    };
}

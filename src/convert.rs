//! C12 §4.12: the native host-value bridge between Rust values and
//! Python objects.
//!
//! Grounded in the teacher's `convert` module (`ToPyObject`/`TryFromObject`,
//! split one type per file), adapted to this crate's `PyRef`/
//! `PyObjectPayload` model instead of the teacher's `Py<T>`/`PyPayload`/
//! `AsObject`. The spec's host-language vocabulary (`chan`, `map`,
//! `slice`, `rune array`) names a different host language than this
//! one; here "host value" means a native Rust value, and its
//! nil-to-`None` / pointer-reinterpretation rules translate to
//! `Option::None` mapping to `None` and `PyObjectRef`/`PyRef<T>` passing
//! through unchanged rather than being copied.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use num_bigint::BigInt;

use crate::builtins::function::PyFunction;
use crate::builtins::long::PyLong;
use crate::function::{BoundArguments, CodeObject, NativeBody, Param};
use crate::impl_payload;
use crate::object::{PyObject, PyObjectPayload, PyObjectRef, PyRef};
use crate::types::pytype::{isinstance, TypeOrTuple};
use crate::vm::{PyResult, VirtualMachine};

/// §4.12 "map to the closest numeric class" / pointer-reinterpretation
/// / nil rules, from the Rust side: implemented by every native value
/// this runtime knows how to hand back to Python code without the
/// caller building the `PyObjectRef` by hand.
pub trait ToPyObject {
    fn to_pyobject(self, vm: &VirtualMachine) -> PyObjectRef;
}

impl ToPyObject for PyObjectRef {
    fn to_pyobject(self, _vm: &VirtualMachine) -> PyObjectRef {
        self
    }
}

/// "Pointers to basis types are reinterpreted as the existing Python
/// object (no copy)": a `PyRef<T>` the host already holds unwraps to
/// its backing `PyObjectRef` directly.
impl<T: PyObjectPayload> ToPyObject for PyRef<T> {
    fn to_pyobject(self, _vm: &VirtualMachine) -> PyObjectRef {
        self.into_object()
    }
}

impl ToPyObject for bool {
    fn to_pyobject(self, vm: &VirtualMachine) -> PyObjectRef {
        vm.new_bool(self)
    }
}

macro_rules! impl_to_pyobject_int {
    ($($t:ty),*) => {
        $(impl ToPyObject for $t {
            fn to_pyobject(self, vm: &VirtualMachine) -> PyObjectRef {
                match i64::try_from(self) {
                    Ok(v) => vm.new_int(v),
                    Err(_) => PyLong::new_obj(BigInt::from(self), vm),
                }
            }
        })*
    };
}
impl_to_pyobject_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, u128, i128);

impl ToPyObject for f32 {
    fn to_pyobject(self, vm: &VirtualMachine) -> PyObjectRef {
        vm.new_float(self as f64)
    }
}

impl ToPyObject for f64 {
    fn to_pyobject(self, vm: &VirtualMachine) -> PyObjectRef {
        vm.new_float(self)
    }
}

impl ToPyObject for String {
    fn to_pyobject(self, vm: &VirtualMachine) -> PyObjectRef {
        vm.new_str(self)
    }
}

impl ToPyObject for &str {
    fn to_pyobject(self, vm: &VirtualMachine) -> PyObjectRef {
        vm.new_str(self.to_owned())
    }
}

/// A host "rune array" (§4.12): a sequence of Unicode codepoints,
/// distinct from a byte `str`, maps to `unicode`.
pub struct Unicode(pub String);

impl ToPyObject for Unicode {
    fn to_pyobject(self, vm: &VirtualMachine) -> PyObjectRef {
        vm.new_unicode(self.0)
    }
}

impl<T: ToPyObject> ToPyObject for Option<T> {
    fn to_pyobject(self, vm: &VirtualMachine) -> PyObjectRef {
        match self {
            Some(v) => v.to_pyobject(vm),
            None => vm.none(),
        }
    }
}

impl<T: ToPyObject> ToPyObject for Vec<T> {
    fn to_pyobject(self, vm: &VirtualMachine) -> PyObjectRef {
        vm.new_list(self.into_iter().map(|v| v.to_pyobject(vm)).collect())
    }
}

/// §4.12 "Unknown compound types become opaque native objects; the
/// reverse conversion unwraps them." Wrap any host value the bridge
/// has no dedicated mapping for in `Native(..)` to cross into Python as
/// an opaque object carrying nothing Python code can introspect.
pub struct Native<T>(pub T);

pub struct PyNativeValue {
    type_name: &'static str,
    value: Box<dyn Any + Send + Sync>,
}

impl fmt::Debug for PyNativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native value '{}'>", self.type_name)
    }
}

impl_payload!(PyNativeValue, "nativevalue");

impl<T: Any + Send + Sync + 'static> ToPyObject for Native<T> {
    fn to_pyobject(self, vm: &VirtualMachine) -> PyObjectRef {
        let payload = PyNativeValue { type_name: std::any::type_name::<T>(), value: Box::new(self.0) };
        PyObject::new(payload, vm.ctx.types.native_value_type.clone().into_object(), None)
    }
}

pub fn native_value_repr(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let native = obj.downcast_ref::<PyNativeValue>().expect("native_value_repr on non-native-value");
    Ok(vm.new_str(format!("{:?}", native)))
}

/// The reverse half of `Native(..)`: unwraps an opaque native object
/// back to the concrete Rust type, or `None` if `obj` isn't one, or
/// wraps a different concrete type than `T`.
pub fn downcast_native<T: Any>(obj: &PyObjectRef) -> Option<&T> {
    obj.downcast_ref::<PyNativeValue>()?.value.downcast_ref::<T>()
}

/// §4.12's reverse direction: extracting a native Rust value back out
/// of a Python object, with the same "closest numeric class" rules run
/// backwards plus a `TypeError` when nothing matches.
pub trait TryFromObject: Sized {
    fn try_from_object(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult<Self>;
}

impl TryFromObject for PyObjectRef {
    fn try_from_object(obj: &PyObjectRef, _vm: &VirtualMachine) -> PyResult<Self> {
        Ok(obj.clone())
    }
}

impl TryFromObject for bool {
    fn try_from_object(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult<Self> {
        if isinstance(obj, &TypeOrTuple::Type(vm.ctx.types.bool_type.clone())) {
            Ok(obj.downcast_ref::<crate::builtins::int::PyInt>().expect("bool is a PyInt").value() != 0)
        } else {
            Err(vm.new_type_error(format!("expected bool, got {}", obj.class().name)))
        }
    }
}

macro_rules! impl_try_from_object_int {
    ($($t:ty),*) => {
        $(impl TryFromObject for $t {
            fn try_from_object(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult<Self> {
                let wide: i64 = if let Some(i) = obj.downcast_ref::<crate::builtins::int::PyInt>() {
                    i.value()
                } else if let Some(l) = obj.downcast_ref::<PyLong>() {
                    use num_traits::ToPrimitive;
                    l.value().to_i64().ok_or_else(|| {
                        vm.new_overflow_error("long too large to convert".to_owned())
                    })?
                } else {
                    return Err(vm.new_type_error(format!("expected int, got {}", obj.class().name)));
                };
                <$t>::try_from(wide).map_err(|_| {
                    vm.new_overflow_error("int too large to convert".to_owned())
                })
            }
        })*
    };
}
impl_try_from_object_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl TryFromObject for f64 {
    fn try_from_object(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult<Self> {
        if let Some(f) = obj.downcast_ref::<crate::builtins::float::PyFloat>() {
            Ok(f.value())
        } else if let Some(i) = obj.downcast_ref::<crate::builtins::int::PyInt>() {
            Ok(i.value() as f64)
        } else {
            Err(vm.new_type_error(format!("expected float, got {}", obj.class().name)))
        }
    }
}

impl TryFromObject for String {
    fn try_from_object(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult<Self> {
        obj.downcast_ref::<crate::builtins::str::PyStr>()
            .map(|s| s.as_str().to_owned())
            .ok_or_else(|| vm.new_type_error(format!("expected str, got {}", obj.class().name)))
    }
}

impl<T: TryFromObject> TryFromObject for Option<T> {
    fn try_from_object(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult<Self> {
        if vm.is_none(obj) {
            Ok(None)
        } else {
            T::try_from_object(obj, vm).map(Some)
        }
    }
}

/// Builds a `name(arg0, ..., arg{arity-1})` callable around a fixed-arity
/// host closure: §4.12's "checks arity" plus per-argument conversion is
/// left to the closure itself via [`TryFromObject`], since a host
/// closure's parameter types aren't uniform enough to drive generically.
pub fn wrap_native_fn<F>(name: &str, arity: usize, f: F, vm: &VirtualMachine) -> PyObjectRef
where
    F: Fn(Vec<PyObjectRef>, &VirtualMachine) -> PyResult + Send + Sync + 'static,
{
    let params = (0..arity).map(|i| Param { name: format!("arg{i}"), default: None }).collect();
    build_native_callable(name, params, false, false, f, vm)
}

/// As [`wrap_native_fn`], but for a variadic host closure (`*args`):
/// the closure receives whatever positional arguments overflow past
/// zero declared parameters.
pub fn wrap_native_varargs_fn<F>(name: &str, f: F, vm: &VirtualMachine) -> PyObjectRef
where
    F: Fn(Vec<PyObjectRef>, &VirtualMachine) -> PyResult + Send + Sync + 'static,
{
    build_native_callable(name, Vec::new(), true, false, f, vm)
}

fn build_native_callable<F>(
    name: &str,
    params: Vec<Param>,
    var_positional: bool,
    var_keyword: bool,
    f: F,
    vm: &VirtualMachine,
) -> PyObjectRef
where
    F: Fn(Vec<PyObjectRef>, &VirtualMachine) -> PyResult + Send + Sync + 'static,
{
    let body: NativeBody = Arc::new(move |bound: BoundArguments, _globals, vm: &VirtualMachine| {
        let args = if var_positional { bound.varargs } else { bound.positional };
        f(args, vm)
    });
    let code = CodeObject::new(name.to_owned(), "<native>".to_owned(), params, var_positional, var_keyword, body)
        .expect("native-bridge parameter lists never declare a default out of order");
    PyFunction::new_ref(Arc::new(code), vm.none(), vm).into_object()
}

//! C8 §4.8: arbitrary-precision `long`, reached by overflow-promotion
//! from [`super::int::PyInt`] and by explicit construction from
//! over-wide literals. Backed by `num_bigint::BigInt`, matching the
//! teacher's dependency on `num-bigint` for its own big-integer work
//! (the teacher's own `PyInt` instead unifies int/long onto
//! `malachite_bigint::BigInt`, which doesn't apply to a two-type
//! Python 2 tower).

use num_bigint::{BigInt, Sign};
use num_traits::{Signed, ToPrimitive, Zero};

use crate::builtins::int::hash_i64;
use crate::function::FuncArgs;
use crate::impl_payload;
use crate::object::{PyObject, PyObjectRef, PyRef};
use crate::protocol::comparison::CompareOp;
use crate::types::PyTypeRef;
use crate::vm::{PyResult, VirtualMachine};

#[derive(Debug, Clone)]
pub struct PyLong {
    value: BigInt,
}

impl_payload!(PyLong, "long");

pub type PyLongRef = PyRef<PyLong>;

impl PyLong {
    pub fn value(&self) -> &BigInt {
        &self.value
    }

    pub fn new_obj(value: BigInt, vm: &VirtualMachine) -> PyObjectRef {
        PyObject::new(PyLong { value }, vm.ctx.types.long_type.clone().into_object(), None)
    }
}

fn as_bigint(obj: &PyObjectRef) -> Option<BigInt> {
    if let Some(l) = obj.downcast_ref::<PyLong>() {
        return Some(l.value.clone());
    }
    obj.downcast_ref::<crate::builtins::int::PyInt>()
        .map(|i| BigInt::from(i.value()))
}

/// Demotes back to `int` whenever the magnitude fits, mirroring §4.8's
/// overflow-promotion being a two-way boundary rather than one-way.
fn normalize(value: BigInt, vm: &VirtualMachine) -> PyObjectRef {
    match value.to_i64() {
        Some(v) => crate::builtins::int::new_int(v, vm),
        None => PyLong::new_obj(value, vm),
    }
}

pub fn long_repr(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    Ok(vm.new_str(format!("{}L", obj.downcast_ref::<PyLong>().unwrap().value)))
}

/// Hash is defined so `hash(long(n)) == hash(int(n))` whenever `n` fits
/// in an `int` (§4.8 numeric-tower hash consistency).
pub fn long_hash(obj: &PyObjectRef, _vm: &VirtualMachine) -> PyResult<i64> {
    let value = &obj.downcast_ref::<PyLong>().unwrap().value;
    Ok(match value.to_i64() {
        Some(v) => hash_i64(v),
        None => {
            const MODULUS: i64 = (1i64 << 31) - 1;
            let (sign, digits) = value.to_u64_digits();
            let mut acc: i64 = 0;
            for d in digits {
                acc = ((acc as i128 * (1i128 << 32) + d as i128) % MODULUS as i128) as i64;
            }
            if sign == Sign::Minus {
                acc = -acc;
            }
            if acc == -1 {
                acc = -2;
            }
            acc
        }
    })
}

pub fn long_bool(obj: &PyObjectRef, _vm: &VirtualMachine) -> PyResult<bool> {
    Ok(!obj.downcast_ref::<PyLong>().unwrap().value.is_zero())
}

pub fn long_add(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let a = as_bigint(obj).expect("long_add called with non-numeric self");
    match as_bigint(other) {
        Some(b) => Ok(normalize(a + b, vm)),
        None => Ok(vm.not_implemented()),
    }
}

pub fn long_sub(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let a = as_bigint(obj).expect("long_sub called with non-numeric self");
    match as_bigint(other) {
        Some(b) => Ok(normalize(a - b, vm)),
        None => Ok(vm.not_implemented()),
    }
}

pub fn long_mul(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let a = as_bigint(obj).expect("long_mul called with non-numeric self");
    match as_bigint(other) {
        Some(b) => Ok(normalize(a * b, vm)),
        None => Ok(vm.not_implemented()),
    }
}

pub fn long_neg(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let a = obj.downcast_ref::<PyLong>().expect("long_neg called on non-long").value.clone();
    Ok(normalize(-a, vm))
}

pub fn long_abs(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let a = obj.downcast_ref::<PyLong>().expect("long_abs called on non-long").value.clone();
    Ok(normalize(a.abs(), vm))
}

/// Floor-division/modulo on the same sign convention as `int` (§4.8).
pub fn long_divmod(a: &BigInt, b: &BigInt, vm: &VirtualMachine) -> PyResult<(BigInt, BigInt)> {
    if b.is_zero() {
        return Err(vm.new_zero_division_error("long division or modulo by zero".to_owned()));
    }
    let mut q = a / b;
    let mut r = a % b;
    if !r.is_zero() && (r.is_negative() != b.is_negative()) {
        q -= 1;
        r += b;
    }
    Ok((q, r))
}

pub fn long_floordiv(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let a = as_bigint(obj).expect("long_floordiv called with non-numeric self");
    match as_bigint(other) {
        Some(b) => long_divmod(&a, &b, vm).map(|(q, _)| normalize(q, vm)),
        None => Ok(vm.not_implemented()),
    }
}

pub fn long_mod(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let a = as_bigint(obj).expect("long_mod called with non-numeric self");
    match as_bigint(other) {
        Some(b) => long_divmod(&a, &b, vm).map(|(_, r)| normalize(r, vm)),
        None => Ok(vm.not_implemented()),
    }
}

/// `v.divmod(w)` as a binary slot, mirroring `int`'s `int_divmod_obj`.
pub fn long_divmod_obj(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let a = as_bigint(obj).expect("long_divmod_obj called with non-numeric self");
    match as_bigint(other) {
        Some(b) => long_divmod(&a, &b, vm).map(|(q, r)| vm.new_tuple(vec![normalize(q, vm), normalize(r, vm)])),
        None => Ok(vm.not_implemented()),
    }
}

pub fn long_rdivmod(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    long_divmod_obj(other, obj, vm)
}

pub fn long_rsub(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    long_sub(other, obj, vm)
}

pub fn long_rfloordiv(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    long_floordiv(other, obj, vm)
}

pub fn long_rmod(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    long_mod(other, obj, vm)
}

fn long_richcompare(obj: &PyObjectRef, other: &PyObjectRef, op: CompareOp, vm: &VirtualMachine) -> PyResult {
    let a = &obj.downcast_ref::<PyLong>().unwrap().value;
    match as_bigint(other) {
        Some(b) => {
            let result = match op {
                CompareOp::Eq => *a == b,
                CompareOp::Ne => *a != b,
                CompareOp::Lt => *a < b,
                CompareOp::Le => *a <= b,
                CompareOp::Gt => *a > b,
                CompareOp::Ge => *a >= b,
            };
            Ok(vm.new_bool(result))
        }
        None => Ok(vm.not_implemented()),
    }
}

pub fn long_eq(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    long_richcompare(obj, other, CompareOp::Eq, vm)
}

pub fn long_lt(obj: &PyObjectRef, other: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    long_richcompare(obj, other, CompareOp::Lt, vm)
}

/// `Index`/`Long`: a `long` is already its own index and its own
/// `long()` conversion.
pub fn long_index(obj: &PyObjectRef, _vm: &VirtualMachine) -> PyResult {
    Ok(obj.clone())
}

/// `Int`: demotes back to `int` when the value fits, same as any other
/// arithmetic result that happens to end up in range (§4.8).
pub fn long_int(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    Ok(normalize(obj.downcast_ref::<PyLong>().unwrap().value.clone(), vm))
}

pub fn long_float(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let v = &obj.downcast_ref::<PyLong>().unwrap().value;
    v.to_f64()
        .map(|f| crate::builtins::float::new_float(f, vm))
        .ok_or_else(|| vm.new_overflow_error("long int too large to convert to float".to_owned()))
}

pub fn long_hex(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let v = &obj.downcast_ref::<PyLong>().unwrap().value;
    let sign = if v.is_negative() { "-" } else { "" };
    Ok(vm.new_str(format!("{}0x{:x}L", sign, v.abs())))
}

pub fn long_oct(obj: &PyObjectRef, vm: &VirtualMachine) -> PyResult {
    let v = &obj.downcast_ref::<PyLong>().unwrap().value;
    let sign = if v.is_negative() { "-" } else { "" };
    Ok(vm.new_str(format!("{}0{:o}L", sign, v.abs())))
}

pub fn long_new(cls: PyTypeRef, args: FuncArgs, vm: &VirtualMachine) -> PyResult {
    let value = match args.args.first() {
        None => BigInt::zero(),
        Some(v) => match as_bigint(v) {
            Some(b) => b,
            None => {
                if let Some(s) = v.downcast_ref::<crate::builtins::str::PyStr>() {
                    s.as_str()
                        .trim()
                        .parse::<BigInt>()
                        .map_err(|_| vm.new_value_error(format!("invalid literal for long(): '{}'", s.as_str())))?
                } else {
                    return Err(vm.new_type_error("long() argument must be a string or a number".to_owned()));
                }
            }
        },
    };
    Ok(PyObject::new(PyLong { value }, cls.into_object(), None))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demotes_to_int_when_it_fits() {
        let small = BigInt::from(5);
        assert_eq!(small.to_i64(), Some(5));
    }

    #[test]
    fn floor_div_follows_divisor_sign() {
        let a = BigInt::from(-7);
        let b = BigInt::from(2);
        let mut q = &a / &b;
        let mut r = &a % &b;
        if !r.is_zero() && (r.is_negative() != b.is_negative()) {
            q -= 1;
            r += &b;
        }
        assert_eq!(q, BigInt::from(-4));
        assert_eq!(r, BigInt::from(1));
    }
}
